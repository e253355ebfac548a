//! Diagnostics layer - human-readable board for debugging.
//! Reads game and reconciler state, never changes them.

pub mod display;
pub mod render;
pub mod view_models;

pub use render::{DiagnosticRenderer, format_view};
pub use view_models::{BoardView, SquareMarker, SquareView};
