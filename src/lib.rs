//! Move reconciliation for an occupancy-sensing chess board.
//!
//! The board reports one bit per square. From the sequence of readings
//! this crate infers which legal move was played, commits it to the game,
//! and halts whenever the readings cannot be explained without guessing.

pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod events;
pub mod models;

pub use config::{PromotionPolicy, SessionConfig};
pub use domain::{Occupancy, OccupancyDiff};
pub use error::{ConfigError, GameError, ReconcileError};
pub use events::{BoardCommand, BoardEvent};
pub use models::{BoardSession, BoardWorker, GameRules, GameState, MoveReconciler};
