//! Domain layer: board values with no I/O and no mutable session state.

pub mod board_move;
pub mod chess;
pub mod history;
pub mod occupancy;

pub use board_move::{BoardMove, MoveKind};
pub use chess::{Piece, PieceColor, PieceKind, parse_square, shakmaty_to_piece, to_square};
pub use history::{MoveHistory, MoveRecord};
pub use occupancy::{Change, Occupancy, OccupancyDiff, SquareChange};
