//! The narrow interface the reconciler needs from a chess rules engine.
//!
//! `GameState` implements it on top of shakmaty; tests implement it with a
//! handful of hand-written moves.

use serde::{Deserialize, Serialize};
use shakmaty::Square;

use crate::domain::{BoardMove, Occupancy};
use crate::error::GameResult;

/// Terminal status of the position after the last move
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    #[default]
    None,
    Check,
    Checkmate,
    Stalemate,
    Draw,
}

impl TerminalStatus {
    /// No further moves will be played
    pub fn is_game_over(self) -> bool {
        matches!(
            self,
            TerminalStatus::Checkmate | TerminalStatus::Stalemate | TerminalStatus::Draw
        )
    }
}

/// Result of applying a move
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedMove {
    pub mv: BoardMove,
    pub uci: String,
    pub san: String,
    pub ply: usize,
    pub status: TerminalStatus,
}

pub trait GameRules {
    /// Every legal move in the current position
    fn legal_moves(&self) -> Vec<BoardMove>;

    /// Apply a legal move. Fails without changing anything if the move is
    /// not legal in the current position.
    fn apply(&mut self, mv: &BoardMove) -> GameResult<CommittedMove>;

    /// Occupancy the physical board should show for the current position
    fn expected_occupancy(&self) -> Occupancy;

    /// FEN of the current position, for halt records and diagnostics
    fn fen(&self) -> String;

    fn status(&self) -> TerminalStatus {
        TerminalStatus::None
    }

    fn is_over(&self) -> bool {
        self.status().is_game_over()
    }

    /// Legal moves whose moving piece starts on `square`
    fn legal_moves_from(&self, square: Square) -> Vec<BoardMove> {
        self.legal_moves()
            .into_iter()
            .filter(|m| m.from == square)
            .collect()
    }

    /// Legal moves whose moving piece lands on `square`
    fn legal_moves_to(&self, square: Square) -> Vec<BoardMove> {
        self.legal_moves()
            .into_iter()
            .filter(|m| m.to == square)
            .collect()
    }

    /// Legal moves that require the piece on `square` to be picked up:
    /// moves from it, plus castles where it is the rook.
    fn legal_moves_lifting(&self, square: Square) -> Vec<BoardMove> {
        self.legal_moves()
            .into_iter()
            .filter(|m| m.from == square || (m.is_castle() && m.lifts().contains(square)))
            .collect()
    }
}
