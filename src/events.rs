//! What the board core reports and what it accepts.
//!
//! Both sides serialize as internally tagged JSON, one object per event or
//! command. Bitboards travel as `u64`, bit N = square N (a1 = 0, h8 = 63).

use serde::{Deserialize, Serialize};

use crate::domain::{Occupancy, OccupancyDiff, PieceKind};
use crate::models::rules::TerminalStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    GameStarted {
        fen: String,
    },
    /// A piece was lifted and is on its way somewhere
    ActionStarted {
        squares: Vec<String>,
    },
    PromotionRequired {
        from: String,
        to: String,
    },
    MoveCommitted {
        uci: String,
        san: String,
        ply: usize,
    },
    StatusChanged {
        status: TerminalStatus,
    },
    Halted {
        kind: String,
        reason: String,
        diff: Vec<String>,
    },
    /// Baseline replaced. `discrepancy` lists squares where the board
    /// disagrees with the game, as "-e4" (missing) or "+d5" (unexpected).
    Reset {
        discrepancy: Vec<String>,
    },
    Resynchronized,
}

impl BoardEvent {
    pub fn halted(kind: &str, reason: &str, diff: &OccupancyDiff) -> Self {
        BoardEvent::Halted {
            kind: kind.to_string(),
            reason: reason.to_string(),
            diff: diff.describe(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardCommand {
    /// A fresh sensor reading
    UpdatePhysical { bitboard: Occupancy },
    Reset { bitboard: Occupancy },
    StartNewGame { fen: Option<String> },
    SupplyPromotion { piece: PieceKind },
    Confirm,
    Shutdown,
}
