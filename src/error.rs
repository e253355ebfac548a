//! Error types for the board core.
//!
//! `ReconcileError` is the halt taxonomy: every variant stops interpretation
//! until an explicit reset. `GameError` covers the rules adapter and control
//! calls, `ConfigError` the configuration loader.

use std::path::PathBuf;

use crate::domain::PieceKind;

/// Why the reconciler stopped interpreting the board
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A square emptied that does not start or continue any legal move
    #[error("illegal lift: {message}")]
    IllegalLift { message: String },

    /// A piece landed where no legal move completes the pending action
    #[error("illegal destination: {message}")]
    IllegalDestination { message: String },

    /// More squares changed in one reading than one legal move can explain
    #[error("unsupported simultaneous change of {squares} squares")]
    UnsupportedSimultaneousChange { squares: usize },

    /// More than one legal move matches what was observed
    #[error("ambiguous completion: {candidates:?} all match")]
    AmbiguousCompletion { candidates: Vec<String> },

    /// The rules engine refused a move the reconciler believed legal
    #[error("engine rejected move {mv}: {message}")]
    EngineRejectedMove { mv: String, message: String },

    /// A pending action outlived the configured staleness window
    #[error("action abandoned after {elapsed_ms} ms")]
    AbandonedAction { elapsed_ms: u64 },
}

impl ReconcileError {
    pub fn illegal_lift(message: impl Into<String>) -> Self {
        ReconcileError::IllegalLift {
            message: message.into(),
        }
    }

    pub fn illegal_destination(message: impl Into<String>) -> Self {
        ReconcileError::IllegalDestination {
            message: message.into(),
        }
    }

    /// Stable snake_case name used in events
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::IllegalLift { .. } => "illegal_lift",
            ReconcileError::IllegalDestination { .. } => "illegal_destination",
            ReconcileError::UnsupportedSimultaneousChange { .. } => {
                "unsupported_simultaneous_change"
            }
            ReconcileError::AmbiguousCompletion { .. } => "ambiguous_completion",
            ReconcileError::EngineRejectedMove { .. } => "engine_rejected_move",
            ReconcileError::AbandonedAction { .. } => "abandoned_action",
        }
    }
}

/// Errors from the game state adapter
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("invalid FEN '{fen}': {message}")]
    InvalidFen { fen: String, message: String },

    #[error("illegal move {mv} in position {fen}")]
    IllegalMove { mv: String, fen: String },

    #[error("{piece} is not a valid promotion piece")]
    InvalidPromotionPiece { piece: PieceKind },
}

/// Errors loading the session configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
