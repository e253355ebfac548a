//! Models layer - stateful application logic.
//! Owns the game, the board interpretation state and the worker thread.

pub mod game;
pub mod observer;
pub mod reconciler;
pub mod rules;
pub mod session;
pub mod worker;

pub use game::{GameSnapshot, GameState, START_FEN};
pub use observer::OccupancyObserver;
pub use reconciler::{HaltState, MoveReconciler, PendingAction, ReconcilerState, Step};
pub use rules::{CommittedMove, GameRules, TerminalStatus};
pub use session::{BoardSession, SyncState};
pub use worker::{BoardWorker, WorkerOutput};
