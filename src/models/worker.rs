//! Board worker - runs a session on its own thread.
//!
//! Architecture:
//! - One OS thread owns the `BoardSession` and handles commands strictly in
//!   arrival order
//! - Commands come in over one channel, events and post-commit snapshots go
//!   out over another
//! - Consumers only ever see a `GameSnapshot` taken after a move was fully
//!   applied

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::events::{BoardCommand, BoardEvent};
use crate::models::game::{GameSnapshot, GameState};
use crate::models::session::BoardSession;

/// Upper bound on how long a stale action can go unnoticed
const STALENESS_POLL: Duration = Duration::from_millis(100);

/// Messages sent from the worker thread
#[derive(Clone, Debug)]
pub enum WorkerOutput {
    Event(BoardEvent),
    /// Game state after a commit, reset or new game
    Snapshot(GameSnapshot),
    /// A command could not be carried out
    Error(String),
}

pub struct BoardWorker {
    /// Channel sender for commands to the worker thread
    command_sender: Option<Sender<BoardCommand>>,
    output_receiver: Receiver<WorkerOutput>,
    handle: Option<JoinHandle<()>>,
}

impl BoardWorker {
    pub fn spawn(session: BoardSession<GameState>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<BoardCommand>();
        let (out_tx, out_rx) = mpsc::channel::<WorkerOutput>();

        let handle = thread::spawn(move || run(session, cmd_rx, out_tx));

        Self {
            command_sender: Some(cmd_tx),
            output_receiver: out_rx,
            handle: Some(handle),
        }
    }

    /// Queue a command. Returns false once the worker has stopped.
    pub fn send(&self, command: BoardCommand) -> bool {
        match &self.command_sender {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    /// Everything the worker has produced so far, without blocking
    pub fn drain(&self) -> Vec<WorkerOutput> {
        let mut collected = Vec::new();
        while let Ok(output) = self.output_receiver.try_recv() {
            collected.push(output);
        }
        collected
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerOutput> {
        self.output_receiver.recv_timeout(timeout).ok()
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        if let Some(tx) = self.command_sender.take() {
            let _ = tx.send(BoardCommand::Shutdown);
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("board worker panicked");
            }
        }
    }
}

impl Drop for BoardWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut session: BoardSession<GameState>,
    commands: Receiver<BoardCommand>,
    outputs: Sender<WorkerOutput>,
) {
    debug!("board worker started");
    loop {
        let command = if session.pending_timeout().is_some() {
            match commands.recv_timeout(STALENESS_POLL) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    let events = session.check_staleness(Instant::now());
                    if !publish(&session, events, &outputs) {
                        break;
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => command,
                Err(_) => break,
            }
        };

        let events = match command {
            BoardCommand::UpdatePhysical { bitboard } => session.observe(bitboard, Instant::now()),
            BoardCommand::Reset { bitboard } => session.reset(bitboard),
            BoardCommand::StartNewGame { fen } => {
                let game = match fen {
                    Some(fen) => GameState::from_fen(&fen),
                    None => Ok(GameState::new()),
                };
                match game {
                    Ok(game) => {
                        let physical = session.last_physical();
                        session.start_new_game(game, physical)
                    }
                    Err(e) => {
                        warn!(error = %e, "new game rejected");
                        if outputs.send(WorkerOutput::Error(e.to_string())).is_err() {
                            break;
                        }
                        continue;
                    }
                }
            }
            BoardCommand::SupplyPromotion { piece } => match session.supply_promotion_choice(piece)
            {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "promotion choice rejected");
                    if outputs.send(WorkerOutput::Error(e.to_string())).is_err() {
                        break;
                    }
                    continue;
                }
            },
            BoardCommand::Confirm => session.confirm(),
            BoardCommand::Shutdown => break,
        };

        if !publish(&session, events, &outputs) {
            break;
        }
    }
    debug!("board worker stopped");
}

/// Send events, then a snapshot if the game changed. False once nobody
/// is listening.
fn publish(
    session: &BoardSession<GameState>,
    events: Vec<BoardEvent>,
    outputs: &Sender<WorkerOutput>,
) -> bool {
    let changed = events.iter().any(|e| {
        matches!(
            e,
            BoardEvent::MoveCommitted { .. } | BoardEvent::GameStarted { .. } | BoardEvent::Reset { .. }
        )
    });
    for event in events {
        if outputs.send(WorkerOutput::Event(event)).is_err() {
            return false;
        }
    }
    if changed {
        return outputs
            .send(WorkerOutput::Snapshot(session.game().snapshot()))
            .is_ok();
    }
    true
}
