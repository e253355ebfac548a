//! Board session - observer, reconciler and game wired together.
//!
//! The session owns the one authoritative game and turns reconciler steps
//! into `BoardEvent`s. It also tracks whether the physical board is known
//! to match the game: after a reset with a discrepancy nothing is
//! interpreted until the pieces are back where the game says they are.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::domain::{Occupancy, OccupancyDiff, PieceKind};
use crate::error::GameResult;
use crate::events::BoardEvent;
use crate::models::game::GameState;
use crate::models::observer::OccupancyObserver;
use crate::models::reconciler::{HaltState, MoveReconciler, Step};
use crate::models::rules::{GameRules, TerminalStatus};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SyncState {
    /// Diffs are interpreted as moves
    InSync,
    /// Board disagrees with the game after a reset; waiting for the
    /// operator to re-seat pieces
    AwaitingSync,
    /// Game finished; the board is only tracked
    GameOver,
}

pub struct BoardSession<G: GameRules = GameState> {
    game: G,
    observer: OccupancyObserver,
    reconciler: MoveReconciler,
    pending_timeout: Option<Duration>,
    sync: SyncState,
    last_physical: Occupancy,
    last_status: TerminalStatus,
}

impl<G: GameRules> BoardSession<G> {
    /// Start a session assuming the board already shows the game's position
    pub fn new(game: G, config: &SessionConfig) -> Self {
        let expected = game.expected_occupancy();
        let last_status = game.status();
        let sync = if game.is_over() {
            SyncState::GameOver
        } else {
            SyncState::InSync
        };
        Self {
            game,
            observer: OccupancyObserver::new(expected),
            reconciler: MoveReconciler::new(config.promotion, config.capture_fallback),
            pending_timeout: config.pending_timeout(),
            sync,
            last_physical: expected,
            last_status,
        }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn reconciler(&self) -> &MoveReconciler {
        &self.reconciler
    }

    pub fn baseline(&self) -> Occupancy {
        self.observer.baseline()
    }

    /// Most recent sensor reading, accepted or not
    pub fn last_physical(&self) -> Occupancy {
        self.last_physical
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    pub fn pending_timeout(&self) -> Option<Duration> {
        self.pending_timeout
    }

    pub fn halt_state(&self) -> Option<&HaltState> {
        self.reconciler.halt_state()
    }

    pub fn is_halted(&self) -> bool {
        self.reconciler.is_halted()
    }

    /// Squares where the last reading differs from the game's position.
    /// Lifts are expected pieces missing, fills are unexpected pieces.
    pub fn discrepancy(&self) -> OccupancyDiff {
        self.game.expected_occupancy().diff(self.last_physical)
    }

    /// Feed one sensor reading
    pub fn observe(&mut self, snapshot: Occupancy, now: Instant) -> Vec<BoardEvent> {
        self.last_physical = snapshot;

        match self.sync {
            SyncState::GameOver => {
                self.observer.advance(snapshot);
                return Vec::new();
            }
            SyncState::AwaitingSync => {
                self.observer.advance(snapshot);
                if self.discrepancy().is_empty() {
                    info!("board matches the game again");
                    self.sync = SyncState::InSync;
                    return vec![BoardEvent::Resynchronized];
                }
                debug!(discrepancy = %self.discrepancy(), "still waiting for board sync");
                return Vec::new();
            }
            SyncState::InSync => {}
        }

        let was_halted = self.reconciler.is_halted();
        let diff = self.observer.observe(snapshot);
        let steps = self.reconciler.process(&diff, &mut self.game, now);
        if !self.reconciler.is_halted() {
            self.observer.advance(snapshot);
        }
        if was_halted {
            // Halt was already reported when it happened
            return Vec::new();
        }
        self.translate(steps)
    }

    /// Clear any halt or pending action and trust `snapshot` as the
    /// board's real state. The game is never changed.
    pub fn reset(&mut self, snapshot: Occupancy) -> Vec<BoardEvent> {
        self.reconciler.reset();
        self.observer.reset(snapshot);
        self.last_physical = snapshot;

        let discrepancy = self.discrepancy();
        self.sync = if self.game.is_over() {
            SyncState::GameOver
        } else if discrepancy.is_empty() {
            SyncState::InSync
        } else {
            SyncState::AwaitingSync
        };
        info!(%discrepancy, sync = ?self.sync, "board reset");
        vec![BoardEvent::Reset {
            discrepancy: discrepancy.describe(),
        }]
    }

    /// Replace the game wholesale and resynchronize against `snapshot`
    pub fn start_new_game(&mut self, game: G, snapshot: Occupancy) -> Vec<BoardEvent> {
        self.game = game;
        self.last_status = self.game.status();
        let fen = self.game.fen();
        info!(%fen, "new game");
        let mut events = vec![BoardEvent::GameStarted { fen }];
        events.extend(self.reset(snapshot));
        events
    }

    pub fn supply_promotion_choice(&mut self, piece: PieceKind) -> GameResult<Vec<BoardEvent>> {
        let step = self.reconciler.supply_promotion_choice(piece, &mut self.game)?;
        Ok(self.translate(step.into_iter().collect()))
    }

    /// Commit a capture whose destination was never seen toggling
    pub fn confirm(&mut self) -> Vec<BoardEvent> {
        if self.sync != SyncState::InSync || self.reconciler.is_halted() {
            return Vec::new();
        }
        let step = self.reconciler.confirm(&mut self.game);
        self.translate(step.into_iter().collect())
    }

    /// Apply the configured staleness limit to the pending action
    pub fn check_staleness(&mut self, now: Instant) -> Vec<BoardEvent> {
        let Some(max_age) = self.pending_timeout else {
            return Vec::new();
        };
        let step = self.reconciler.expire(now, max_age, &mut self.game);
        self.translate(step.into_iter().collect())
    }

    fn translate(&mut self, steps: Vec<Step>) -> Vec<BoardEvent> {
        let mut events = Vec::new();
        for step in steps {
            match step {
                Step::Started { square } => events.push(BoardEvent::ActionStarted {
                    squares: vec![square.to_string()],
                }),
                Step::Progressed { .. } | Step::Cancelled { .. } => {}
                Step::AwaitingPromotion { from, to } => {
                    events.push(BoardEvent::PromotionRequired {
                        from: from.to_string(),
                        to: to.to_string(),
                    })
                }
                Step::Committed(committed) => {
                    events.push(BoardEvent::MoveCommitted {
                        uci: committed.uci,
                        san: committed.san,
                        ply: committed.ply,
                    });
                    if committed.status != self.last_status {
                        self.last_status = committed.status;
                        events.push(BoardEvent::StatusChanged {
                            status: committed.status,
                        });
                    }
                    if committed.status.is_game_over() {
                        info!(status = ?committed.status, "game over");
                        self.sync = SyncState::GameOver;
                    }
                }
                Step::Halted(halt) => {
                    warn!(fen = %halt.last_fen, "waiting for reset");
                    events.push(BoardEvent::halted(halt.error.kind(), &halt.reason, &halt.diff));
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Square;

    fn session() -> BoardSession {
        BoardSession::new(GameState::new(), &SessionConfig::default())
    }

    /// Lift `from`, then put it on `to`, one reading each
    fn slide(session: &mut BoardSession, from: Square, to: Square) -> Vec<BoardEvent> {
        let lifted = session.baseline().without(from);
        let mut events = session.observe(lifted, Instant::now());
        events.extend(session.observe(lifted.with(to), Instant::now()));
        events
    }

    /// Lift both squares of a capture, then put the capturer down
    fn take(session: &mut BoardSession, from: Square, to: Square) -> Vec<BoardEvent> {
        let a = session.baseline().without(from);
        let b = a.without(to);
        let mut events = session.observe(a, Instant::now());
        events.extend(session.observe(b, Instant::now()));
        events.extend(session.observe(b.with(to), Instant::now()));
        events
    }

    fn sans(events: &[BoardEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                BoardEvent::MoveCommitted { san, .. } => Some(san.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_opening_moves() {
        let mut s = session();
        let events = slide(&mut s, Square::E2, Square::E4);
        assert_eq!(
            events,
            vec![
                BoardEvent::ActionStarted {
                    squares: vec!["e2".to_string()]
                },
                BoardEvent::MoveCommitted {
                    uci: "e2e4".to_string(),
                    san: "e4".to_string(),
                    ply: 1
                },
            ]
        );
        slide(&mut s, Square::E7, Square::E5);
        assert_eq!(s.game().history().san_line(), "1. e4 e5");
        assert_eq!(s.baseline(), s.game().expected_occupancy());
        assert!(s.discrepancy().is_empty());
    }

    #[test]
    fn test_repeated_snapshot_is_noop() {
        let mut s = session();
        let lifted = s.baseline().without(Square::G1);
        s.observe(lifted, Instant::now());
        assert!(s.observe(lifted, Instant::now()).is_empty());
        assert!(s.reconciler().pending().is_some());
    }

    #[test]
    fn test_capture_by_transient_pair() {
        let mut s = session();
        slide(&mut s, Square::E2, Square::E4);
        slide(&mut s, Square::D7, Square::D5);
        let events = take(&mut s, Square::E4, Square::D5);
        assert_eq!(sans(&events), vec!["exd5"]);
        assert_eq!(s.baseline(), s.game().expected_occupancy());
    }

    #[test]
    fn test_capture_with_both_pieces_lifted_in_one_reading() {
        let mut s = session();
        slide(&mut s, Square::E2, Square::E4);
        slide(&mut s, Square::D7, Square::D5);
        slide(&mut s, Square::G1, Square::F3);

        // Black captures toward the lower square: dxe4
        let both = s.baseline().without(Square::E4).without(Square::D5);
        let mut events = s.observe(both, Instant::now());
        events.extend(s.observe(both.with(Square::E4), Instant::now()));
        assert_eq!(sans(&events), vec!["dxe4"]);
        assert!(!s.reconciler().is_halted());

        // White recaptures from the lower square: Nc3xe4
        slide(&mut s, Square::B1, Square::C3);
        slide(&mut s, Square::A7, Square::A6);
        let both = s.baseline().without(Square::C3).without(Square::E4);
        let mut events = s.observe(both, Instant::now());
        events.extend(s.observe(both.with(Square::E4), Instant::now()));
        assert_eq!(sans(&events), vec!["Nxe4"]);
        assert_eq!(s.baseline(), s.game().expected_occupancy());
    }

    #[test]
    fn test_three_changes_mid_move_halt_on_real_board() {
        let mut s = session();
        let lifted = s.baseline().without(Square::G1);
        s.observe(lifted, Instant::now());
        let burst = lifted.with(Square::F3).without(Square::B1).without(Square::E2);
        let events = s.observe(burst, Instant::now());
        assert!(matches!(
            events.as_slice(),
            [BoardEvent::Halted { kind, .. }] if kind == "unsupported_simultaneous_change"
        ));
        assert!(s.game().history().is_empty());
    }

    #[test]
    fn test_capture_confirm_fallback() {
        let mut s = session();
        slide(&mut s, Square::E2, Square::E4);
        slide(&mut s, Square::D7, Square::D5);
        s.observe(s.baseline().without(Square::E4), Instant::now());
        let events = s.confirm();
        assert_eq!(sans(&events), vec!["exd5"]);
        assert_eq!(s.baseline(), s.game().expected_occupancy());
    }

    #[test]
    fn test_kingside_castle_on_real_board() {
        let game =
            GameState::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let mut s = BoardSession::new(game, &SessionConfig::default());
        let a = s.baseline().without(Square::H1);
        let b = a.without(Square::E1);
        let c = b.with(Square::G1);
        let d = c.with(Square::F1);
        let mut events = Vec::new();
        for snapshot in [a, b, c, d] {
            events.extend(s.observe(snapshot, Instant::now()));
        }
        assert_eq!(sans(&events), vec!["O-O"]);
        assert_eq!(s.game().expected_occupancy(), d);
    }

    #[test]
    fn test_halt_then_reset_round_trip() {
        let mut s = session();
        slide(&mut s, Square::E2, Square::E4);
        let expected = s.game().expected_occupancy();

        // Black lifts a white piece
        let glitch = expected.without(Square::D2);
        let events = s.observe(glitch, Instant::now());
        assert!(matches!(
            events.as_slice(),
            [BoardEvent::Halted { kind, .. }] if kind == "illegal_lift"
        ));
        assert!(s.is_halted());
        assert_eq!(s.baseline(), expected);

        // Halt is reported once, then absorbed
        assert!(s.observe(expected, Instant::now()).is_empty());
        assert!(s.is_halted());

        let events = s.reset(expected);
        assert_eq!(
            events,
            vec![BoardEvent::Reset {
                discrepancy: Vec::new()
            }]
        );
        let fresh = BoardSession::new(s.game().clone(), &SessionConfig::default());
        assert_eq!(s.baseline(), fresh.baseline());
        assert_eq!(s.sync_state(), fresh.sync_state());
        assert!(s.reconciler().is_idle());
        assert_eq!(s.game().fen(), fresh.game().fen());

        let events = slide(&mut s, Square::E7, Square::E5);
        assert_eq!(sans(&events), vec!["e5"]);
    }

    #[test]
    fn test_reset_with_discrepancy_waits_for_sync() {
        let mut s = session();
        let expected = s.game().expected_occupancy();
        let off = expected.without(Square::B1).with(Square::C3);

        let events = s.reset(off);
        assert_eq!(
            events,
            vec![BoardEvent::Reset {
                discrepancy: vec!["-b1".to_string(), "+c3".to_string()]
            }]
        );
        assert_eq!(s.sync_state(), SyncState::AwaitingSync);

        // Nothing is inferred from the board being moved around
        let worse = off.without(Square::E2);
        assert!(s.observe(worse, Instant::now()).is_empty());
        assert!(s.game().history().is_empty());

        let events = s.observe(expected, Instant::now());
        assert_eq!(events, vec![BoardEvent::Resynchronized]);
        assert_eq!(s.sync_state(), SyncState::InSync);
        assert_eq!(sans(&slide(&mut s, Square::B1, Square::C3)), vec!["Nc3"]);
    }

    #[test]
    fn test_game_over_stops_interpretation() {
        let mut s = session();
        slide(&mut s, Square::F2, Square::F3);
        slide(&mut s, Square::E7, Square::E5);
        slide(&mut s, Square::G2, Square::G4);
        let events = slide(&mut s, Square::D8, Square::H4);
        assert!(events.contains(&BoardEvent::StatusChanged {
            status: TerminalStatus::Checkmate
        }));
        assert_eq!(sans(&events), vec!["Qh4#"]);
        assert_eq!(s.sync_state(), SyncState::GameOver);

        let cleared = Occupancy::EMPTY;
        assert!(s.observe(cleared, Instant::now()).is_empty());
        assert_eq!(s.baseline(), cleared);
        assert!(!s.is_halted());
        assert!(!s.discrepancy().is_empty());
    }

    #[test]
    fn test_status_change_on_check() {
        let mut s = session();
        slide(&mut s, Square::E2, Square::E4);
        slide(&mut s, Square::F7, Square::F6);
        let events = slide(&mut s, Square::D1, Square::H5);
        assert!(events.contains(&BoardEvent::StatusChanged {
            status: TerminalStatus::Check
        }));
        // Leaving check is reported too
        let events = slide(&mut s, Square::G7, Square::G6);
        assert!(events.contains(&BoardEvent::StatusChanged {
            status: TerminalStatus::None
        }));
    }

    #[test]
    fn test_promotion_awaits_operator() {
        let game = GameState::from_fen("7k/4P3/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let config = SessionConfig {
            promotion: crate::config::PromotionPolicy::AwaitChoice,
            ..SessionConfig::default()
        };
        let mut s = BoardSession::new(game, &config);
        let events = slide(&mut s, Square::E7, Square::E8);
        assert!(events.contains(&BoardEvent::PromotionRequired {
            from: "e7".to_string(),
            to: "e8".to_string()
        }));
        let events = s.supply_promotion_choice(PieceKind::Rook).unwrap();
        assert_eq!(sans(&events), vec!["e8=R+"]);
    }

    #[test]
    fn test_stale_action_halts() {
        let config = SessionConfig {
            pending_timeout_ms: Some(1_000),
            ..SessionConfig::default()
        };
        let mut s = BoardSession::new(GameState::new(), &config);
        let t0 = Instant::now();
        s.observe(s.baseline().without(Square::G1), t0);
        assert!(s.check_staleness(t0 + Duration::from_millis(500)).is_empty());
        let events = s.check_staleness(t0 + Duration::from_millis(1_500));
        assert!(matches!(
            events.as_slice(),
            [BoardEvent::Halted { kind, .. }] if kind == "abandoned_action"
        ));
    }

    #[test]
    fn test_start_new_game() {
        let mut s = session();
        slide(&mut s, Square::E2, Square::E4);
        let fresh = GameState::new();
        let expected = fresh.expected_occupancy();
        let events = s.start_new_game(fresh, expected);
        assert!(matches!(events.first(), Some(BoardEvent::GameStarted { .. })));
        assert!(s.game().history().is_empty());
        assert_eq!(s.sync_state(), SyncState::InSync);
    }
}
