//! Move reconciler - turns occupancy diffs into committed moves.
//!
//! The reconciler never guesses. Every observed change must keep at least
//! one legal move possible; a move is committed only once the board shows
//! exactly that move's footprint. Anything else halts until reset.

use std::time::{Duration, Instant};

use shakmaty::{Bitboard, Square};
use tracing::{debug, info, warn};

use crate::config::PromotionPolicy;
use crate::domain::{BoardMove, Change, MoveKind, OccupancyDiff, PieceKind};
use crate::error::{GameError, GameResult, ReconcileError};
use crate::models::rules::{CommittedMove, GameRules};

/// Largest diff one reading may carry: a lift and a placement, or two
/// lifts/placements of the same move.
const MAX_CHANGES_PER_READING: usize = 2;

/// A physical action in progress: what has been picked up and put down so
/// far, and which legal moves are still consistent with it.
#[derive(Clone, Debug)]
pub struct PendingAction {
    pub lifted: Bitboard,
    pub placed: Bitboard,
    pub candidates: Vec<BoardMove>,
    pub started_at: Instant,
}

impl PendingAction {
    fn start(square: Square, candidates: Vec<BoardMove>, now: Instant) -> Self {
        Self {
            lifted: Bitboard::from(square),
            placed: Bitboard::EMPTY,
            candidates,
            started_at: now,
        }
    }

    /// The first square lifted, when only one has been
    pub fn origin(&self) -> Option<Square> {
        if self.lifted.count() == 1 {
            self.lifted.first()
        } else {
            None
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    /// Squares where a piece may still be put down
    pub fn open_destinations(&self) -> Bitboard {
        let all = self
            .candidates
            .iter()
            .fold(Bitboard::EMPTY, |acc, m| acc | m.places());
        all & !self.placed
    }

    fn is_single(&self) -> bool {
        self.lifted.count() == 1 && self.placed.is_empty()
    }

    fn complete(&self) -> Vec<BoardMove> {
        self.candidates
            .iter()
            .filter(|m| m.lifts() == self.lifted && m.places() == self.placed)
            .copied()
            .collect()
    }
}

/// Terminal record of why interpretation stopped
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HaltState {
    pub error: ReconcileError,
    /// The diff being interpreted when the halt happened
    pub diff: OccupancyDiff,
    /// FEN of the last consistent game state
    pub last_fen: String,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub enum ReconcilerState {
    Idle,
    /// One square lifted, nothing placed yet
    PendingSingle(PendingAction),
    /// Several squares involved in one legal move (castling, captures,
    /// en passant), not yet complete
    PendingCompound(PendingAction),
    /// Footprint of a promotion complete, waiting for the piece choice.
    /// Candidates hold only the promotion variants.
    PendingPromotion(PendingAction),
    Halted(HaltState),
}

impl ReconcilerState {
    pub fn name(&self) -> &'static str {
        match self {
            ReconcilerState::Idle => "idle",
            ReconcilerState::PendingSingle(_) => "pending_single",
            ReconcilerState::PendingCompound(_) => "pending_compound",
            ReconcilerState::PendingPromotion(_) => "pending_promotion",
            ReconcilerState::Halted(_) => "halted",
        }
    }
}

/// Outcome of a single interpreted event or control call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Started { square: Square },
    Progressed { lifted: Bitboard, placed: Bitboard },
    /// The lifted piece went back to its origin
    Cancelled { square: Square },
    AwaitingPromotion { from: Square, to: Square },
    Committed(CommittedMove),
    Halted(HaltState),
}

#[derive(Debug)]
pub struct MoveReconciler {
    state: ReconcilerState,
    promotion: PromotionPolicy,
    capture_fallback: bool,
    /// Promotion piece supplied ahead of the promotion itself
    promotion_choice: Option<PieceKind>,
}

impl MoveReconciler {
    pub fn new(promotion: PromotionPolicy, capture_fallback: bool) -> Self {
        Self {
            state: ReconcilerState::Idle,
            promotion,
            capture_fallback,
            promotion_choice: None,
        }
    }

    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, ReconcilerState::Idle)
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.state, ReconcilerState::Halted(_))
    }

    pub fn halt_state(&self) -> Option<&HaltState> {
        match &self.state {
            ReconcilerState::Halted(halt) => Some(halt),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        match &self.state {
            ReconcilerState::PendingSingle(action)
            | ReconcilerState::PendingCompound(action)
            | ReconcilerState::PendingPromotion(action) => Some(action),
            ReconcilerState::Idle | ReconcilerState::Halted(_) => None,
        }
    }

    pub fn promotion_choice(&self) -> Option<PieceKind> {
        self.promotion_choice
    }

    /// Back to `Idle`, dropping any pending action, halt and stored choice
    pub fn reset(&mut self) {
        self.state = ReconcilerState::Idle;
        self.promotion_choice = None;
    }

    /// Interpret one diff. Returns one step per event handled; an empty
    /// diff yields no steps. Once halted every call reports the same halt.
    pub fn process<G: GameRules>(
        &mut self,
        diff: &OccupancyDiff,
        game: &mut G,
        now: Instant,
    ) -> Vec<Step> {
        if let ReconcilerState::Halted(halt) = &self.state {
            return vec![Step::Halted(halt.clone())];
        }
        if diff.is_empty() {
            return Vec::new();
        }
        if diff.len() > MAX_CHANGES_PER_READING {
            let error = ReconcileError::UnsupportedSimultaneousChange {
                squares: diff.len(),
            };
            return vec![self.halt(error, diff, game)];
        }

        debug!(%diff, state = self.state.name(), "interpreting diff");
        let mut changes = diff.changes();
        if matches!(self.state, ReconcilerState::Idle) {
            // Two pieces lifted in one reading: start from the one that can move
            changes.sort_by_cached_key(|c| match c.change {
                Change::BecameEmpty if !game.legal_moves_lifting(c.square).is_empty() => 0,
                Change::BecameEmpty => 1,
                Change::BecameOccupied => 2,
            });
        }
        let mut steps = Vec::new();
        for change in changes {
            let result = match change.change {
                Change::BecameEmpty => self.on_lift(change.square, game, now),
                Change::BecameOccupied => self.on_place(change.square, game),
            };
            match result {
                Ok(step) => steps.push(step),
                Err(error) => {
                    steps.push(self.halt(error, diff, game));
                    break;
                }
            }
        }
        steps
    }

    fn on_lift<G: GameRules>(
        &mut self,
        square: Square,
        game: &mut G,
        now: Instant,
    ) -> Result<Step, ReconcileError> {
        match std::mem::replace(&mut self.state, ReconcilerState::Idle) {
            ReconcilerState::Idle => {
                let candidates = game.legal_moves_lifting(square);
                if candidates.is_empty() {
                    return Err(ReconcileError::illegal_lift(format!(
                        "no legal move starts by lifting {}",
                        square
                    )));
                }
                debug!(%square, candidates = candidates.len(), "action started");
                self.state =
                    ReconcilerState::PendingSingle(PendingAction::start(square, candidates, now));
                Ok(Step::Started { square })
            }
            ReconcilerState::PendingSingle(mut action)
            | ReconcilerState::PendingCompound(mut action) => {
                if action.placed.contains(square) {
                    // A piece put down during this action was picked up again
                    action.placed.discard(square);
                } else {
                    action.lifted.add(square);
                    action.candidates.retain(|m| m.lifts().contains(square));
                }
                if action.candidates.is_empty() {
                    return Err(ReconcileError::illegal_lift(format!(
                        "lifting {} is inconsistent with any legal move in progress",
                        square
                    )));
                }
                self.settle(action, game)
            }
            ReconcilerState::PendingPromotion(_) => Err(ReconcileError::illegal_lift(format!(
                "{} lifted while waiting for a promotion choice",
                square
            ))),
            ReconcilerState::Halted(halt) => {
                self.state = ReconcilerState::Halted(halt.clone());
                Ok(Step::Halted(halt))
            }
        }
    }

    fn on_place<G: GameRules>(
        &mut self,
        square: Square,
        game: &mut G,
    ) -> Result<Step, ReconcileError> {
        match std::mem::replace(&mut self.state, ReconcilerState::Idle) {
            ReconcilerState::Idle => Err(ReconcileError::illegal_destination(format!(
                "piece placed on {} with nothing lifted",
                square
            ))),
            ReconcilerState::PendingSingle(action) if action.origin() == Some(square) => {
                debug!(%square, "piece put back, action cancelled");
                Ok(Step::Cancelled { square })
            }
            ReconcilerState::PendingSingle(mut action)
            | ReconcilerState::PendingCompound(mut action) => {
                action.placed.add(square);
                action.candidates.retain(|m| m.places().contains(square));
                if action.candidates.is_empty() {
                    return Err(ReconcileError::illegal_destination(format!(
                        "{} does not complete any legal move of the lifted piece",
                        square
                    )));
                }
                self.settle(action, game)
            }
            ReconcilerState::PendingPromotion(_) => {
                Err(ReconcileError::illegal_destination(format!(
                    "piece placed on {} while waiting for a promotion choice",
                    square
                )))
            }
            ReconcilerState::Halted(halt) => {
                self.state = ReconcilerState::Halted(halt.clone());
                Ok(Step::Halted(halt))
            }
        }
    }

    /// Commit if exactly one move is complete, otherwise keep waiting.
    fn settle<G: GameRules>(
        &mut self,
        action: PendingAction,
        game: &mut G,
    ) -> Result<Step, ReconcileError> {
        let complete = action.complete();
        if complete.is_empty() {
            let step = Step::Progressed {
                lifted: action.lifted,
                placed: action.placed,
            };
            self.state = if action.is_single() {
                ReconcilerState::PendingSingle(action)
            } else {
                ReconcilerState::PendingCompound(action)
            };
            return Ok(step);
        }

        if has_distinct_footprints(&complete) {
            return Err(ReconcileError::AmbiguousCompletion {
                candidates: complete.iter().map(BoardMove::coordinate).collect(),
            });
        }

        if let [single] = complete.as_slice() {
            if !single.is_promotion() {
                let single = *single;
                return self.commit(&single, game);
            }
        }
        self.resolve_promotion(action, complete, game)
    }

    fn resolve_promotion<G: GameRules>(
        &mut self,
        mut action: PendingAction,
        variants: Vec<BoardMove>,
        game: &mut G,
    ) -> Result<Step, ReconcileError> {
        let choice = match self.promotion {
            PromotionPolicy::Auto { piece } => Some(self.promotion_choice.take().unwrap_or(piece)),
            PromotionPolicy::AwaitChoice => self.promotion_choice.take(),
        };

        if let Some(piece) = choice {
            return match variants.iter().find(|m| m.promotion == Some(piece)) {
                Some(mv) => self.commit(mv, game),
                None => Err(ReconcileError::EngineRejectedMove {
                    mv: variants[0].coordinate(),
                    message: format!("no legal promotion to {}", piece),
                }),
            };
        }

        let (from, to) = (variants[0].from, variants[0].to);
        info!(%from, %to, "waiting for promotion choice");
        action.candidates = variants;
        self.state = ReconcilerState::PendingPromotion(action);
        Ok(Step::AwaitingPromotion { from, to })
    }

    fn commit<G: GameRules>(
        &mut self,
        mv: &BoardMove,
        game: &mut G,
    ) -> Result<Step, ReconcileError> {
        match game.apply(mv) {
            Ok(committed) => {
                info!(uci = %committed.uci, san = %committed.san, "move committed");
                self.state = ReconcilerState::Idle;
                Ok(Step::Committed(committed))
            }
            Err(e) => Err(ReconcileError::EngineRejectedMove {
                mv: mv.coordinate(),
                message: e.to_string(),
            }),
        }
    }

    /// Promotion piece from the operator. Commits a waiting promotion, or
    /// is stored for the next one. Returns `None` when nothing was waiting.
    pub fn supply_promotion_choice<G: GameRules>(
        &mut self,
        piece: PieceKind,
        game: &mut G,
    ) -> GameResult<Option<Step>> {
        if !piece.is_promotion_piece() {
            return Err(GameError::InvalidPromotionPiece { piece });
        }

        match std::mem::replace(&mut self.state, ReconcilerState::Idle) {
            ReconcilerState::PendingPromotion(action) => {
                let step = match action.candidates.iter().find(|m| m.promotion == Some(piece)) {
                    Some(mv) => {
                        let mv = *mv;
                        self.commit(&mv, game)
                    }
                    None => Err(ReconcileError::EngineRejectedMove {
                        mv: action
                            .candidates
                            .first()
                            .map(BoardMove::coordinate)
                            .unwrap_or_default(),
                        message: format!("no legal promotion to {}", piece),
                    }),
                };
                Ok(Some(step.unwrap_or_else(|error| {
                    self.halt(error, &OccupancyDiff::default(), game)
                })))
            }
            ReconcilerState::Halted(halt) => {
                self.state = ReconcilerState::Halted(halt.clone());
                Ok(Some(Step::Halted(halt)))
            }
            other => {
                self.state = other;
                debug!(%piece, "promotion choice stored");
                self.promotion_choice = Some(piece);
                Ok(None)
            }
        }
    }

    /// Explicit commit signal for a capture whose destination never
    /// toggled: with one origin lifted and nothing placed, commit the only
    /// capture from that origin. Returns `None` if there is nothing to
    /// confirm or the fallback is disabled.
    pub fn confirm<G: GameRules>(&mut self, game: &mut G) -> Option<Step> {
        if let ReconcilerState::Halted(halt) = &self.state {
            return Some(Step::Halted(halt.clone()));
        }
        if !self.capture_fallback {
            return None;
        }
        let ReconcilerState::PendingSingle(action) = &self.state else {
            return None;
        };
        let origin = action.origin()?;

        let captures: Vec<BoardMove> = action
            .candidates
            .iter()
            .filter(|m| m.from == origin && m.kind == MoveKind::Capture)
            .copied()
            .collect();
        let result = if captures.is_empty() {
            Err(ReconcileError::illegal_destination(format!(
                "no capture from {} to confirm",
                origin
            )))
        } else if has_distinct_footprints(&captures) {
            Err(ReconcileError::AmbiguousCompletion {
                candidates: captures.iter().map(BoardMove::coordinate).collect(),
            })
        } else {
            let mut action = action.clone();
            action.lifted = captures[0].lifts();
            action.placed = captures[0].places();
            match captures.as_slice() {
                [single] if !single.is_promotion() => {
                    let single = *single;
                    self.commit(&single, game)
                }
                _ => self.resolve_promotion(action, captures.clone(), game),
            }
        };
        Some(result.unwrap_or_else(|error| self.halt(error, &OccupancyDiff::default(), game)))
    }

    /// Halt if the pending action is older than `max_age`
    pub fn expire<G: GameRules>(
        &mut self,
        now: Instant,
        max_age: Duration,
        game: &mut G,
    ) -> Option<Step> {
        let action = self.pending()?;
        if !action.is_stale(now, max_age) {
            return None;
        }
        let error = ReconcileError::AbandonedAction {
            elapsed_ms: whole_millis(action.age(now)),
        };
        Some(self.halt(error, &OccupancyDiff::default(), game))
    }

    fn halt<G: GameRules>(&mut self, error: ReconcileError, diff: &OccupancyDiff, game: &G) -> Step {
        let reason = error.to_string();
        warn!(kind = error.kind(), %reason, %diff, "board interpretation halted");
        let halt = HaltState {
            error,
            diff: *diff,
            last_fen: game.fen(),
            reason,
        };
        self.state = ReconcilerState::Halted(halt.clone());
        Step::Halted(halt)
    }
}

fn has_distinct_footprints(moves: &[BoardMove]) -> bool {
    moves
        .split_first()
        .is_some_and(|(first, rest)| rest.iter().any(|m| !m.same_footprint(first)))
}

/// Milliseconds in `duration`, saturating at `u64::MAX`
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
