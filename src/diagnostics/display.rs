//! Builds the diagnostic board view.
//!
//! Depends on domain + models, not vice versa.

use shakmaty::{Bitboard, Square};

use crate::diagnostics::view_models::{BoardView, SquareMarker, SquareView};
use crate::domain::{OccupancyDiff, to_square};
use crate::models::game::GameState;
use crate::models::reconciler::{MoveReconciler, ReconcilerState};
use crate::models::rules::GameRules;

/// Board view of `game`, marked with the action in progress and with
/// `discrepancy` (expected occupancy diffed against the physical board).
pub fn board_view(
    game: &GameState,
    reconciler: &MoveReconciler,
    discrepancy: &OccupancyDiff,
    flipped: bool,
) -> BoardView {
    let (lifted, destinations) = match reconciler.pending() {
        Some(action) => (action.lifted, action.open_destinations() | action.placed),
        None => (Bitboard::EMPTY, Bitboard::EMPTY),
    };

    let marker_for = |square: Square| {
        if lifted.contains(square) {
            SquareMarker::Lifted
        } else if destinations.contains(square) {
            SquareMarker::Destination
        } else if discrepancy.vacated.contains(square) {
            SquareMarker::Missing
        } else if discrepancy.filled.contains(square) {
            SquareMarker::Unexpected
        } else {
            SquareMarker::None
        }
    };

    let rows = (0..8)
        .map(|row| {
            (0..8)
                .map(|col| {
                    let square = if flipped {
                        to_square(7 - row, 7 - col)
                    } else {
                        to_square(row, col)
                    };
                    SquareView {
                        square,
                        piece: game.piece_at(square),
                        marker: marker_for(square),
                    }
                })
                .collect()
        })
        .collect();

    BoardView {
        rows,
        header: header_lines(game, reconciler, discrepancy),
    }
}

fn header_lines(
    game: &GameState,
    reconciler: &MoveReconciler,
    discrepancy: &OccupancyDiff,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} to move, status {:?}",
        game.side_to_move(),
        game.status()
    )];

    let state = reconciler.state();
    match state {
        ReconcilerState::Idle => lines.push("state: idle".to_string()),
        ReconcilerState::PendingSingle(action)
        | ReconcilerState::PendingCompound(action)
        | ReconcilerState::PendingPromotion(action) => {
            let candidates: Vec<String> =
                action.candidates.iter().map(|m| m.coordinate()).collect();
            lines.push(format!(
                "state: {} lifted [{}] placed [{}] candidates [{}]",
                state.name(),
                squares(action.lifted),
                squares(action.placed),
                candidates.join(" ")
            ));
        }
        ReconcilerState::Halted(halt) => {
            lines.push(format!("state: halted ({})", halt.error.kind()));
            lines.push(format!("reason: {}", halt.reason));
            lines.push(format!("offending diff: {}", halt.diff));
        }
    }

    if !discrepancy.is_empty() {
        lines.push(format!("discrepancy: {}", discrepancy));
    }
    let moves = game.history().san_line();
    if !moves.is_empty() {
        lines.push(format!("moves: {}", moves));
    }
    lines.push(format!("fen: {}", game.fen()));
    lines
}

fn squares(bitboard: Bitboard) -> String {
    bitboard
        .into_iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
