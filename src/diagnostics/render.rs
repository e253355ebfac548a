//! Text rendering of the diagnostic board.

use std::fmt::Write as _;

use crate::diagnostics::display::board_view;
use crate::diagnostics::view_models::BoardView;
use crate::domain::OccupancyDiff;
use crate::models::game::GameState;
use crate::models::reconciler::MoveReconciler;
use crate::models::session::BoardSession;

/// Renders the game plus whatever the physical board disagrees with.
/// Holds no state besides orientation.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiagnosticRenderer {
    pub flipped: bool,
}

impl DiagnosticRenderer {
    pub fn new(flipped: bool) -> Self {
        Self { flipped }
    }

    pub fn view(
        &self,
        game: &GameState,
        reconciler: &MoveReconciler,
        discrepancy: &OccupancyDiff,
    ) -> BoardView {
        board_view(game, reconciler, discrepancy, self.flipped)
    }

    pub fn render(
        &self,
        game: &GameState,
        reconciler: &MoveReconciler,
        discrepancy: &OccupancyDiff,
    ) -> String {
        format_view(&self.view(game, reconciler, discrepancy))
    }

    pub fn render_session(&self, session: &BoardSession<GameState>) -> String {
        self.render(session.game(), session.reconciler(), &session.discrepancy())
    }
}

/// Board with rank labels on the left and file labels below. Each square
/// is its glyph followed by its marker.
pub fn format_view(view: &BoardView) -> String {
    let mut out = String::new();
    for line in &view.header {
        let _ = writeln!(out, "{}", line);
    }
    for row in &view.rows {
        let Some(first) = row.first() else {
            continue;
        };
        out.push(first.square.rank().char());
        out.push(' ');
        for cell in row {
            out.push(' ');
            out.push(cell.glyph());
            out.push(cell.marker.symbol());
        }
        out.push('\n');
    }
    out.push_str("  ");
    if let Some(row) = view.rows.first() {
        for cell in row {
            out.push(' ');
            out.push(cell.square.file().char());
            out.push(' ');
        }
    }
    out.push('\n');
    out
}
