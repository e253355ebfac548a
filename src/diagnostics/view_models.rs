//! View models for the diagnostic board.
//!
//! Plain data prepared from the game and the reconciler; the renderer only
//! formats them.

use shakmaty::Square;

use crate::domain::Piece;

/// Glyph for a square with no piece in the game's position
pub const EMPTY_SQUARE: char = '·';

/// What the physical board says about a square, relative to the game
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SquareMarker {
    #[default]
    None,
    /// Origin of the action in progress
    Lifted,
    /// Where the lifted piece may land, or has landed
    Destination,
    /// Game has a piece here, board is empty
    Missing,
    /// Board is occupied, game has nothing here
    Unexpected,
}

impl SquareMarker {
    pub fn symbol(self) -> char {
        match self {
            SquareMarker::None => ' ',
            SquareMarker::Lifted => '*',
            SquareMarker::Destination => '+',
            SquareMarker::Missing => '!',
            SquareMarker::Unexpected => '?',
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SquareView {
    pub square: Square,
    pub piece: Option<Piece>,
    pub marker: SquareMarker,
}

impl SquareView {
    pub fn glyph(&self) -> char {
        self.piece.map(|p| p.glyph()).unwrap_or(EMPTY_SQUARE)
    }
}

/// Everything needed to print the board
#[derive(Clone, Debug)]
pub struct BoardView {
    /// Eight rows in display order, top row first
    pub rows: Vec<Vec<SquareView>>,
    pub header: Vec<String>,
}

impl BoardView {
    pub fn square(&self, square: Square) -> Option<&SquareView> {
        self.rows.iter().flatten().find(|v| v.square == square)
    }
}
