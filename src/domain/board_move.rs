//! Engine-independent view of a legal move, as the physical board sees it.

use std::fmt;

use shakmaty::{Bitboard, Square};

use crate::domain::PieceKind;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MoveKind {
    /// Moves onto an empty square
    Quiet,
    /// Captures the piece standing on the destination
    Capture,
    /// Captures a pawn that is not on the destination square
    EnPassant { captured: Square },
    /// King lands on `to`, rook goes `rook_from` -> `rook_to`
    Castle { rook_from: Square, rook_to: Square },
}

/// A legal move plus the squares it touches.
///
/// `to` is always where the moving piece lands, so for castling it is the
/// king's destination (g1/c1/g8/c8), not the rook's square.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BoardMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub kind: MoveKind,
}

impl BoardMove {
    pub fn quiet(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
            kind: MoveKind::Quiet,
        }
    }

    pub fn capture(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
            kind: MoveKind::Capture,
        }
    }

    pub fn en_passant(from: Square, to: Square, captured: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
            kind: MoveKind::EnPassant { captured },
        }
    }

    pub fn castle(king_from: Square, king_to: Square, rook_from: Square, rook_to: Square) -> Self {
        Self {
            from: king_from,
            to: king_to,
            promotion: None,
            kind: MoveKind::Castle { rook_from, rook_to },
        }
    }

    pub fn with_promotion(mut self, piece: PieceKind) -> Self {
        self.promotion = Some(piece);
        self
    }

    pub fn is_capture(&self) -> bool {
        matches!(self.kind, MoveKind::Capture | MoveKind::EnPassant { .. })
    }

    pub fn is_castle(&self) -> bool {
        matches!(self.kind, MoveKind::Castle { .. })
    }

    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    /// Squares whose piece has to leave the board position during the move
    pub fn lifts(&self) -> Bitboard {
        let mut squares = Bitboard::from(self.from);
        match self.kind {
            MoveKind::Quiet => {}
            MoveKind::Capture => squares.add(self.to),
            MoveKind::EnPassant { captured } => squares.add(captured),
            MoveKind::Castle { rook_from, .. } => squares.add(rook_from),
        }
        squares
    }

    /// Squares a moving piece ends up on
    pub fn places(&self) -> Bitboard {
        let mut squares = Bitboard::from(self.to);
        if let MoveKind::Castle { rook_to, .. } = self.kind {
            squares.add(rook_to);
        }
        squares
    }

    /// Same physical footprint, ignoring which piece a pawn promotes to.
    pub fn same_footprint(&self, other: &BoardMove) -> bool {
        self.from == other.from && self.to == other.to && self.kind == other.kind
    }

    /// Coordinate notation, e.g. "e2e4", "e7e8q", "e1g1"
    pub fn coordinate(&self) -> String {
        let mut text = format!("{}{}", self.from, self.to);
        if let Some(piece) = self.promotion {
            text.push(piece.to_role().char());
        }
        text
    }
}

impl fmt::Display for BoardMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinate())
    }
}
