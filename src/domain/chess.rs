//! Pure chess domain types and utilities.
//! No I/O here - this is the domain layer.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shakmaty::{Color as SColor, File, Rank, Role, Square};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    /// Pieces a pawn may promote to
    pub const PROMOTIONS: [PieceKind; 4] = [
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
    ];

    pub fn is_promotion_piece(self) -> bool {
        Self::PROMOTIONS.contains(&self)
    }

    pub fn to_role(self) -> Role {
        match self {
            PieceKind::Pawn => Role::Pawn,
            PieceKind::Knight => Role::Knight,
            PieceKind::Bishop => Role::Bishop,
            PieceKind::Rook => Role::Rook,
            PieceKind::Queen => Role::Queen,
            PieceKind::King => Role::King,
        }
    }

    pub fn from_role(role: Role) -> Self {
        match role {
            Role::Pawn => PieceKind::Pawn,
            Role::Knight => PieceKind::Knight,
            Role::Bishop => PieceKind::Bishop,
            Role::Rook => PieceKind::Rook,
            Role::Queen => PieceKind::Queen,
            Role::King => PieceKind::King,
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceKind::Pawn => "pawn",
            PieceKind::Rook => "rook",
            PieceKind::Knight => "knight",
            PieceKind::Bishop => "bishop",
            PieceKind::Queen => "queen",
            PieceKind::King => "king",
        };
        f.write_str(name)
    }
}

/// Accepts full names ("queen") and single letters ("q", "N").
impl FromStr for PieceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "pawn" => Ok(PieceKind::Pawn),
            "r" | "rook" => Ok(PieceKind::Rook),
            "n" | "knight" => Ok(PieceKind::Knight),
            "b" | "bishop" => Ok(PieceKind::Bishop),
            "q" | "queen" => Ok(PieceKind::Queen),
            "k" | "king" => Ok(PieceKind::King),
            other => Err(format!("unknown piece kind '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceColor {
    White,
    Black,
}

impl PieceColor {
    pub fn from_shakmaty(color: SColor) -> Self {
        match color {
            SColor::White => PieceColor::White,
            SColor::Black => PieceColor::Black,
        }
    }
}

impl fmt::Display for PieceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PieceColor::White => f.write_str("White"),
            PieceColor::Black => f.write_str("Black"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

impl Piece {
    /// Unicode glyph used by the text diagnostics
    pub fn glyph(&self) -> char {
        match (self.kind, self.color) {
            (PieceKind::Pawn, PieceColor::White) => '♙',
            (PieceKind::Knight, PieceColor::White) => '♘',
            (PieceKind::Bishop, PieceColor::White) => '♗',
            (PieceKind::Rook, PieceColor::White) => '♖',
            (PieceKind::Queen, PieceColor::White) => '♕',
            (PieceKind::King, PieceColor::White) => '♔',
            (PieceKind::Pawn, PieceColor::Black) => '♟',
            (PieceKind::Knight, PieceColor::Black) => '♞',
            (PieceKind::Bishop, PieceColor::Black) => '♝',
            (PieceKind::Rook, PieceColor::Black) => '♜',
            (PieceKind::Queen, PieceColor::Black) => '♛',
            (PieceKind::King, PieceColor::Black) => '♚',
        }
    }
}

/// Convert row/col (0-indexed, row 0 = rank 8) to shakmaty Square
pub fn to_square(row: usize, col: usize) -> Square {
    let file = File::new(col as u32);
    let rank = Rank::new(7 - row as u32); // row 0 = rank 8, row 7 = rank 1
    Square::from_coords(file, rank)
}

/// Parse algebraic square notation such as "e4" (case-insensitive)
pub fn parse_square(text: &str) -> Option<Square> {
    text.trim().to_ascii_lowercase().parse().ok()
}

/// Convert shakmaty piece to our domain Piece
pub fn shakmaty_to_piece(piece: shakmaty::Piece) -> Piece {
    Piece {
        kind: PieceKind::from_role(piece.role),
        color: PieceColor::from_shakmaty(piece.color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_square_corners() {
        assert_eq!(to_square(0, 0), Square::A8);
        assert_eq!(to_square(7, 7), Square::H1);
        assert_eq!(to_square(7, 4), Square::E1);
    }

    #[test]
    fn test_parse_square() {
        assert_eq!(parse_square("e4"), Some(Square::E4));
        assert_eq!(parse_square(" H8 "), Some(Square::H8));
        assert_eq!(parse_square("i9"), None);
        assert_eq!(parse_square(""), None);
    }

    #[test]
    fn test_piece_kind_from_str() {
        assert_eq!("q".parse::<PieceKind>(), Ok(PieceKind::Queen));
        assert_eq!("Knight".parse::<PieceKind>(), Ok(PieceKind::Knight));
        assert!("dragon".parse::<PieceKind>().is_err());
    }

    #[test]
    fn test_promotion_pieces() {
        assert!(PieceKind::Queen.is_promotion_piece());
        assert!(PieceKind::Knight.is_promotion_piece());
        assert!(!PieceKind::King.is_promotion_piece());
        assert!(!PieceKind::Pawn.is_promotion_piece());
    }

    #[test]
    fn test_role_round_trip() {
        for kind in PieceKind::PROMOTIONS {
            assert_eq!(PieceKind::from_role(kind.to_role()), kind);
        }
    }
}
