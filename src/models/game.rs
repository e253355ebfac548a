//! Game state model - the authoritative chess position behind the board.
//!
//! Wraps a shakmaty `Chess` position. Legality, move generation and
//! notation all come from shakmaty; this type only adapts them to the
//! occupancy-level view the reconciler works with.

use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Color as SColor, EnPassantMode, File, Move, Position, Square};
use tracing::debug;

use crate::domain::{
    BoardMove, MoveHistory, Occupancy, Piece, PieceColor, PieceKind, shakmaty_to_piece,
};
use crate::error::{GameError, GameResult};
use crate::models::rules::{CommittedMove, GameRules, TerminalStatus};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Half-moves without capture or pawn move after which the game is drawn
/// without a claim (75-move rule).
const AUTOMATIC_DRAW_HALFMOVES: u32 = 150;

/// The authoritative game: position, history and terminal status
#[derive(Clone, Debug)]
pub struct GameState {
    position: Chess,
    initial_fen: String,
    history: MoveHistory,
    status: TerminalStatus,
}

impl GameState {
    /// A new game from the standard starting position
    pub fn new() -> Self {
        Self::from_position(Chess::default(), START_FEN.to_string())
    }

    /// A game resumed from a FEN string
    pub fn from_fen(fen: &str) -> GameResult<Self> {
        let parsed: Fen = fen.trim().parse().map_err(|e| GameError::InvalidFen {
            fen: fen.to_string(),
            message: format!("{}", e),
        })?;
        let position: Chess =
            parsed
                .into_position(CastlingMode::Standard)
                .map_err(|e| GameError::InvalidFen {
                    fen: fen.to_string(),
                    message: format!("{}", e),
                })?;
        Ok(Self::from_position(position, fen.trim().to_string()))
    }

    fn from_position(position: Chess, initial_fen: String) -> Self {
        let status = status_of(&position);
        let history = MoveHistory::new(
            position.fullmoves().get() as usize,
            position.turn() == SColor::Black,
        );
        Self {
            position,
            initial_fen,
            history,
            status,
        }
    }

    /// Get the current position
    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn initial_fen(&self) -> &str {
        &self.initial_fen
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    pub fn side_to_move(&self) -> PieceColor {
        PieceColor::from_shakmaty(self.position.turn())
    }

    /// Get piece on a square of the current position
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square).map(shakmaty_to_piece)
    }

    pub fn en_passant_square(&self) -> Option<Square> {
        self.position.ep_square(EnPassantMode::Legal)
    }

    pub fn halfmoves(&self) -> u32 {
        self.position.halfmoves()
    }

    pub fn fullmoves(&self) -> u32 {
        self.position.fullmoves().get()
    }

    /// Castling field of the FEN, e.g. "KQkq" or "-"
    pub fn castling_rights(&self) -> String {
        self.fen()
            .split_whitespace()
            .nth(2)
            .unwrap_or("-")
            .to_string()
    }

    /// Consistent copy of the externally visible state
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            fen: self.fen(),
            initial_fen: self.initial_fen.clone(),
            moves: self.history.uci_moves(),
            side_to_move: self.side_to_move(),
            status: self.status,
            occupancy: self.expected_occupancy(),
        }
    }

    /// Find the shakmaty move behind a board move, if it is legal here
    fn find_legal(&self, mv: &BoardMove) -> Option<Move> {
        let turn = self.position.turn();
        self.position
            .legal_moves()
            .into_iter()
            .find(|m| to_board_move(m, turn).as_ref() == Some(mv))
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRules for GameState {
    fn legal_moves(&self) -> Vec<BoardMove> {
        let turn = self.position.turn();
        self.position
            .legal_moves()
            .iter()
            .filter_map(|m| to_board_move(m, turn))
            .collect()
    }

    fn apply(&mut self, mv: &BoardMove) -> GameResult<CommittedMove> {
        let Some(legal) = self.find_legal(mv) else {
            return Err(GameError::IllegalMove {
                mv: mv.coordinate(),
                fen: self.fen(),
            });
        };

        // `legal` came from the position's own move list, so playing it on a
        // copy cannot fail; the copy replaces the position all at once.
        let mut next = self.position.clone();
        let san = SanPlus::from_move_and_play_unchecked(&mut next, legal).to_string();
        let status = status_of(&next);
        self.position = next;
        self.status = status;
        let uci = mv.coordinate();
        let ply = self.history.push(uci.clone(), san.clone());
        debug!(%uci, %san, ?status, "applied move");

        Ok(CommittedMove {
            mv: *mv,
            uci,
            san,
            ply,
            status,
        })
    }

    fn expected_occupancy(&self) -> Occupancy {
        Occupancy::from_bitboard(self.position.board().occupied())
    }

    fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    fn status(&self) -> TerminalStatus {
        self.status
    }
}

/// Serializable view of the game shared with background consumers
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    pub fen: String,
    pub initial_fen: String,
    pub moves: Vec<String>,
    pub side_to_move: PieceColor,
    pub status: TerminalStatus,
    pub occupancy: Occupancy,
}

fn status_of(position: &Chess) -> TerminalStatus {
    if position.is_checkmate() {
        TerminalStatus::Checkmate
    } else if position.is_stalemate() {
        TerminalStatus::Stalemate
    } else if position.is_insufficient_material()
        || position.halfmoves() >= AUTOMATIC_DRAW_HALFMOVES
    {
        TerminalStatus::Draw
    } else if position.is_check() {
        TerminalStatus::Check
    } else {
        TerminalStatus::None
    }
}

/// Convert a shakmaty move to the board's view of it
fn to_board_move(m: &Move, turn: SColor) -> Option<BoardMove> {
    match m {
        Move::Normal {
            from,
            capture,
            to,
            promotion,
            ..
        } => {
            let base = if capture.is_some() {
                BoardMove::capture(*from, *to)
            } else {
                BoardMove::quiet(*from, *to)
            };
            Some(match promotion {
                Some(role) => base.with_promotion(PieceKind::from_role(*role)),
                None => base,
            })
        }
        Move::EnPassant { from, to } => {
            let captured = Square::from_coords(to.file(), from.rank());
            Some(BoardMove::en_passant(*from, *to, captured))
        }
        Move::Castle { king, rook } => {
            // King lands on the g/c file, rook on the f/d file of its own rank
            let rank = turn.backrank();
            let (king_file, rook_file) = if rook.file() > king.file() {
                (File::G, File::F)
            } else {
                (File::C, File::D)
            };
            Some(BoardMove::castle(
                *king,
                Square::from_coords(king_file, rank),
                *rook,
                Square::from_coords(rook_file, rank),
            ))
        }
        Move::Put { .. } => None,
    }
}
