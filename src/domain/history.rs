//! Linear move history of the game being played on the board.
//!
//! The physical board only ever moves forward, so unlike an analysis tree
//! there are no variations: each committed move appends one record.

use serde::Serialize;

/// A committed move together with the notation produced for it
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    /// Half-move number, 1 for the first move of the game
    pub ply: usize,
    /// Coordinate notation, e.g. "e2e4"
    pub uci: String,
    /// Standard algebraic notation with check suffix, e.g. "Nf3+"
    pub san: String,
}

impl MoveRecord {
    /// Get the move number (for display), counting from the fullmove number
    /// the game was set up with.
    /// Returns (move_number, is_black_move)
    pub fn move_number(&self, first_fullmove: usize, first_ply_is_black: bool) -> (usize, bool) {
        let ply = if first_ply_is_black { self.ply + 1 } else { self.ply };
        let move_num = (ply + 1) / 2 + first_fullmove.max(1) - 1;
        let is_black = ply % 2 == 0; // ply 2, 4, 6... are black's moves
        (move_num, is_black)
    }
}

#[derive(Clone, Debug, Default)]
pub struct MoveHistory {
    records: Vec<MoveRecord>,
    /// Fullmove number of the position the game was set up from
    first_fullmove: usize,
    /// Game was set up with black to move
    starts_with_black: bool,
}

impl MoveHistory {
    pub fn new(first_fullmove: usize, starts_with_black: bool) -> Self {
        Self {
            records: Vec::new(),
            first_fullmove,
            starts_with_black,
        }
    }

    /// Append a move and return its ply
    pub fn push(&mut self, uci: String, san: String) -> usize {
        let ply = self.records.len() + 1;
        self.records.push(MoveRecord { ply, uci, san });
        ply
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Coordinate moves in order, as sent to a remote game
    pub fn uci_moves(&self) -> Vec<String> {
        self.records.iter().map(|r| r.uci.clone()).collect()
    }

    /// Move list text such as "1. e4 e5 2. Nf3"
    pub fn san_line(&self) -> String {
        let mut line = String::new();
        for (i, record) in self.records.iter().enumerate() {
            let (move_num, is_black) =
                record.move_number(self.first_fullmove, self.starts_with_black);
            if !line.is_empty() {
                line.push(' ');
            }
            if !is_black {
                line.push_str(&format!("{}. ", move_num));
            } else if i == 0 {
                line.push_str(&format!("{}... ", move_num));
            }
            line.push_str(&record.san);
        }
        line
    }
}
