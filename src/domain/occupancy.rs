//! Occupancy snapshots and the diffs between them.
//!
//! A snapshot carries one bit per square (bit N = square N, a1 = 0, h8 = 63)
//! and nothing else: no piece identity, no color.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use shakmaty::{Bitboard, Square};

/// One full reading of the physical board
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Occupancy(Bitboard);

impl Occupancy {
    pub const EMPTY: Occupancy = Occupancy(Bitboard(0));

    pub fn new(bits: u64) -> Self {
        Self(Bitboard(bits))
    }

    pub fn from_bitboard(bitboard: Bitboard) -> Self {
        Self(bitboard)
    }

    pub fn bits(self) -> u64 {
        self.0.0
    }

    pub fn bitboard(self) -> Bitboard {
        self.0
    }

    pub fn is_occupied(self, square: Square) -> bool {
        self.0.contains(square)
    }

    pub fn count(self) -> usize {
        self.0.count()
    }

    /// Copy of this snapshot with the given square emptied
    pub fn without(self, square: Square) -> Self {
        let mut bitboard = self.0;
        bitboard.discard(square);
        Self(bitboard)
    }

    /// Copy of this snapshot with the given square occupied
    pub fn with(self, square: Square) -> Self {
        let mut bitboard = self.0;
        bitboard.add(square);
        Self(bitboard)
    }

    /// Squares whose status differs between `self` (older) and `next`
    pub fn diff(self, next: Occupancy) -> OccupancyDiff {
        let changed = self.0 ^ next.0;
        OccupancyDiff {
            vacated: changed & self.0,
            filled: changed & next.0,
        }
    }
}

impl From<u64> for Occupancy {
    fn from(bits: u64) -> Self {
        Occupancy::new(bits)
    }
}

impl fmt::Debug for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Occupancy({:#018x})", self.bits())
    }
}

/// Rank 8 at the top, `1` = occupied.
impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u32).rev() {
            for file in 0..8u32 {
                let square = Square::new(rank * 8 + file);
                f.write_str(if self.is_occupied(square) { "1" } else { "0" })?;
            }
            if rank > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl Serialize for Occupancy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Occupancy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = <u64 as Deserialize>::deserialize(deserializer)?;
        Ok(Occupancy::new(bits))
    }
}

/// Direction of a single square's change
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Change {
    BecameEmpty,
    BecameOccupied,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SquareChange {
    pub square: Square,
    pub change: Change,
}

/// The set of squares that flipped between two consecutive snapshots
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct OccupancyDiff {
    pub vacated: Bitboard,
    pub filled: Bitboard,
}

impl OccupancyDiff {
    pub fn len(&self) -> usize {
        self.vacated.count() + self.filled.count()
    }

    pub fn is_empty(&self) -> bool {
        self.vacated.is_empty() && self.filled.is_empty()
    }

    /// Single-square events, became-empty first, each group in square order.
    pub fn changes(&self) -> Vec<SquareChange> {
        let lifts = self.vacated.into_iter().map(|square| SquareChange {
            square,
            change: Change::BecameEmpty,
        });
        let places = self.filled.into_iter().map(|square| SquareChange {
            square,
            change: Change::BecameOccupied,
        });
        lifts.chain(places).collect()
    }

    /// Squares as strings, e.g. `["-e2", "+e4"]`, for logs and events.
    pub fn describe(&self) -> Vec<String> {
        self.changes()
            .into_iter()
            .map(|c| match c.change {
                Change::BecameEmpty => format!("-{}", c.square),
                Change::BecameOccupied => format!("+{}", c.square),
            })
            .collect()
    }
}

impl fmt::Debug for OccupancyDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OccupancyDiff{:?}", self.describe())
    }
}

impl fmt::Display for OccupancyDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(no change)");
        }
        f.write_str(&self.describe().join(" "))
    }
}
