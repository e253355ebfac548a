//! Tracks the last accepted occupancy snapshot.

use crate::domain::{Occupancy, OccupancyDiff};

#[derive(Clone, Debug)]
pub struct OccupancyObserver {
    baseline: Occupancy,
}

impl OccupancyObserver {
    pub fn new(baseline: Occupancy) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> Occupancy {
        self.baseline
    }

    /// Diff of `snapshot` against the baseline. Does not move the baseline.
    pub fn observe(&self, snapshot: Occupancy) -> OccupancyDiff {
        self.baseline.diff(snapshot)
    }

    /// Accept `snapshot` as the new baseline once its diff was interpreted
    pub fn advance(&mut self, snapshot: Occupancy) {
        self.baseline = snapshot;
    }

    /// Replace the baseline with the board's confirmed physical state
    pub fn reset(&mut self, snapshot: Occupancy) {
        self.baseline = snapshot;
    }
}
