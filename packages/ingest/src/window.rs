//! The unsynchronised sliding-window store.
//!
//! [`Window`] is always accessed through the mutex in
//! [`crate::LocationIngest`]; nothing here locks.
//!
//! Samples are stored per cell under an [`Age`] key, and a second index
//! maps every age back to its cell. Both expiry and capacity trimming
//! pop from the front of that index, so removing `k` samples costs
//! `O(k log n)` regardless of how many cells are live.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use raahi_ingest_models::PositionSample;

use crate::CellKey;

/// Point-in-time copy of every retained sample, grouped by cell.
pub type WindowSnapshot = BTreeMap<CellKey, Vec<PositionSample>>;

/// Sample timestamp plus arrival sequence; equal timestamps are ordered
/// by arrival.
type Age = (DateTime<Utc>, u64);

#[derive(Debug, Default)]
pub(crate) struct Window {
    cells: BTreeMap<CellKey, BTreeMap<Age, PositionSample>>,
    by_age: BTreeMap<Age, CellKey>,
    next_seq: u64,
}

impl Window {
    pub(crate) fn insert(&mut self, cell: CellKey, sample: PositionSample) {
        let age = (sample.timestamp, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.cells.entry(cell).or_default().insert(age, sample);
        self.by_age.insert(age, cell);
    }

    /// Removes every sample with `timestamp < cutoff`. Empty cells are
    /// dropped. Returns the number of samples removed.
    pub(crate) fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let retained = self.by_age.split_off(&(cutoff, 0));
        let expired = std::mem::replace(&mut self.by_age, retained);
        let removed = expired.len();
        for (age, cell) in expired {
            self.remove_from_cell(cell, &age);
        }
        removed
    }

    /// Drops the oldest samples until at most `capacity` remain. Returns
    /// the number of samples removed.
    pub(crate) fn enforce_capacity(&mut self, capacity: usize) -> usize {
        let mut removed = 0;
        while self.by_age.len() > capacity {
            let Some((age, cell)) = self.by_age.pop_first() else {
                break;
            };
            self.remove_from_cell(cell, &age);
            removed += 1;
        }
        removed
    }

    fn remove_from_cell(&mut self, cell: CellKey, age: &Age) {
        if let Some(samples) = self.cells.get_mut(&cell) {
            samples.remove(age);
            if samples.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Samples in `cell`, oldest first.
    pub(crate) fn cell(&self, cell: CellKey) -> Vec<PositionSample> {
        self.cells
            .get(&cell)
            .map(|samples| samples.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn snapshot(&self) -> WindowSnapshot {
        self.cells
            .iter()
            .map(|(cell, samples)| (*cell, samples.values().cloned().collect()))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_age.len()
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
        self.by_age.clear();
    }
}
