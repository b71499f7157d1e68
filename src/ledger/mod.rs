//! Arrival-ordered eviction ledger
//!
//! Tracks the arrival time of every live row independently of display
//! order, so the oldest rows can be found without scanning the store.
//!
//! Entries are kept sorted by arrival time. Most arrivals are monotonic,
//! so insertion first checks the newest entry and only falls back to a
//! binary search when a row arrives out of order. Equal arrival times
//! keep insertion order.

use std::collections::{HashMap, VecDeque};

use crate::clock::Millis;
use crate::store::RowId;

/// A row paired with its arrival time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgedEntry {
    pub row: RowId,
    pub arrival_time: Millis,
}

/// Arrival-ordered index used for capacity eviction
#[derive(Debug, Default)]
pub struct EvictionLedger {
    entries: VecDeque<AgedEntry>,
    arrivals: HashMap<RowId, Millis>,
    fast_path_hits: u64,
    out_of_order: u64,
}

impl EvictionLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Track `row`; re-inserting a known row moves it to its new arrival time
    pub fn insert(&mut self, row: RowId, arrival_time: Millis) {
        if self.arrivals.contains_key(&row) {
            self.remove(row);
        }
        self.arrivals.insert(row, arrival_time);
        let entry = AgedEntry { row, arrival_time };

        match self.entries.back() {
            None => self.entries.push_back(entry),
            Some(newest) if newest.arrival_time <= arrival_time => {
                self.fast_path_hits += 1;
                self.entries.push_back(entry);
            }
            Some(_) => {
                self.out_of_order += 1;
                let index = self
                    .entries
                    .partition_point(|e| e.arrival_time <= arrival_time);
                self.entries.insert(index, entry);
            }
        }
    }

    /// Remove and return the `n` oldest rows, oldest first
    pub fn evict_oldest(&mut self, n: usize) -> Vec<RowId> {
        let count = n.min(self.entries.len());
        let evicted: Vec<RowId> = self.entries.drain(..count).map(|e| e.row).collect();
        for row in &evicted {
            self.arrivals.remove(row);
        }
        evicted
    }

    /// Stop tracking `row`; false if it was not tracked
    pub fn remove(&mut self, row: RowId) -> bool {
        let Some(arrival_time) = self.arrivals.remove(&row) else {
            return false;
        };
        let start = self
            .entries
            .partition_point(|e| e.arrival_time < arrival_time);
        let end = self
            .entries
            .partition_point(|e| e.arrival_time <= arrival_time);
        match (start..end).find(|&i| self.entries[i].row == row) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Arrival time of a tracked row
    pub fn arrival_time(&self, row: RowId) -> Option<Millis> {
        self.arrivals.get(&row).copied()
    }

    /// Oldest tracked entry
    pub fn oldest(&self) -> Option<AgedEntry> {
        self.entries.front().copied()
    }

    /// Forget every row
    pub fn clear(&mut self) {
        self.entries.clear();
        self.arrivals.clear();
    }

    /// Inserts that took the monotonic fast path
    pub fn fast_path_hits(&self) -> u64 {
        self.fast_path_hits
    }

    /// Inserts that needed a binary search
    pub fn out_of_order_inserts(&self) -> u64 {
        self.out_of_order
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &AgedEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_inserts_use_fast_path() {
        let mut ledger = EvictionLedger::new();
        for i in 0..5 {
            ledger.insert(RowId(i), 100 + i);
        }
        assert_eq!(ledger.fast_path_hits(), 4);
        assert_eq!(ledger.out_of_order_inserts(), 0);
        assert_eq!(ledger.oldest().map(|e| e.row), Some(RowId(0)));
    }

    #[test]
    fn test_out_of_order_insert_lands_in_place() {
        let mut ledger = EvictionLedger::new();
        ledger.insert(RowId(1), 10);
        ledger.insert(RowId(2), 30);
        ledger.insert(RowId(3), 20);
        ledger.insert(RowId(4), 5);
        assert_eq!(ledger.out_of_order_inserts(), 2);
        let order: Vec<_> = ledger.iter().map(|e| e.row.0).collect();
        assert_eq!(order, vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_evict_oldest() {
        let mut ledger = EvictionLedger::new();
        ledger.insert(RowId(1), 30);
        ledger.insert(RowId(2), 10);
        ledger.insert(RowId(3), 20);
        assert_eq!(ledger.evict_oldest(2), vec![RowId(2), RowId(3)]);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.arrival_time(RowId(2)), None);
        assert_eq!(ledger.evict_oldest(5), vec![RowId(1)]);
    }

    #[test]
    fn test_evict_on_empty_is_noop() {
        let mut ledger = EvictionLedger::new();
        assert!(ledger.evict_oldest(3).is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut ledger = EvictionLedger::new();
        ledger.insert(RowId(1), 50);
        ledger.insert(RowId(2), 50);
        ledger.insert(RowId(3), 60);
        ledger.insert(RowId(4), 50);
        assert_eq!(
            ledger.evict_oldest(3),
            vec![RowId(1), RowId(2), RowId(4)]
        );
    }

    #[test]
    fn test_remove_among_ties() {
        let mut ledger = EvictionLedger::new();
        ledger.insert(RowId(1), 50);
        ledger.insert(RowId(2), 50);
        ledger.insert(RowId(3), 50);
        assert!(ledger.remove(RowId(2)));
        assert!(!ledger.remove(RowId(2)));
        assert_eq!(ledger.evict_oldest(5), vec![RowId(1), RowId(3)]);
    }

    #[test]
    fn test_reinsert_moves_entry() {
        let mut ledger = EvictionLedger::new();
        ledger.insert(RowId(1), 10);
        ledger.insert(RowId(2), 20);
        ledger.insert(RowId(1), 30);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.oldest().map(|e| e.row), Some(RowId(2)));
    }
}
