//! Row store
//!
//! Ordered sequence of rows in display order. Positions are looked up
//! through a `RowId -> index` map that is rebuilt lazily after any
//! mutation that shifts rows.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::alarm::{AlarmLevel, AlarmState};
use crate::clock::Millis;
use crate::errors::{TableError, TableResult};

/// Stable identity of a row for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

/// Alarm state carried by rows of alarm-class views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAlarm {
    /// Subject identity (channel id)
    pub key: String,
    /// Current alarm level
    pub level: AlarmLevel,
    /// Lifecycle state
    pub state: AlarmState,
    /// Timestamp of the sample currently on display
    pub sample_time: Millis,
}

/// One displayed record
#[derive(Debug, Clone, Serialize)]
pub struct Row<D> {
    /// Identity
    pub id: RowId,
    /// Ingestion time, used only for eviction
    pub arrival_time: Millis,
    /// Key extracted from the active sort column
    pub sort_key: Option<String>,
    /// Alarm lifecycle, alarm-class views only
    pub alarm: Option<RowAlarm>,
    /// Display data owned by the presentation layer
    pub data: D,
}

impl<D> Row<D> {
    /// Row without a sort key or alarm state
    pub fn new(id: RowId, arrival_time: Millis, data: D) -> Self {
        Self {
            id,
            arrival_time,
            sort_key: None,
            alarm: None,
            data,
        }
    }

    /// Sort key as `&str`
    pub fn key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }
}

/// Rows in display order
#[derive(Debug)]
pub struct RowStore<D> {
    rows: Vec<Row<D>>,
    positions: HashMap<RowId, usize>,
    dirty: bool,
}

impl<D> Default for RowStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> RowStore<D> {
    /// Empty store
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            positions: HashMap::new(),
            dirty: false,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert at `index` (clamped to `len`); returns the actual index
    pub fn insert_at(&mut self, index: usize, row: Row<D>) -> usize {
        let index = index.min(self.rows.len());
        if index == self.rows.len() && !self.dirty {
            self.positions.insert(row.id, index);
        } else {
            self.dirty = true;
        }
        self.rows.insert(index, row);
        index
    }

    /// Remove a row by id
    pub fn remove(&mut self, id: RowId) -> Option<Row<D>> {
        let index = self.position(id)?;
        let row = self.rows.remove(index);
        self.positions.remove(&id);
        if index != self.rows.len() {
            self.dirty = true;
        }
        Some(row)
    }

    /// Remove every row in `ids`, preserving the order of the rest
    ///
    /// Returns removed rows in their former display order.
    pub fn remove_many(&mut self, ids: &HashSet<RowId>) -> Vec<Row<D>> {
        if ids.is_empty() {
            return Vec::new();
        }
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.rows)
            .into_iter()
            .partition(|row| ids.contains(&row.id));
        self.rows = kept;
        if !removed.is_empty() {
            self.dirty = true;
        }
        removed
    }

    /// Current display index of `id`
    pub fn position(&mut self, id: RowId) -> Option<usize> {
        self.reindex();
        self.positions.get(&id).copied()
    }

    /// Row by id
    pub fn get(&self, id: RowId) -> Option<&Row<D>> {
        if self.dirty {
            self.rows.iter().find(|row| row.id == id)
        } else {
            self.positions.get(&id).and_then(|&i| self.rows.get(i))
        }
    }

    /// Mutable row by id
    pub fn get_mut(&mut self, id: RowId) -> Option<&mut Row<D>> {
        let index = self.position(id)?;
        self.rows.get_mut(index)
    }

    /// Row at a display index
    pub fn row_at(&self, index: usize) -> Option<&Row<D>> {
        self.rows.get(index)
    }

    /// Rows in display order
    pub fn iter(&self) -> std::slice::Iter<'_, Row<D>> {
        self.rows.iter()
    }

    /// Mutable rows in display order
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Row<D>> {
        self.rows.iter_mut()
    }

    /// All rows as a slice
    pub fn as_slice(&self) -> &[Row<D>] {
        &self.rows
    }

    /// Remove every row; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.rows.len();
        self.rows.clear();
        self.positions.clear();
        self.dirty = false;
        count
    }

    /// Reorder so that new position `i` holds the row previously at `permutation[i]`
    pub fn apply_permutation(&mut self, permutation: &[usize]) -> TableResult<()> {
        if permutation.len() != self.rows.len() {
            return Err(TableError::InvariantViolation(format!(
                "permutation of {} entries for {} rows",
                permutation.len(),
                self.rows.len()
            )));
        }
        let mut seen = vec![false; permutation.len()];
        for &source in permutation {
            match seen.get_mut(source) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(TableError::InvariantViolation(format!(
                        "permutation entry {} is out of range or repeated",
                        source
                    )))
                }
            }
        }

        let mut slots: Vec<Option<Row<D>>> =
            std::mem::take(&mut self.rows).into_iter().map(Some).collect();
        self.rows = permutation
            .iter()
            .filter_map(|&source| slots[source].take())
            .collect();
        self.dirty = true;
        Ok(())
    }

    fn reindex(&mut self) {
        if !self.dirty {
            return;
        }
        self.positions.clear();
        self.positions
            .extend(self.rows.iter().enumerate().map(|(i, row)| (row.id, i)));
        self.dirty = false;
    }
}
