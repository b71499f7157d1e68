//! Table engine
//!
//! Owns the row store, the eviction ledger and the active sort. Every
//! structural operation is total: unknown rows and bad keys are logged and
//! skipped, never returned as errors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::clock::{Clock, Millis};
use crate::config::TableConfig;
use crate::errors::TableError;
use crate::ledger::EvictionLedger;
use crate::listener::{NoopListener, TableListener};
use crate::observability::{log_event_with_fields, Event, TableMetrics};
use crate::schema::{ColumnId, RowData, TableSchema};
use crate::sort::{insertion_index, is_sorted, plan_resort, KeyComparator, SortSpec};
use crate::store::{Row, RowAlarm, RowId, RowStore};

/// An item queued for application
#[derive(Debug, Clone)]
pub struct Ingest<D> {
    /// Display data
    pub data: D,
    /// Arrival stamp; the engine clock is used when absent
    pub arrival_time: Option<Millis>,
    /// Identity for update-in-place; a keyed item replaces the data of the
    /// live row with the same key instead of adding a row
    pub key: Option<String>,
}

impl<D> Ingest<D> {
    /// Unkeyed item stamped on apply
    pub fn new(data: D) -> Self {
        Self {
            data,
            arrival_time: None,
            key: None,
        }
    }

    /// Set the arrival stamp
    pub fn at(mut self, arrival_time: Millis) -> Self {
        self.arrival_time = Some(arrival_time);
        self
    }

    /// Set the update key
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Result of inserting one row
#[derive(Debug)]
pub struct Inserted<D> {
    pub id: RowId,
    pub index: usize,
    /// Rows evicted to make room, in former display order
    pub evicted: Vec<Row<D>>,
}

/// Result of updating one row in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Updated {
    pub id: RowId,
    pub index: usize,
    /// Columns whose text changed
    pub changed: Vec<ColumnId>,
    /// The active sort column changed, so the row may be out of order
    pub sort_key_changed: bool,
}

/// What happened to one ingested item
#[derive(Debug)]
pub enum Applied<D> {
    Inserted(Inserted<D>),
    Updated(Updated),
}

/// Counts for one apply cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub inserted: usize,
    pub updated: usize,
    pub evicted: usize,
    pub expired: usize,
    /// Items dropped without reaching the table (overflow, stale epoch, hidden view)
    pub dropped: usize,
    /// Items the table chose to ignore (filtered, stale sample, no-op transition)
    pub ignored: usize,
}

impl ApplyReport {
    /// Add another report's counts
    pub fn merge(&mut self, other: ApplyReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.evicted += other.evicted;
        self.expired += other.expired;
        self.dropped += other.dropped;
        self.ignored += other.ignored;
    }
}

/// Bounded, sortable table of rows
pub struct TableEngine<D> {
    schema: TableSchema,
    config: TableConfig,
    store: RowStore<D>,
    ledger: EvictionLedger,
    keyed: HashMap<String, RowId>,
    keys_by_row: HashMap<RowId, String>,
    sort: Option<SortSpec>,
    next_id: u64,
    listener: Box<dyn TableListener<D>>,
    metrics: Arc<TableMetrics>,
    clock: Arc<dyn Clock>,
}

impl<D: RowData> TableEngine<D> {
    /// Empty table; zero sizes in `config` are clamped to one
    pub fn new(schema: TableSchema, config: TableConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            schema,
            config: config.normalized(),
            store: RowStore::new(),
            ledger: EvictionLedger::new(),
            keyed: HashMap::new(),
            keys_by_row: HashMap::new(),
            sort: None,
            next_id: 1,
            listener: Box::new(NoopListener),
            metrics: Arc::new(TableMetrics::new()),
            clock,
        }
    }

    /// Report changes to `listener`
    pub fn with_listener(mut self, listener: Box<dyn TableListener<D>>) -> Self {
        self.listener = listener;
        self
    }

    /// Count into shared metrics
    pub fn with_metrics(mut self, metrics: Arc<TableMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    // ==================
    // Accessors
    // ==================

    /// Maximum number of rows
    pub fn capacity(&self) -> usize {
        self.config.max_rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Rows in display order
    pub fn rows(&self) -> &[Row<D>] {
        self.store.as_slice()
    }

    /// Row by id
    pub fn get(&self, id: RowId) -> Option<&Row<D>> {
        self.store.get(id)
    }

    /// Display index of a row
    pub fn position(&mut self, id: RowId) -> Option<usize> {
        self.store.position(id)
    }

    /// Live row holding update key `key`
    pub fn row_for_key(&self, key: &str) -> Option<&Row<D>> {
        self.keyed.get(key).and_then(|&id| self.store.get(id))
    }

    /// Active sort
    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn ledger(&self) -> &EvictionLedger {
        &self.ledger
    }

    pub fn metrics(&self) -> &Arc<TableMetrics> {
        &self.metrics
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Forward a user notification to the listener
    pub fn notify(&self, notice: &TableError) {
        self.listener.on_notice(notice);
    }

    /// Whether rows follow the active sort by their stamped keys
    ///
    /// Always true when unsorted.
    pub fn is_ordered(&self) -> bool {
        match &self.sort {
            Some(spec) => is_sorted(self.store.as_slice(), spec),
            None => true,
        }
    }

    /// Whether a change to `changed` can move rows under the active sort
    ///
    /// Only volatile columns are worth a resort; the sort column must be
    /// volatile and among the changed columns.
    pub fn needs_resort(&self, changed: &[ColumnId]) -> bool {
        match self.sort {
            Some(spec) => self.schema.is_volatile(spec.column) && changed.contains(&spec.column),
            None => false,
        }
    }

    // ==================
    // Row operations
    // ==================

    /// Insert a row, evicting the oldest if the table is full
    pub fn insert(&mut self, data: D, arrival_time: Option<Millis>) -> Inserted<D> {
        self.insert_with(data, arrival_time, None, None)
    }

    pub(crate) fn insert_with(
        &mut self,
        data: D,
        arrival_time: Option<Millis>,
        key: Option<String>,
        alarm: Option<RowAlarm>,
    ) -> Inserted<D> {
        let arrival_time = arrival_time.unwrap_or_else(|| self.clock.now_ms());
        let overflow = (self.store.len() + 1).saturating_sub(self.capacity());
        let evicted = self.evict_oldest(overflow);

        let id = RowId(self.next_id);
        self.next_id += 1;

        let mut row = Row::new(id, arrival_time, data);
        row.alarm = alarm;
        let comparator = self.sort.map(|spec| {
            row.sort_key = row.data.cell(spec.column);
            spec.comparator()
        });
        let index = insertion_index(
            self.store.as_slice(),
            row.key(),
            comparator.as_ref(),
            self.config.insert_order,
        );
        if let Some(cmp) = &comparator {
            self.note_fallbacks(cmp);
        }

        let index = self.store.insert_at(index, row);
        self.ledger.insert(id, arrival_time);
        if let Some(key) = key {
            if let Some(previous) = self.keyed.insert(key.clone(), id) {
                self.keys_by_row.remove(&previous);
            }
            self.keys_by_row.insert(id, key);
        }
        if let Some(row) = self.store.row_at(index) {
            self.listener.on_row_inserted(index, row);
        }
        self.metrics.increment_rows_inserted();

        Inserted { id, index, evicted }
    }

    /// Replace a row's data without moving it
    ///
    /// The stamped sort key is left as placed; a resort re-derives it.
    pub fn update(&mut self, id: RowId, data: D) -> Option<Updated> {
        self.update_with(id, data, None).ok()
    }

    /// Update in place; hands the data back when `id` is not live
    pub(crate) fn update_with(
        &mut self,
        id: RowId,
        data: D,
        alarm: Option<RowAlarm>,
    ) -> Result<Updated, D> {
        let Some(index) = self.store.position(id) else {
            self.violation(&format!("update of unknown {}", id));
            return Err(data);
        };
        let sort = self.sort;
        let schema = &self.schema;
        let Some(row) = self.store.get_mut(id) else {
            return Err(data);
        };

        let changed: Vec<ColumnId> = schema
            .ids()
            .filter(|&column| row.data.cell(column) != data.cell(column))
            .collect();
        let sort_key_changed =
            sort.is_some_and(|spec| row.sort_key != data.cell(spec.column));
        row.data = data;
        if alarm.is_some() {
            row.alarm = alarm;
        }

        self.listener.on_row_updated(index, row);
        self.metrics.increment_rows_updated();

        Ok(Updated {
            id,
            index,
            changed,
            sort_key_changed,
        })
    }

    /// Insert, or update in place when a live row holds the same key
    pub fn upsert(&mut self, ingest: Ingest<D>) -> Applied<D> {
        let existing = ingest
            .key
            .as_deref()
            .and_then(|key| self.keyed.get(key).copied());

        let data = match existing {
            Some(id) => match self.update_with(id, ingest.data, None) {
                Ok(updated) => return Applied::Updated(updated),
                Err(data) => data,
            },
            None => ingest.data,
        };
        Applied::Inserted(self.insert_with(data, ingest.arrival_time, ingest.key, None))
    }

    /// Remove a row; unknown rows are logged and ignored
    pub fn remove(&mut self, id: RowId) -> Option<Row<D>> {
        let Some(row) = self.store.remove(id) else {
            self.violation(&format!("remove of unknown {}", id));
            return None;
        };
        if !self.ledger.remove(id) {
            self.violation(&format!("{} missing from eviction ledger", id));
        }
        self.forget_key(id);
        self.listener.on_row_removed(&row);
        self.metrics.increment_rows_removed();
        Some(row)
    }

    /// Remove the row holding update key `key`
    pub fn remove_key(&mut self, key: &str) -> Option<Row<D>> {
        let id = *self.keyed.get(key)?;
        self.remove(id)
    }

    /// Evict the `n` rows with the oldest arrival times
    ///
    /// Returns them in their former display order. No-op when empty.
    pub fn evict_oldest(&mut self, n: usize) -> Vec<Row<D>> {
        if n == 0 {
            return Vec::new();
        }
        let ids = self.ledger.evict_oldest(n);
        if ids.is_empty() {
            return Vec::new();
        }
        let wanted: HashSet<RowId> = ids.iter().copied().collect();
        let evicted = self.store.remove_many(&wanted);
        if evicted.len() != ids.len() {
            self.violation(&format!(
                "ledger evicted {} rows but the store held {}",
                ids.len(),
                evicted.len()
            ));
        }
        for row in &evicted {
            self.forget_key(row.id);
            self.listener.on_row_removed(row);
        }
        self.metrics.add_rows_evicted(evicted.len() as u64);
        evicted
    }

    /// Apply one drained batch in FIFO order
    ///
    /// When the batch alone fills the table, every current row is evicted
    /// and only the newest `max_rows` items are admitted. Otherwise just
    /// enough of the oldest rows are evicted to make room for the items
    /// that will add rows.
    pub fn apply_batch(&mut self, mut batch: Vec<Ingest<D>>) -> ApplyReport {
        let mut report = ApplyReport::default();
        let max_rows = self.capacity();

        if batch.len() >= max_rows {
            let excess = batch.len() - max_rows;
            batch.drain(..excess);
            report.dropped += excess;
            self.metrics.add_batch_overflow_dropped(excess as u64);

            let current = self.store.len();
            report.evicted += self.evict_oldest(current).len();
            if current > 0 || excess > 0 {
                log_event_with_fields(
                    Event::RowsEvicted,
                    &[
                        ("evicted", &current.to_string()),
                        ("overflow_dropped", &excess.to_string()),
                        ("reason", "batch_overflow"),
                    ],
                );
            }
        } else {
            let fresh = self.fresh_rows(&batch);
            let overflow = (self.store.len() + fresh).saturating_sub(max_rows);
            report.evicted += self.evict_oldest(overflow).len();
        }

        let mut reorder = false;
        for ingest in batch {
            match self.upsert(ingest) {
                Applied::Inserted(inserted) => {
                    report.inserted += 1;
                    report.evicted += inserted.evicted.len();
                }
                Applied::Updated(updated) => {
                    report.updated += 1;
                    reorder |= updated.sort_key_changed;
                }
            }
        }
        if reorder {
            self.resort_rows();
        } else if !self.is_ordered() {
            self.violation("incremental placement left rows out of order");
            self.resort_rows();
        }

        self.metrics.increment_apply_cycles();
        log_event_with_fields(
            Event::ApplyCycle,
            &[
                ("inserted", &report.inserted.to_string()),
                ("updated", &report.updated.to_string()),
                ("evicted", &report.evicted.to_string()),
                ("rows", &self.store.len().to_string()),
            ],
        );
        report
    }

    // ==================
    // Sorting
    // ==================

    /// Change the active sort; `None` restores arrival placement
    ///
    /// Returns whether any row moved.
    pub fn set_sort(&mut self, spec: Option<SortSpec>) -> bool {
        self.sort = spec;
        match spec {
            Some(_) => self.resort(),
            None => {
                for row in self.store.iter_mut() {
                    row.sort_key = None;
                }
                false
            }
        }
    }

    /// Sort on `column` with its declared collation
    pub fn sort_by(&mut self, column: ColumnId, ascending: bool) -> bool {
        let spec = SortSpec {
            column,
            ascending,
            collation: self.schema.collation(column),
        };
        self.set_sort(Some(spec))
    }

    /// Full stable resort under the active sort
    ///
    /// No-op returning false when no sort is active.
    pub fn resort(&mut self) -> bool {
        let changed = self.resort_rows();
        if self.sort.is_some() {
            log_event_with_fields(
                Event::Resort,
                &[
                    ("changed", if changed { "true" } else { "false" }),
                    ("rows", &self.store.len().to_string()),
                ],
            );
        }
        changed
    }

    /// Resort without the INFO line, for resorts triggered by updates
    pub(crate) fn resort_rows(&mut self) -> bool {
        let Some(spec) = self.sort else {
            self.metrics.increment_resorts_skipped();
            log_event_with_fields(Event::ResortSkipped, &[("reason", "unsorted")]);
            return false;
        };
        self.metrics.increment_resorts();

        let outcome = plan_resort(self.store.as_slice(), &spec);
        if let Some(failure) = &outcome.failure {
            self.report_comparison_failure(failure, outcome.fallbacks);
        }
        if outcome.changed {
            if let Err(err) = self.store.apply_permutation(&outcome.permutation) {
                self.violation(&err.to_string());
                return false;
            }
        }
        for (row, key) in self.store.iter_mut().zip(outcome.keys) {
            row.sort_key = key;
        }
        if outcome.changed {
            self.listener.on_rows_reordered(&outcome.permutation);
            self.metrics.increment_resorts_changed();
        }
        outcome.changed
    }

    /// Drop every row; the ledger and update keys go with them
    pub fn clear(&mut self) -> usize {
        let count = self.store.clear();
        self.ledger.clear();
        self.keyed.clear();
        self.keys_by_row.clear();
        self.listener.on_cleared();
        log_event_with_fields(Event::TableCleared, &[("rows", &count.to_string())]);
        count
    }

    // ==================
    // Internals
    // ==================

    /// Items in `batch` that will add a row rather than update one
    fn fresh_rows(&self, batch: &[Ingest<D>]) -> usize {
        let mut seen = HashSet::new();
        batch
            .iter()
            .filter(|ingest| match ingest.key.as_deref() {
                None => true,
                Some(key) => !self.keyed.contains_key(key) && seen.insert(key),
            })
            .count()
    }

    fn forget_key(&mut self, id: RowId) {
        if let Some(key) = self.keys_by_row.remove(&id) {
            self.keyed.remove(&key);
        }
    }

    fn note_fallbacks(&self, cmp: &KeyComparator) {
        if let Some(failure) = cmp.take_failure() {
            self.report_comparison_failure(&failure, cmp.fallbacks());
        }
    }

    fn report_comparison_failure(&self, failure: &TableError, fallbacks: usize) {
        self.metrics.add_comparison_failures(fallbacks as u64);
        log_event_with_fields(
            Event::ComparisonFailure,
            &[
                ("code", failure.code()),
                ("detail", &failure.to_string()),
                ("fallbacks", &fallbacks.to_string()),
            ],
        );
    }

    fn violation(&self, detail: &str) {
        self.metrics.increment_invariant_violations();
        log_event_with_fields(Event::InvariantViolation, &[("detail", detail)]);
    }
}
