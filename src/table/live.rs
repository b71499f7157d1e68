//! Cross-thread live table
//!
//! Producers offer items into the bounded queue; one applier calls `tick`
//! to drain and apply them. Only the queue and a few atomic flags are
//! shared. The table itself sits behind a `RwLock` that the applier holds
//! for one apply cycle and readers hold briefly.
//!
//! When the queue stays full, a producer applies pending items itself
//! before retrying. After `stall_retry_limit` consecutive failures the
//! stall is reported once and a held pause is released; after the discard
//! grace the queue is emptied and ingestion resumes from nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::time::Duration;

use serde::Serialize;

use crate::clock::{Clock, Millis};
use crate::config::TableConfig;
use crate::errors::TableError;
use crate::observability::{log_event_with_fields, Event, OnceNotice, TableMetrics};
use crate::schema::RowData;

use super::engine::{ApplyReport, Ingest, TableEngine};
use super::queue::IngestQueue;

/// A table that can be fed by a `LiveTable`
pub trait Applier: Send + Sync {
    /// Queued item type
    type Item: Send;

    /// Apply one drained batch in FIFO order
    fn apply(&mut self, batch: Vec<Self::Item>) -> ApplyReport;

    /// Periodic work after each applied tick; returns rows removed
    fn on_tick(&mut self) -> usize {
        0
    }

    /// Drop every row and any per-row state
    fn clear(&mut self) -> usize;

    /// Rows on display
    fn row_count(&self) -> usize;

    /// Forward a user notification
    fn notify(&self, notice: &TableError);

    /// Counters shared with the feeding side
    fn metrics(&self) -> Arc<TableMetrics>;
}

impl<D: RowData + Send + Sync> Applier for TableEngine<D> {
    type Item = Ingest<D>;

    fn apply(&mut self, batch: Vec<Ingest<D>>) -> ApplyReport {
        self.apply_batch(batch)
    }

    fn clear(&mut self) -> usize {
        TableEngine::clear(self)
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn notify(&self, notice: &TableError) {
        TableEngine::notify(self, notice)
    }

    fn metrics(&self) -> Arc<TableMetrics> {
        Arc::clone(TableEngine::metrics(self))
    }
}

/// How a blocking offer got in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OfferOutcome {
    /// Admitted on the first attempt
    Accepted,
    /// Admitted after the queue had been full
    Retried { retries: u32 },
    /// Admitted after the stalled queue was discarded
    Discarded { discarded: usize },
}

struct Stamped<T> {
    epoch: u64,
    item: T,
}

/// Thread-safe front of a table
pub struct LiveTable<A: Applier> {
    applier: RwLock<A>,
    queue: IngestQueue<Stamped<A::Item>>,
    config: TableConfig,
    clock: Arc<dyn Clock>,
    metrics: Arc<TableMetrics>,
    paused: AtomicBool,
    paused_at: AtomicU64,
    visible: AtomicBool,
    epoch: AtomicU64,
    stall_notice: OnceNotice,
    discard_notice: OnceNotice,
}

impl<A: Applier> LiveTable<A> {
    /// Wrap `applier`; the queue holds `max_rows * queue_scale_factor` items
    pub fn new(applier: A, config: TableConfig, clock: Arc<dyn Clock>) -> Self {
        let config = config.normalized();
        let metrics = applier.metrics();
        let queue = IngestQueue::new(config.queue_capacity());
        log_event_with_fields(
            Event::TableCreated,
            &[
                ("max_rows", &config.max_rows.to_string()),
                ("queue_capacity", &queue.capacity().to_string()),
            ],
        );

        Self {
            applier: RwLock::new(applier),
            queue,
            config,
            clock,
            metrics,
            paused: AtomicBool::new(false),
            paused_at: AtomicU64::new(0),
            visible: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
            stall_notice: OnceNotice::new(),
            discard_notice: OnceNotice::new(),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<TableMetrics> {
        &self.metrics
    }

    /// Items waiting to be applied
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Rows on display; takes a short read lock
    pub fn row_count(&self) -> usize {
        self.read_lock().row_count()
    }

    /// Run `f` with shared access to the table
    pub fn read<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        f(&self.read_lock())
    }

    /// Run `f` with exclusive access to the table
    pub fn write<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.write_lock())
    }

    // ==================
    // Producer side
    // ==================

    /// Single attempt: wait up to `timeout` for room, hand the item back on failure
    pub fn offer(&self, item: A::Item, timeout: Duration) -> Result<(), A::Item> {
        self.metrics.increment_queue_offers();
        let stamped = Stamped {
            epoch: self.epoch.load(Ordering::Acquire),
            item,
        };
        self.queue.offer(stamped, timeout).map_err(|rejected| {
            self.metrics.increment_queue_rejects();
            let full = TableError::QueueFull {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            };
            log_event_with_fields(
                Event::QueueFull,
                &[("code", full.code()), ("detail", &full.to_string())],
            );
            rejected.item
        })
    }

    /// Offer until admitted, applying the backpressure policy
    ///
    /// Never blocks indefinitely: a stalled queue is discarded and the item
    /// is admitted into the emptied queue.
    pub fn submit(&self, item: A::Item) -> OfferOutcome {
        let timeout = self.config.offer_timeout();
        let mut item = item;
        let mut retries: u32 = 0;
        let mut discarded = None;

        loop {
            match self.offer(item, timeout) {
                Ok(()) => {
                    if let Some(discarded) = discarded {
                        return OfferOutcome::Discarded { discarded };
                    }
                    if retries == 0 {
                        self.stall_notice.rearm();
                        self.discard_notice.rearm();
                        return OfferOutcome::Accepted;
                    }
                    return OfferOutcome::Retried { retries };
                }
                Err(rejected) => {
                    item = rejected;
                    retries = retries.saturating_add(1);
                    self.apply_pending();

                    if retries == self.config.stall_retry_limit {
                        self.report_stall(retries);
                    }
                    if retries >= self.config.discard_threshold() {
                        discarded = Some(discarded.unwrap_or(0) + self.discard());
                        retries = 0;
                    }
                }
            }
        }
    }

    // ==================
    // Applier side
    // ==================

    /// Drain and apply everything queued
    ///
    /// Does nothing while paused. While hidden, only trims the queue to
    /// `max_rows` newest items.
    pub fn tick(&self) -> ApplyReport {
        self.check_pause_watchdog();
        if self.is_paused() {
            return ApplyReport::default();
        }
        if !self.is_visible() {
            return ApplyReport {
                dropped: self.trim_hidden(),
                ..ApplyReport::default()
            };
        }
        let mut applier = self.write_lock();
        self.apply_locked(&mut applier)
    }

    /// Stop applying; offers keep queueing
    pub fn pause(&self) {
        self.paused_at.store(self.clock.now_ms(), Ordering::Release);
        self.paused.store(true, Ordering::Release);
    }

    /// Apply the backlog on the next tick
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Whether the owning view is on screen
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Empty the table and the queue together
    ///
    /// Items offered before the clear that are still in flight are dropped
    /// at apply time.
    pub fn clear(&self) -> usize {
        let mut applier = self.write_lock();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.queue.clear();
        applier.clear()
    }

    // ==================
    // Internals
    // ==================

    fn apply_locked(&self, applier: &mut A) -> ApplyReport {
        let epoch = self.epoch.load(Ordering::Acquire);
        let (current, stale): (Vec<_>, Vec<_>) = self
            .queue
            .drain_all()
            .into_iter()
            .partition(|stamped| stamped.epoch == epoch);

        let mut report = applier.apply(current.into_iter().map(|s| s.item).collect());
        report.dropped += stale.len();
        report.expired += applier.on_tick();
        report
    }

    /// Producer-side best-effort apply to make room
    fn apply_pending(&self) {
        if self.is_paused() {
            return;
        }
        if !self.is_visible() {
            self.trim_hidden();
            return;
        }
        let mut applier = match self.applier.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        self.apply_locked(&mut applier);
    }

    fn trim_hidden(&self) -> usize {
        let dropped = self.queue.retain_newest(self.config.max_rows);
        if dropped > 0 {
            self.metrics.add_hidden_dropped(dropped as u64);
            log_event_with_fields(Event::HiddenDrop, &[("dropped", &dropped.to_string())]);
        }
        dropped
    }

    fn report_stall(&self, retries: u32) {
        self.metrics.increment_stalls();
        if self.stall_notice.fire() {
            log_event_with_fields(
                Event::QueueStall,
                &[
                    ("queued", &self.queue.len().to_string()),
                    ("retries", &retries.to_string()),
                ],
            );
        }
        if self.is_paused() {
            self.release_pause();
        }
    }

    fn discard(&self) -> usize {
        let discarded = self.queue.clear();
        self.metrics.add_queue_discarded(discarded as u64);
        if self.discard_notice.fire() {
            log_event_with_fields(Event::QueueDiscard, &[("discarded", &discarded.to_string())]);
            self.read_lock()
                .notify(&TableError::StallDetected { discarded });
        }
        discarded
    }

    fn check_pause_watchdog(&self) {
        if self.config.max_pause_ms == 0 || !self.is_paused() {
            return;
        }
        if self.held_ms() >= self.config.max_pause_ms {
            self.release_pause();
        }
    }

    fn held_ms(&self) -> Millis {
        self.clock
            .now_ms()
            .saturating_sub(self.paused_at.load(Ordering::Acquire))
    }

    fn release_pause(&self) {
        if !self.paused.swap(false, Ordering::AcqRel) {
            return;
        }
        let held_ms = self.held_ms();
        self.metrics.increment_pause_releases();
        log_event_with_fields(Event::PauseReleased, &[("held_ms", &held_ms.to_string())]);
        self.read_lock()
            .notify(&TableError::PauseReleased { held_ms });
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, A> {
        self.applier.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, A> {
        self.applier.write().unwrap_or_else(PoisonError::into_inner)
    }
}
