//! Table metrics
//!
//! - Counters only, monotonic
//! - Shared between producers and the applier; atomics with Relaxed ordering

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one table
#[derive(Debug, Default)]
pub struct TableMetrics {
    rows_inserted: AtomicU64,
    rows_updated: AtomicU64,
    rows_evicted: AtomicU64,
    rows_expired: AtomicU64,
    rows_removed: AtomicU64,
    queue_offers: AtomicU64,
    queue_rejects: AtomicU64,
    queue_discarded: AtomicU64,
    hidden_dropped: AtomicU64,
    batch_overflow_dropped: AtomicU64,
    stalls: AtomicU64,
    pause_releases: AtomicU64,
    apply_cycles: AtomicU64,
    resorts: AtomicU64,
    resorts_changed: AtomicU64,
    resorts_skipped: AtomicU64,
    comparison_failures: AtomicU64,
    invariant_violations: AtomicU64,
}

macro_rules! counter {
    ($inc:ident, $add:ident, $field:ident) => {
        #[doc = concat!("Increment `", stringify!($field), "`")]
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        #[doc = concat!("Add to `", stringify!($field), "`")]
        pub fn $add(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl TableMetrics {
    /// Registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    counter!(increment_rows_inserted, add_rows_inserted, rows_inserted);
    counter!(increment_rows_updated, add_rows_updated, rows_updated);
    counter!(increment_rows_evicted, add_rows_evicted, rows_evicted);
    counter!(increment_rows_expired, add_rows_expired, rows_expired);
    counter!(increment_rows_removed, add_rows_removed, rows_removed);
    counter!(increment_queue_offers, add_queue_offers, queue_offers);
    counter!(increment_queue_rejects, add_queue_rejects, queue_rejects);
    counter!(increment_queue_discarded, add_queue_discarded, queue_discarded);
    counter!(increment_hidden_dropped, add_hidden_dropped, hidden_dropped);
    counter!(
        increment_batch_overflow_dropped,
        add_batch_overflow_dropped,
        batch_overflow_dropped
    );
    counter!(increment_stalls, add_stalls, stalls);
    counter!(increment_pause_releases, add_pause_releases, pause_releases);
    counter!(increment_apply_cycles, add_apply_cycles, apply_cycles);
    counter!(increment_resorts, add_resorts, resorts);
    counter!(increment_resorts_changed, add_resorts_changed, resorts_changed);
    counter!(increment_resorts_skipped, add_resorts_skipped, resorts_skipped);
    counter!(
        increment_comparison_failures,
        add_comparison_failures,
        comparison_failures
    );
    counter!(
        increment_invariant_violations,
        add_invariant_violations,
        invariant_violations
    );

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            rows_updated: self.rows_updated.load(Ordering::Relaxed),
            rows_evicted: self.rows_evicted.load(Ordering::Relaxed),
            rows_expired: self.rows_expired.load(Ordering::Relaxed),
            rows_removed: self.rows_removed.load(Ordering::Relaxed),
            queue_offers: self.queue_offers.load(Ordering::Relaxed),
            queue_rejects: self.queue_rejects.load(Ordering::Relaxed),
            queue_discarded: self.queue_discarded.load(Ordering::Relaxed),
            hidden_dropped: self.hidden_dropped.load(Ordering::Relaxed),
            batch_overflow_dropped: self.batch_overflow_dropped.load(Ordering::Relaxed),
            stalls: self.stalls.load(Ordering::Relaxed),
            pause_releases: self.pause_releases.load(Ordering::Relaxed),
            apply_cycles: self.apply_cycles.load(Ordering::Relaxed),
            resorts: self.resorts.load(Ordering::Relaxed),
            resorts_changed: self.resorts_changed.load(Ordering::Relaxed),
            resorts_skipped: self.resorts_skipped.load(Ordering::Relaxed),
            comparison_failures: self.comparison_failures.load(Ordering::Relaxed),
            invariant_violations: self.invariant_violations.load(Ordering::Relaxed),
        }
    }

    /// Snapshot as a JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_inserted: u64,
    pub rows_updated: u64,
    pub rows_evicted: u64,
    pub rows_expired: u64,
    pub rows_removed: u64,
    pub queue_offers: u64,
    pub queue_rejects: u64,
    pub queue_discarded: u64,
    pub hidden_dropped: u64,
    pub batch_overflow_dropped: u64,
    pub stalls: u64,
    pub pause_releases: u64,
    pub apply_cycles: u64,
    pub resorts: u64,
    pub resorts_changed: u64,
    pub resorts_skipped: u64,
    pub comparison_failures: u64,
    pub invariant_violations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let metrics = TableMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_and_add() {
        let metrics = TableMetrics::new();
        metrics.increment_rows_inserted();
        metrics.increment_rows_inserted();
        metrics.add_rows_evicted(5);
        metrics.increment_stalls();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_inserted, 2);
        assert_eq!(snapshot.rows_evicted, 5);
        assert_eq!(snapshot.stalls, 1);
        assert_eq!(snapshot.queue_discarded, 0);
    }

    #[test]
    fn test_to_json() {
        let metrics = TableMetrics::new();
        metrics.add_queue_discarded(1234);
        metrics.increment_resorts();

        let parsed: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();
        assert_eq!(parsed["queue_discarded"], 1234);
        assert_eq!(parsed["resorts"], 1);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(TableMetrics::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.increment_queue_offers();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().queue_offers, 800);
    }
}
