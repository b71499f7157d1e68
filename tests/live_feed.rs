//! Live Feed Tests
//!
//! Concurrent producers feeding one applier through `LiveTable`:
//! - Readers never see more rows than capacity or an unsorted table
//! - Every submitted item is either applied or counted as dropped
//! - Stall notices reach the listener once per stall episode

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use livetable::alarm::{AlarmLevel, AlarmSample, AlarmTable};
use livetable::clock::{ManualClock, SystemClock};
use livetable::listener::RecordingListener;
use livetable::schema::{CellRow, ColumnId, ColumnSpec, TableSchema};
use livetable::sort::is_sorted;
use livetable::table::{Ingest, LiveTable, OfferOutcome, TableEngine};
use livetable::TableConfig;

// =============================================================================
// Helper Functions
// =============================================================================

fn schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnSpec::text("Producer"),
        ColumnSpec::numeric("Seq").volatile(),
    ])
}

fn item(producer: usize, seq: usize) -> Ingest<CellRow> {
    Ingest::new(CellRow::from_cells([
        format!("p{}", producer),
        ((seq * 7919) % 1000).to_string(),
    ]))
}

// =============================================================================
// Concurrency Tests
// =============================================================================

/// Four producers and a ticking applier; readers check invariants throughout.
#[test]
fn test_multi_producer_feed_keeps_invariants() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 500;

    let config = TableConfig::with_max_rows(50).offer_timeout_ms(5);
    let mut engine = TableEngine::new(schema(), config.clone(), Arc::new(SystemClock));
    engine.sort_by(ColumnId(1), true);
    let live = Arc::new(LiveTable::new(engine, config, Arc::new(SystemClock)));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let live = Arc::clone(&live);
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    live.submit(item(p, seq));
                }
            })
        })
        .collect();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let live = Arc::clone(&live);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                live.read(|table| {
                    assert!(table.len() <= table.capacity());
                    let spec = table.sort().unwrap();
                    assert!(is_sorted(table.rows(), &spec));
                });
            }
        })
    };

    while producers.iter().any(|p| !p.is_finished()) {
        live.tick();
    }
    for producer in producers {
        producer.join().unwrap();
    }
    live.tick();
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    assert_eq!(live.queued(), 0);
    assert_eq!(live.row_count(), 50);

    let metrics = live.metrics().snapshot();
    let accounted = metrics.rows_inserted
        + metrics.queue_discarded
        + metrics.batch_overflow_dropped
        + metrics.hidden_dropped;
    assert_eq!(accounted, (PRODUCERS * PER_PRODUCER) as u64);
    assert_eq!(metrics.rows_inserted - metrics.rows_evicted, 50);
}

/// An alarm view fed from several threads ends with one row per raised key.
#[test]
fn test_alarm_table_behind_live_table() {
    let clock = Arc::new(ManualClock::new(0));
    let config = TableConfig::with_max_rows(100).flush_interval_ms(10);
    let alarms = AlarmTable::new(schema(), config.clone(), clock.clone());
    let live = Arc::new(LiveTable::new(alarms, config, clock.clone()));

    let producers: Vec<_> = (0..3)
        .map(|p| {
            let live = Arc::clone(&live);
            thread::spawn(move || {
                for k in 0..20 {
                    let key = format!("p{}-{}", p, k);
                    let level = if k % 2 == 0 { AlarmLevel::Red } else { AlarmLevel::None };
                    let data = CellRow::from_cells([key.clone(), k.to_string()]);
                    live.submit(AlarmSample::new(key, level, 0, data));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    live.tick();
    // Clear-only keys never reach the table
    assert_eq!(live.row_count(), 30);

    live.read(|table| {
        assert!(table.rows().iter().all(|r| r.alarm.is_some()));
        assert_eq!(table.tracker().len(), 30);
    });
}

/// A stalled hidden view discards and notifies once until a clean offer.
#[test]
fn test_stall_notice_fires_once_per_episode() {
    let config = TableConfig::with_max_rows(1)
        .queue_scale_factor(1)
        .offer_timeout_ms(0)
        .stall_policy(4, 2);
    let recorder = RecordingListener::new();
    let clock = Arc::new(ManualClock::new(0));
    let engine = TableEngine::new(schema(), config.clone(), clock.clone())
        .with_listener(Box::new(recorder.clone()));
    let live = LiveTable::new(engine, config, clock);

    live.set_visible(false);
    assert_eq!(live.submit(item(0, 0)), OfferOutcome::Accepted);
    assert_eq!(live.submit(item(0, 1)), OfferOutcome::Discarded { discarded: 1 });
    assert_eq!(live.submit(item(0, 2)), OfferOutcome::Discarded { discarded: 1 });
    assert_eq!(recorder.notices(), vec!["LIVETABLE_STALL_DETECTED"]);

    // Showing the view drains the queue; the next clean offer re-arms
    live.set_visible(true);
    live.tick();
    assert_eq!(live.submit(item(0, 3)), OfferOutcome::Accepted);
    live.set_visible(false);
    live.submit(item(0, 4));
    assert_eq!(
        recorder.notices(),
        vec!["LIVETABLE_STALL_DETECTED", "LIVETABLE_STALL_DETECTED"]
    );

    let metrics = live.metrics().snapshot();
    assert_eq!(metrics.queue_discarded, 3);
    assert_eq!(metrics.stalls, 3);
}

/// Clearing while producers are queued drops the old backlog.
#[test]
fn test_clear_discards_backlog() {
    let config = TableConfig::with_max_rows(10);
    let clock = Arc::new(ManualClock::new(0));
    let engine = TableEngine::new(schema(), config.clone(), clock.clone());
    let live = LiveTable::new(engine, config, clock);

    for seq in 0..5 {
        live.submit(item(0, seq));
    }
    live.tick();
    for seq in 5..8 {
        live.submit(item(0, seq));
    }
    assert_eq!(live.clear(), 5);
    let report = live.tick();
    assert_eq!(report.inserted, 0);
    assert_eq!(live.row_count(), 0);
}
