//! Alarm-class view
//!
//! Combines a `TableEngine` with the lifecycle tracker: one row per alarm
//! key, kept while the key is in alarm or awaiting expiration.

use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::TableConfig;
use crate::errors::TableError;
use crate::listener::TableListener;
use crate::observability::{log_event_with_fields, Event, TableMetrics};
use crate::schema::{RowData, TableSchema};
use crate::store::{Row, RowAlarm, RowId};
use crate::table::{Applier, ApplyReport, TableEngine};

use super::filter::{AcceptAll, AlarmFilter};
use super::level::AlarmLevel;
use super::sample::{AlarmSample, AlarmSubject};
use super::tracker::{AlarmState, AlarmTracker, Transition};

/// What a received sample did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// Subject not accepted by the filter
    Rejected,
    /// Older than the sample already on display
    Stale,
    /// Not in alarm and not tracked
    Ignored,
    /// New alarm at a level the filter hides
    Filtered,
    /// New row
    Raised { id: RowId, evicted: usize },
    /// Row updated, still in alarm
    Updated { id: RowId },
    /// Row cleared and now awaiting expiration
    Cleared { id: RowId },
    /// Row back in alarm before it expired
    Reraised { id: RowId },
    /// Row removed because its new level is filtered out
    Removed,
}

/// Alarm list: rows appear on alarm and leave after their clear expires
pub struct AlarmTable<D> {
    engine: TableEngine<D>,
    tracker: AlarmTracker,
    subjects: HashMap<String, AlarmSubject>,
    filter: Box<dyn AlarmFilter>,
}

impl<D: RowData> AlarmTable<D> {
    /// Empty alarm view accepting every subject and level
    pub fn new(schema: TableSchema, config: TableConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: TableEngine::new(schema, config, clock),
            tracker: AlarmTracker::new(),
            subjects: HashMap::new(),
            filter: Box::new(AcceptAll),
        }
    }

    pub fn with_listener(mut self, listener: Box<dyn TableListener<D>>) -> Self {
        self.engine = self.engine.with_listener(listener);
        self
    }

    pub fn with_filter(mut self, filter: Box<dyn AlarmFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Underlying table
    pub fn engine(&self) -> &TableEngine<D> {
        &self.engine
    }

    /// Underlying table, for sorting
    pub fn engine_mut(&mut self) -> &mut TableEngine<D> {
        &mut self.engine
    }

    pub fn tracker(&self) -> &AlarmTracker {
        &self.tracker
    }

    pub fn len(&self) -> usize {
        self.engine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    pub fn rows(&self) -> &[Row<D>] {
        self.engine.rows()
    }

    /// Row on display for alarm key `key`
    pub fn row(&self, key: &str) -> Option<&Row<D>> {
        self.engine.row_for_key(key)
    }

    /// Feed one sample through the filter and the lifecycle
    pub fn receive(&mut self, sample: AlarmSample<D>) -> Received {
        if !self.filter.accept_subject(&sample.subject) {
            return Received::Rejected;
        }

        let shown = self
            .engine
            .row_for_key(&sample.key)
            .map(|row| row.alarm.as_ref().map(|a| a.sample_time));
        if let Some(Some(shown_time)) = shown {
            if sample.timestamp < shown_time {
                log_event_with_fields(
                    Event::AlarmStaleSample,
                    &[
                        ("key", &sample.key),
                        ("sample_time", &sample.timestamp.to_string()),
                        ("shown_time", &shown_time.to_string()),
                    ],
                );
                return Received::Stale;
            }
        }

        let in_alarm = sample.level.is_alarm();
        if self.tracker.state(&sample.key).is_none()
            && in_alarm
            && !self.filter.accept_level(sample.level)
        {
            return Received::Filtered;
        }

        let now = self.engine.clock().now_ms();
        match self.tracker.observe(&sample.key, in_alarm, now) {
            Transition::Ignored => Received::Ignored,
            Transition::Raised => {
                log_event_with_fields(
                    Event::AlarmRaised,
                    &[("key", &sample.key), ("level", sample.level.as_str())],
                );
                let (id, evicted) = self.show(sample, AlarmState::InAlarm);
                Received::Raised { id, evicted }
            }
            transition @ (Transition::Updated | Transition::Reraised) => {
                if !self.filter.accept_level(sample.level) {
                    self.drop_key(&sample.key);
                    return Received::Removed;
                }
                let (id, _) = self.show(sample, AlarmState::InAlarm);
                if transition == Transition::Reraised {
                    Received::Reraised { id }
                } else {
                    Received::Updated { id }
                }
            }
            Transition::Cleared => {
                log_event_with_fields(Event::AlarmCleared, &[("key", &sample.key)]);
                let (id, _) = self.show(sample, AlarmState::AwaitingExpiration);
                Received::Cleared { id }
            }
            Transition::StillAwaiting => {
                let (id, _) = self.show(sample, AlarmState::AwaitingExpiration);
                Received::Updated { id }
            }
        }
    }

    /// Remove rows whose clear has expired; `force` removes every cleared row
    ///
    /// With a zero flush interval only a forced flush removes anything.
    pub fn flush_expired(&mut self, force: bool) -> usize {
        let now = self.engine.clock().now_ms();
        let interval = self.engine.config().flush_interval_ms;
        let expired = self.tracker.expire(now, interval, force);
        for key in &expired {
            self.subjects.remove(key);
            self.engine.remove_key(key);
        }
        if !expired.is_empty() {
            self.engine.metrics().add_rows_expired(expired.len() as u64);
            log_event_with_fields(
                Event::AlarmExpired,
                &[
                    ("count", &expired.len().to_string()),
                    ("forced", if force { "true" } else { "false" }),
                ],
            );
        }
        expired.len()
    }

    /// Replace the filter and drop rows it no longer accepts
    ///
    /// The subject dimension is strict for every row. The level dimension
    /// only removes rows still in alarm; rows awaiting expiration stay until
    /// they expire.
    pub fn apply_filter(&mut self, filter: Box<dyn AlarmFilter>) -> usize {
        self.filter = filter;
        let default_subject = AlarmSubject::realtime();
        let doomed: Vec<String> = self
            .engine
            .rows()
            .iter()
            .filter_map(|row| {
                let alarm = row.alarm.as_ref()?;
                let subject = self.subjects.get(&alarm.key).unwrap_or(&default_subject);
                let keep = self.filter.accept_subject(subject)
                    && (alarm.state == AlarmState::AwaitingExpiration
                        || self.filter.accept_level(alarm.level));
                (!keep).then(|| alarm.key.clone())
            })
            .collect();

        for key in &doomed {
            self.drop_key(key);
        }
        log_event_with_fields(
            Event::FilterApplied,
            &[
                ("removed", &doomed.len().to_string()),
                ("rows", &self.engine.len().to_string()),
            ],
        );
        doomed.len()
    }

    /// Drop every row and every tracked key
    pub fn clear(&mut self) -> usize {
        self.tracker.clear();
        self.subjects.clear();
        self.engine.clear()
    }

    /// Put the sample on display, updating the key's row or adding one
    fn show(&mut self, sample: AlarmSample<D>, state: AlarmState) -> (RowId, usize) {
        let AlarmSample {
            key,
            level,
            subject,
            timestamp,
            data,
        } = sample;
        let alarm = RowAlarm {
            key: key.clone(),
            level: if state == AlarmState::InAlarm {
                level
            } else {
                AlarmLevel::None
            },
            state,
            sample_time: timestamp,
        };
        self.subjects.insert(key.clone(), subject);

        let data = match self.engine.row_for_key(&key).map(|row| row.id) {
            Some(id) => match self.engine.update_with(id, data, Some(alarm.clone())) {
                Ok(updated) => {
                    if self.engine.needs_resort(&updated.changed) {
                        self.engine.resort_rows();
                    } else if self.engine.sort().is_some() {
                        self.engine.metrics().increment_resorts_skipped();
                        log_event_with_fields(
                            Event::ResortSkipped,
                            &[("reason", "no_volatile_change")],
                        );
                    }
                    return (id, 0);
                }
                Err(data) => data,
            },
            None => data,
        };

        let inserted = self.engine.insert_with(data, None, Some(key), Some(alarm));
        for row in &inserted.evicted {
            if let Some(alarm) = &row.alarm {
                self.tracker.remove(&alarm.key);
                self.subjects.remove(&alarm.key);
            }
        }
        (inserted.id, inserted.evicted.len())
    }

    fn drop_key(&mut self, key: &str) {
        self.tracker.remove(key);
        self.subjects.remove(key);
        self.engine.remove_key(key);
    }
}

impl<D: RowData + Send + Sync> Applier for AlarmTable<D> {
    type Item = AlarmSample<D>;

    fn apply(&mut self, batch: Vec<AlarmSample<D>>) -> ApplyReport {
        let mut report = ApplyReport::default();
        for sample in batch {
            match self.receive(sample) {
                Received::Raised { evicted, .. } => {
                    report.inserted += 1;
                    report.evicted += evicted;
                }
                Received::Updated { .. } | Received::Cleared { .. } | Received::Reraised { .. } => {
                    report.updated += 1
                }
                Received::Removed
                | Received::Rejected
                | Received::Stale
                | Received::Ignored
                | Received::Filtered => report.ignored += 1,
            }
        }
        self.engine.metrics().increment_apply_cycles();
        report
    }

    fn on_tick(&mut self) -> usize {
        self.flush_expired(false)
    }

    fn clear(&mut self) -> usize {
        AlarmTable::clear(self)
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn notify(&self, notice: &TableError) {
        self.engine.notify(notice)
    }

    fn metrics(&self) -> Arc<TableMetrics> {
        Arc::clone(self.engine.metrics())
    }
}
