//! Alarm lifecycle state machine
//!
//! A key is absent, in alarm, or awaiting expiration after it cleared.
//! Clearing stamps `cleared_at`; a sweep removes keys whose clear is older
//! than the flush interval, or every awaiting key when forced.

use std::collections::HashMap;

use serde::Serialize;

use crate::clock::Millis;

/// Lifecycle state of a tracked key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmState {
    InAlarm,
    AwaitingExpiration,
}

/// Tracked state of one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmRecord {
    pub key: String,
    pub state: AlarmState,
    pub cleared_at: Option<Millis>,
}

/// Effect of one sample on a key's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Absent and not in alarm: nothing to track
    Ignored,
    /// Absent to in alarm
    Raised,
    /// In alarm and still in alarm
    Updated,
    /// In alarm to awaiting expiration
    Cleared,
    /// Awaiting expiration back to in alarm
    Reraised,
    /// Awaiting expiration and still clear
    StillAwaiting,
}

/// Per-key alarm lifecycle
#[derive(Debug, Default)]
pub struct AlarmTracker {
    records: HashMap<String, AlarmRecord>,
}

impl AlarmTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Current state of `key`; `None` when absent
    pub fn state(&self, key: &str) -> Option<AlarmState> {
        self.records.get(key).map(|r| r.state)
    }

    pub fn record(&self, key: &str) -> Option<&AlarmRecord> {
        self.records.get(key)
    }

    /// Keys currently awaiting expiration
    pub fn awaiting(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.state == AlarmState::AwaitingExpiration)
            .count()
    }

    /// Apply a sample for `key` observed at `now`
    pub fn observe(&mut self, key: &str, in_alarm: bool, now: Millis) -> Transition {
        let Some(record) = self.records.get_mut(key) else {
            if !in_alarm {
                return Transition::Ignored;
            }
            self.records.insert(
                key.to_string(),
                AlarmRecord {
                    key: key.to_string(),
                    state: AlarmState::InAlarm,
                    cleared_at: None,
                },
            );
            return Transition::Raised;
        };

        match (record.state, in_alarm) {
            (AlarmState::InAlarm, true) => Transition::Updated,
            (AlarmState::InAlarm, false) => {
                record.state = AlarmState::AwaitingExpiration;
                record.cleared_at = Some(now);
                Transition::Cleared
            }
            (AlarmState::AwaitingExpiration, true) => {
                record.state = AlarmState::InAlarm;
                record.cleared_at = None;
                Transition::Reraised
            }
            (AlarmState::AwaitingExpiration, false) => Transition::StillAwaiting,
        }
    }

    /// Remove and return keys due for expiration, sorted
    ///
    /// A key is due when `now - cleared_at > flush_interval`. A zero
    /// interval disables timed expiry; `force` expires every awaiting key.
    pub fn expire(&mut self, now: Millis, flush_interval: Millis, force: bool) -> Vec<String> {
        if !force && flush_interval == 0 {
            return Vec::new();
        }
        let mut due: Vec<String> = self
            .records
            .values()
            .filter(|r| r.state == AlarmState::AwaitingExpiration)
            .filter(|r| {
                force
                    || r.cleared_at
                        .is_some_and(|cleared| now.saturating_sub(cleared) > flush_interval)
            })
            .map(|r| r.key.clone())
            .collect();
        due.sort();
        for key in &due {
            self.records.remove(key);
        }
        due
    }

    /// Stop tracking `key`
    pub fn remove(&mut self, key: &str) -> Option<AlarmRecord> {
        self.records.remove(key)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
