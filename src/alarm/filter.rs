//! Alarm display filters
//!
//! A filter has two dimensions that are applied differently: the level
//! dimension is relaxed for rows awaiting expiration so the user can watch
//! them clear, while the subject dimension is always strict.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::level::AlarmLevel;
use super::sample::AlarmSubject;

/// Acceptance predicate for alarm rows
pub trait AlarmFilter: Send + Sync {
    /// Whether rows at `level` may be shown
    fn accept_level(&self, level: AlarmLevel) -> bool;

    /// Whether rows for `subject` may be shown
    fn accept_subject(&self, subject: &AlarmSubject) -> bool;
}

/// Accepts everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl AlarmFilter for AcceptAll {
    fn accept_level(&self, _level: AlarmLevel) -> bool {
        true
    }

    fn accept_subject(&self, _subject: &AlarmSubject) -> bool {
        true
    }
}

/// Live versus recorded data selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RealtimeFilter {
    Realtime,
    Recorded,
    #[default]
    Both,
}

impl RealtimeFilter {
    pub fn accepts(&self, realtime: bool) -> bool {
        match self {
            RealtimeFilter::Realtime => realtime,
            RealtimeFilter::Recorded => !realtime,
            RealtimeFilter::Both => true,
        }
    }
}

/// Filter built from user selections; `None` in a dimension accepts all
///
/// Names compare case-insensitively. A subject without a value for a
/// restricted dimension is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionFilter {
    #[serde(default)]
    pub levels: Option<BTreeSet<AlarmLevel>>,
    #[serde(default)]
    pub stations: Option<Vec<String>>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub modules: Option<Vec<String>>,
    #[serde(default)]
    pub realtime: RealtimeFilter,
}

impl SelectionFilter {
    /// Filter that accepts everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn levels(mut self, levels: impl IntoIterator<Item = AlarmLevel>) -> Self {
        self.levels = Some(levels.into_iter().collect());
        self
    }

    pub fn stations<S: Into<String>>(mut self, stations: impl IntoIterator<Item = S>) -> Self {
        self.stations = Some(stations.into_iter().map(Into::into).collect());
        self
    }

    pub fn sources<S: Into<String>>(mut self, sources: impl IntoIterator<Item = S>) -> Self {
        self.sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    pub fn modules<S: Into<String>>(mut self, modules: impl IntoIterator<Item = S>) -> Self {
        self.modules = Some(modules.into_iter().map(Into::into).collect());
        self
    }

    pub fn realtime(mut self, realtime: RealtimeFilter) -> Self {
        self.realtime = realtime;
        self
    }
}

fn matches(selection: &Option<Vec<String>>, value: Option<&str>) -> bool {
    match (selection, value) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(names), Some(value)) => names.iter().any(|n| n.eq_ignore_ascii_case(value)),
    }
}

impl AlarmFilter for SelectionFilter {
    fn accept_level(&self, level: AlarmLevel) -> bool {
        self.levels.as_ref().map_or(true, |levels| levels.contains(&level))
    }

    fn accept_subject(&self, subject: &AlarmSubject) -> bool {
        self.realtime.accepts(subject.realtime)
            && matches(&self.stations, subject.station.as_deref())
            && matches(&self.sources, subject.source.as_deref())
            && matches(&self.modules, subject.module.as_deref())
    }
}
