//! Samples fed to alarm-class views.

use serde::{Deserialize, Serialize};

use crate::clock::Millis;

use super::level::AlarmLevel;

/// Where a sample came from; matched by subject filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSubject {
    #[serde(default)]
    pub station: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    /// Live telemetry rather than recorded playback
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

fn default_realtime() -> bool {
    true
}

impl AlarmSubject {
    /// Realtime subject with no station, source or module
    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    pub fn station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn recorded(mut self) -> Self {
        self.realtime = false;
        self
    }
}

/// One observation of an alarm subject
#[derive(Debug, Clone)]
pub struct AlarmSample<D> {
    /// Subject identity (channel id)
    pub key: String,
    pub level: AlarmLevel,
    pub subject: AlarmSubject,
    /// Time the value was sampled at the source
    pub timestamp: Millis,
    pub data: D,
}

impl<D> AlarmSample<D> {
    /// Realtime sample with an empty subject
    pub fn new(key: impl Into<String>, level: AlarmLevel, timestamp: Millis, data: D) -> Self {
        Self {
            key: key.into(),
            level,
            subject: AlarmSubject::realtime(),
            timestamp,
            data,
        }
    }

    pub fn with_subject(mut self, subject: AlarmSubject) -> Self {
        self.subject = subject;
        self
    }
}
