//! Alarm severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TableError;

/// Severity of a sample, ordered from harmless to worst
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlarmLevel {
    /// Not in alarm
    #[default]
    None,
    /// Warning limits exceeded
    Yellow,
    /// Error limits exceeded
    Red,
}

impl AlarmLevel {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmLevel::None => "none",
            AlarmLevel::Yellow => "yellow",
            AlarmLevel::Red => "red",
        }
    }

    /// Whether this level counts as being in alarm
    pub fn is_alarm(&self) -> bool {
        *self != AlarmLevel::None
    }

    /// Worse of two levels, e.g. the raw and converted value of one channel
    pub fn worst(self, other: AlarmLevel) -> AlarmLevel {
        self.max(other)
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmLevel {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(AlarmLevel::None),
            "yellow" | "warning" => Ok(AlarmLevel::Yellow),
            "red" | "error" => Ok(AlarmLevel::Red),
            other => Err(TableError::InvalidConfig(format!(
                "unknown alarm level '{}'",
                other
            ))),
        }
    }
}
