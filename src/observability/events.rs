//! Observable table events
//!
//! Every log line the engine writes names one of these.

use std::fmt;

/// Observable events in a live table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Table created
    TableCreated,
    /// Table emptied by an explicit clear
    TableCleared,
    /// Configuration loaded
    ConfigLoaded,

    // Ingestion
    /// Apply cycle finished
    ApplyCycle,
    /// Queue full, producer forced a drain
    QueueFull,
    /// Producers could not make progress
    QueueStall,
    /// Queued items thrown away
    QueueDiscard,
    /// Items dropped while the view was hidden
    HiddenDrop,
    /// Pause force-released
    PauseReleased,

    // Structure
    /// Oldest rows evicted for capacity
    RowsEvicted,
    /// Full resort ran
    Resort,
    /// Resort skipped (nothing volatile changed)
    ResortSkipped,
    /// Sort key comparison fell back to the safe ordering
    ComparisonFailure,
    /// Structural request on missing state (no-op)
    InvariantViolation,

    // Alarms
    /// Subject entered alarm
    AlarmRaised,
    /// Subject left alarm, awaiting expiration
    AlarmCleared,
    /// Cleared alarm row flushed
    AlarmExpired,
    /// Sample older than the displayed one ignored
    AlarmStaleSample,
    /// Filter re-applied to the displayed rows
    FilterApplied,

    // Replay
    /// Replay started
    ReplayStart,
    /// Replay finished
    ReplayComplete,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::TableCreated => "TABLE_CREATED",
            Event::TableCleared => "TABLE_CLEARED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ApplyCycle => "APPLY_CYCLE",
            Event::QueueFull => "QUEUE_FULL",
            Event::QueueStall => "QUEUE_STALL",
            Event::QueueDiscard => "QUEUE_DISCARD",
            Event::HiddenDrop => "HIDDEN_DROP",
            Event::PauseReleased => "PAUSE_RELEASED",
            Event::RowsEvicted => "ROWS_EVICTED",
            Event::Resort => "RESORT",
            Event::ResortSkipped => "RESORT_SKIPPED",
            Event::ComparisonFailure => "COMPARISON_FAILURE",
            Event::InvariantViolation => "INVARIANT_VIOLATION",
            Event::AlarmRaised => "ALARM_RAISED",
            Event::AlarmCleared => "ALARM_CLEARED",
            Event::AlarmExpired => "ALARM_EXPIRED",
            Event::AlarmStaleSample => "ALARM_STALE_SAMPLE",
            Event::FilterApplied => "FILTER_APPLIED",
            Event::ReplayStart => "REPLAY_START",
            Event::ReplayComplete => "REPLAY_COMPLETE",
        }
    }

    /// Events that warrant a WARN line
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::QueueStall | Event::QueueDiscard | Event::PauseReleased
        )
    }

    /// High-rate events that only go out at TRACE
    pub fn is_per_row(&self) -> bool {
        matches!(
            self,
            Event::QueueFull
                | Event::InvariantViolation
                | Event::ComparisonFailure
                | Event::AlarmRaised
                | Event::AlarmCleared
                | Event::AlarmStaleSample
                | Event::ResortSkipped
                | Event::ApplyCycle
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
