//! Observability for live tables
//!
//! - Structured logging (JSON lines)
//! - Counter metrics
//! - Typed events
//! - One-shot notices for stall/discard reporting
//!
//! Observability never changes table behavior and never fails an operation.
//!
//! ```ignore
//! use livetable::observability::{log_event_with_fields, Event, TableMetrics};
//!
//! log_event_with_fields(Event::RowsEvicted, &[("count", "12")]);
//!
//! let metrics = TableMetrics::new();
//! metrics.increment_rows_inserted();
//! ```

mod events;
mod logger;
mod metrics;
mod notice;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, TableMetrics};
pub use notice::OnceNotice;
pub use scope::ObservationScope;

/// Severity an event is logged at
pub fn event_severity(event: Event) -> Severity {
    if event.is_warning() {
        Severity::Warn
    } else if event.is_per_row() {
        Severity::Trace
    } else {
        Severity::Info
    }
}

/// Log a table event
pub fn log_event(event: Event) {
    Logger::log(event_severity(event), event.as_str(), &[]);
}

/// Log a table event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_severity() {
        assert_eq!(event_severity(Event::QueueStall), Severity::Warn);
        assert_eq!(event_severity(Event::AlarmRaised), Severity::Trace);
        assert_eq!(event_severity(Event::Resort), Severity::Info);
    }

    #[test]
    fn test_log_event() {
        log_event(Event::TableCreated);
        log_event_with_fields(Event::RowsEvicted, &[("count", "3")]);
    }
}
