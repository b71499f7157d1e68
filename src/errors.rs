//! # Table Errors
//!
//! Error taxonomy for the live table engine.
//!
//! Structural operations (insert, evict, resort, expire) never return these
//! to their callers. They are produced at the edges: a rejected offer logs
//! `QueueFull` with its code, the ingestion policy sends `StallDetected` and
//! `PauseReleased` to the listener as notices, comparators report
//! `ComparisonFailure` before falling back, and the store reports
//! `InvariantViolation` which the engine logs and swallows. Only the
//! configuration loader and the CLI surface fatal errors.

use thiserror::Error;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Live table errors
#[derive(Debug, Error)]
pub enum TableError {
    // ==================
    // Ingestion
    // ==================
    /// The ingestion queue stayed full for the whole offer timeout
    #[error("Ingestion queue full after {timeout_ms} ms")]
    QueueFull { timeout_ms: u64 },

    /// The ingestion queue could not admit new items for too long
    #[error("Ingestion stalled; {discarded} queued items discarded")]
    StallDetected { discarded: usize },

    /// A pause was held while producers were blocked and got force-released
    #[error("Pause released after {held_ms} ms")]
    PauseReleased { held_ms: u64 },

    // ==================
    // Ordering
    // ==================
    /// A sort key could not be compared under the requested collation
    #[error("Cannot compare {left:?} and {right:?} under {collation} collation")]
    ComparisonFailure {
        collation: &'static str,
        left: String,
        right: String,
    },

    // ==================
    // Structure
    // ==================
    /// A structural request referenced state that does not exist
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // ==================
    // Setup
    // ==================
    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure while loading configuration or samples
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TableError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TableError::QueueFull { .. } => "LIVETABLE_QUEUE_FULL",
            TableError::StallDetected { .. } => "LIVETABLE_STALL_DETECTED",
            TableError::PauseReleased { .. } => "LIVETABLE_PAUSE_RELEASED",
            TableError::ComparisonFailure { .. } => "LIVETABLE_COMPARISON_FAILURE",
            TableError::InvariantViolation(_) => "LIVETABLE_INVARIANT_VIOLATION",
            TableError::InvalidConfig(_) => "LIVETABLE_INVALID_CONFIG",
            TableError::Io(_) => "LIVETABLE_IO_ERROR",
            TableError::Json(_) => "LIVETABLE_JSON_ERROR",
        }
    }

    /// Recoverable errors never stop ingestion or abort a batch
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            TableError::InvalidConfig(_) | TableError::Io(_) | TableError::Json(_)
        )
    }

    /// Whether the error is meant to reach the end user as a notification
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            TableError::StallDetected { .. } | TableError::PauseReleased { .. }
        )
    }
}
