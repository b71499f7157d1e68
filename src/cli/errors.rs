//! CLI-specific error types
//!
//! All CLI errors are fatal: the command stops and exits non-zero.

use std::fmt;
use std::io;

use crate::errors::TableError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Malformed sample line
    InvalidSample,
    /// Sort column not in the configuration
    UnknownColumn,
    /// Replay could not finish
    ReplayFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "LIVETABLE_CLI_CONFIG_ERROR",
            Self::IoError => "LIVETABLE_CLI_IO_ERROR",
            Self::InvalidSample => "LIVETABLE_CLI_INVALID_SAMPLE",
            Self::UnknownColumn => "LIVETABLE_CLI_UNKNOWN_COLUMN",
            Self::ReplayFailed => "LIVETABLE_CLI_REPLAY_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Bad sample at a 1-based line number
    pub fn invalid_sample(line: usize, msg: impl fmt::Display) -> Self {
        Self::new(
            CliErrorCode::InvalidSample,
            format!("line {}: {}", line, msg),
        )
    }

    /// Unknown sort column
    pub fn unknown_column(column: &str) -> Self {
        Self::new(
            CliErrorCode::UnknownColumn,
            format!("no column named or numbered '{}'", column),
        )
    }

    /// Replay failed
    pub fn replay_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ReplayFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<TableError> for CliError {
    fn from(e: TableError) -> Self {
        match e {
            TableError::InvalidConfig(msg) => Self::config_error(msg),
            TableError::Io(err) => Self::from(err),
            TableError::Json(err) => Self::config_error(format!("JSON error: {}", err)),
            other => Self::replay_failed(format!("{}: {}", other.code(), other)),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::unknown_column("Speed");
        assert_eq!(
            err.to_string(),
            "LIVETABLE_CLI_UNKNOWN_COLUMN: no column named or numbered 'Speed'"
        );
    }

    #[test]
    fn test_from_table_error() {
        let err = CliError::from(TableError::InvalidConfig("max_rows must be > 0".into()));
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
        let err = CliError::from(TableError::StallDetected { discarded: 2 });
        assert_eq!(err.code_str(), "LIVETABLE_CLI_REPLAY_FAILED");
    }
}
