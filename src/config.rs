//! Table Configuration
//!
//! Sizing, backpressure and expiration knobs for one table view.
//! Loaded from JSON; every field has a serde default so partial files work.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{TableError, TableResult};

/// Where new rows land when no sort is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertOrder {
    /// Newest rows at the end (scrolling log)
    Append,
    /// Newest rows at the front (descending-by-time convention)
    Prepend,
}

/// Configuration for a live table view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Maximum rows on display (default: 1000)
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Queue depth multiplier over `max_rows` (default: 5)
    #[serde(default = "default_queue_scale_factor")]
    pub queue_scale_factor: usize,

    /// How long one offer waits for room (default: 100 ms)
    #[serde(default = "default_offer_timeout_ms")]
    pub offer_timeout_ms: u64,

    /// Failed offers before the stall policy kicks in (default: 2000)
    #[serde(default = "default_stall_retry_limit")]
    pub stall_retry_limit: u32,

    /// Extra failed offers after a stall before the queue is discarded (default: 100)
    #[serde(default = "default_stall_discard_grace")]
    pub stall_discard_grace: u32,

    /// Cleared alarms expire after this long; 0 disables timed expiry (default: 0)
    #[serde(default)]
    pub flush_interval_ms: u64,

    /// Pause watchdog; 0 disables it (default: 10 minutes)
    #[serde(default = "default_max_pause_ms")]
    pub max_pause_ms: u64,

    /// Placement of new rows when unsorted (default: append)
    #[serde(default = "default_insert_order")]
    pub insert_order: InsertOrder,
}

fn default_max_rows() -> usize {
    1000
}

fn default_queue_scale_factor() -> usize {
    5
}

fn default_offer_timeout_ms() -> u64 {
    100
}

fn default_stall_retry_limit() -> u32 {
    2000
}

fn default_stall_discard_grace() -> u32 {
    100
}

fn default_max_pause_ms() -> u64 {
    10 * 60 * 1000
}

fn default_insert_order() -> InsertOrder {
    InsertOrder::Append
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            queue_scale_factor: default_queue_scale_factor(),
            offer_timeout_ms: default_offer_timeout_ms(),
            stall_retry_limit: default_stall_retry_limit(),
            stall_discard_grace: default_stall_discard_grace(),
            flush_interval_ms: 0,
            max_pause_ms: default_max_pause_ms(),
            insert_order: default_insert_order(),
        }
    }
}

impl TableConfig {
    /// Config with the given display capacity
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows,
            ..Default::default()
        }
    }

    /// Set the queue scale factor
    pub fn queue_scale_factor(mut self, factor: usize) -> Self {
        self.queue_scale_factor = factor;
        self
    }

    /// Set the per-offer timeout
    pub fn offer_timeout_ms(mut self, ms: u64) -> Self {
        self.offer_timeout_ms = ms;
        self
    }

    /// Set the stall thresholds
    pub fn stall_policy(mut self, retry_limit: u32, discard_grace: u32) -> Self {
        self.stall_retry_limit = retry_limit;
        self.stall_discard_grace = discard_grace;
        self
    }

    /// Set the alarm flush interval
    pub fn flush_interval_ms(mut self, ms: u64) -> Self {
        self.flush_interval_ms = ms;
        self
    }

    /// Set the pause watchdog
    pub fn max_pause_ms(mut self, ms: u64) -> Self {
        self.max_pause_ms = ms;
        self
    }

    /// Set the unsorted insert placement
    pub fn insert_order(mut self, order: InsertOrder) -> Self {
        self.insert_order = order;
        self
    }

    /// Ingestion queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.max_rows.saturating_mul(self.queue_scale_factor)
    }

    /// Per-offer timeout as a Duration
    pub fn offer_timeout(&self) -> Duration {
        Duration::from_millis(self.offer_timeout_ms)
    }

    /// Total failed offers tolerated before the queue is discarded
    pub fn discard_threshold(&self) -> u32 {
        self.stall_retry_limit.saturating_add(self.stall_discard_grace)
    }

    /// Clamp the sizing knobs to their smallest usable values
    ///
    /// Table constructors run this, so a zero `max_rows` still yields a
    /// one-row table that honors `len() <= capacity()`.
    pub fn normalized(mut self) -> Self {
        self.max_rows = self.max_rows.max(1);
        self.queue_scale_factor = self.queue_scale_factor.max(1);
        self.stall_retry_limit = self.stall_retry_limit.max(1);
        self
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> TableResult<()> {
        if self.max_rows == 0 {
            return Err(TableError::InvalidConfig("max_rows must be > 0".into()));
        }
        if self.queue_scale_factor == 0 {
            return Err(TableError::InvalidConfig(
                "queue_scale_factor must be > 0".into(),
            ));
        }
        if self.stall_retry_limit == 0 {
            return Err(TableError::InvalidConfig(
                "stall_retry_limit must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> TableResult<Self> {
        let config: TableConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> TableResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TableConfig::default();
        assert_eq!(config.max_rows, 1000);
        assert_eq!(config.queue_scale_factor, 5);
        assert_eq!(config.queue_capacity(), 5000);
        assert_eq!(config.flush_interval_ms, 0);
        assert_eq!(config.insert_order, InsertOrder::Append);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = TableConfig::from_json(r#"{"max_rows": 50, "flush_interval_ms": 3000}"#)
            .unwrap();
        assert_eq!(config.max_rows, 50);
        assert_eq!(config.flush_interval_ms, 3000);
        assert_eq!(config.stall_retry_limit, 2000);
        assert_eq!(config.queue_capacity(), 250);
    }

    #[test]
    fn test_insert_order_snake_case() {
        let config = TableConfig::from_json(r#"{"insert_order": "prepend"}"#).unwrap();
        assert_eq!(config.insert_order, InsertOrder::Prepend);
    }

    #[test]
    fn test_zero_rows_rejected() {
        let err = TableConfig::from_json(r#"{"max_rows": 0}"#).unwrap_err();
        assert_eq!(err.code(), "LIVETABLE_INVALID_CONFIG");
    }

    #[test]
    fn test_zero_scale_rejected() {
        let err = TableConfig::with_max_rows(10)
            .queue_scale_factor(0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("queue_scale_factor"));
    }

    #[test]
    fn test_normalized_clamps_zero_sizes() {
        let config = TableConfig::with_max_rows(0)
            .queue_scale_factor(0)
            .stall_policy(0, 3)
            .normalized();
        assert_eq!(config.max_rows, 1);
        assert_eq!(config.queue_capacity(), 1);
        assert_eq!(config.discard_threshold(), 4);
        assert!(config.validate().is_ok());

        let untouched = TableConfig::with_max_rows(20);
        assert_eq!(untouched.clone().normalized(), untouched);
    }

    #[test]
    fn test_discard_threshold() {
        let config = TableConfig::default().stall_policy(20, 5);
        assert_eq!(config.discard_threshold(), 25);
    }

    #[test]
    fn test_load_missing_file() {
        let err = TableConfig::load("/nonexistent/livetable.json").unwrap_err();
        assert_eq!(err.code(), "LIVETABLE_IO_ERROR");
    }
}
