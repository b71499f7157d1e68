//! CLI Replay Tests
//!
//! End-to-end replays through the CLI command layer:
//! - Keyed samples update rows in place
//! - Alarm replays honor the configured filter
//! - Malformed sample files fail with a line number

use std::fs;
use std::path::PathBuf;

use livetable::cli::{replay, CliErrorCode, ReplayOptions};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup(config: Value, samples: &[&str]) -> (TempDir, ReplayOptions) {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("livetable.json");
    let samples_path = tmp.path().join("samples.jsonl");
    fs::write(&config_path, config.to_string()).unwrap();
    fs::write(&samples_path, samples.join("\n")).unwrap();

    let options = ReplayOptions {
        config: config_path,
        samples: samples_path,
        sort: None,
        descending: false,
        alarm: false,
    };
    (tmp, options)
}

fn columns() -> Value {
    json!([
        {"name": "Point"},
        {"name": "Reading", "collation": "numeric", "volatile": true}
    ])
}

fn cells(value: &Value, column: usize) -> Vec<String> {
    value["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["data"][column].as_str().unwrap_or_default().to_string())
        .collect()
}

// =============================================================================
// Replay Tests
// =============================================================================

/// Keyed samples replace the row for their key and stay sorted.
#[test]
fn test_keyed_samples_update_in_place() {
    let (_tmp, mut options) = setup(
        json!({"max_rows": 10, "columns": columns()}),
        &[
            r#"{"key": "A", "timestamp": 1, "cells": ["A", "5"]}"#,
            r#"{"key": "B", "timestamp": 2, "cells": ["B", "3"]}"#,
            r#""#,
            r#"{"key": "A", "timestamp": 3, "cells": ["A", "1"]}"#,
        ],
    );
    options.sort = Some("Reading".into());

    let value = replay(&options).unwrap();
    assert_eq!(cells(&value, 0), vec!["A", "B"]);
    assert_eq!(cells(&value, 1), vec!["1", "3"]);
    assert_eq!(value["metrics"]["rows_inserted"], 2);
    assert_eq!(value["metrics"]["rows_updated"], 1);
}

/// The configured station filter keeps other stations off an alarm table.
#[test]
fn test_alarm_replay_applies_filter() {
    let (_tmp, mut options) = setup(
        json!({
            "max_rows": 10,
            "columns": columns(),
            "filter": {"stations": ["DSS-14"]}
        }),
        &[
            r#"{"key": "P-1", "level": "red", "station": "DSS-14", "cells": ["P-1", "9"]}"#,
            r#"{"key": "P-2", "level": "red", "station": "DSS-43", "cells": ["P-2", "8"]}"#,
            r#"{"key": "P-3", "level": "yellow", "cells": ["P-3", "7"]}"#,
        ],
    );
    options.alarm = true;

    let value = replay(&options).unwrap();
    assert_eq!(cells(&value, 0), vec!["P-1"]);
    assert_eq!(value["rows"][0]["alarm"]["level"], "red");
}

/// A bad line is reported by number.
#[test]
fn test_malformed_sample_reports_line() {
    let (_tmp, options) = setup(
        json!({"columns": columns()}),
        &[r#"{"cells": ["A", "1"]}"#, r#"{"cells": 5}"#],
    );

    let err = replay(&options).unwrap_err();
    assert_eq!(err.code(), &CliErrorCode::InvalidSample);
    assert!(err.message().contains("line 2"), "{}", err.message());
}
