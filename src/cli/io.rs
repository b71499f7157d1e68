//! JSON I/O handling for CLI
//!
//! - Input: one JSON sample per line, blank lines skipped
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::alarm::{AlarmLevel, AlarmSample, AlarmSubject};
use crate::schema::CellRow;
use crate::table::Ingest;

use super::errors::{CliError, CliResult};

/// One line of a sample file
///
/// ```text
/// {"key": "P-0012", "level": "red", "eu_level": "yellow", "timestamp": 1700000000000,
///  "station": "DSS-14", "cells": ["P-0012", "31.5", "power"]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SampleLine {
    /// Subject identity; rows with the same key update in place
    #[serde(default)]
    pub key: Option<String>,
    /// Level of the raw value
    #[serde(default)]
    pub level: AlarmLevel,
    /// Level of the converted value
    #[serde(default)]
    pub eu_level: AlarmLevel,
    /// Sample time in milliseconds
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(flatten)]
    pub subject: AlarmSubject,
    /// Cell text in column order
    pub cells: CellRow,
}

impl SampleLine {
    /// Worse of the raw and converted levels
    pub fn effective_level(&self) -> AlarmLevel {
        self.level.worst(self.eu_level)
    }

    /// Item for a plain live table
    pub fn into_ingest(self) -> Ingest<CellRow> {
        Ingest {
            data: self.cells,
            arrival_time: self.timestamp,
            key: self.key,
        }
    }

    /// Sample for an alarm table; `None` without a key
    pub fn into_alarm_sample(self) -> Option<AlarmSample<CellRow>> {
        let level = self.effective_level();
        let key = self.key?;
        Some(
            AlarmSample::new(key, level, self.timestamp.unwrap_or(0), self.cells)
                .with_subject(self.subject),
        )
    }
}

/// Read every sample from a JSON-lines file
pub fn read_samples(path: &Path) -> CliResult<Vec<SampleLine>> {
    let file = File::open(path).map_err(|e| {
        CliError::io_error(format!("Cannot open samples {}: {}", path.display(), e))
    })?;

    let mut samples = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: SampleLine =
            serde_json::from_str(&line).map_err(|e| CliError::invalid_sample(index + 1, e))?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
