//! CLI command implementations
//!
//! `replay` runs a producer thread that submits every sample while the
//! main thread ticks the table, the same split a monitor view uses between
//! its data source and its display thread.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::alarm::{AlarmTable, SelectionFilter};
use crate::clock::{Clock, SystemClock};
use crate::config::TableConfig;
use crate::observability::{
    log_event_with_fields, Event, Logger, ObservationScope, Severity, TableMetrics,
};
use crate::schema::{CellRow, ColumnId, ColumnSpec, TableSchema};
use crate::store::Row;
use crate::table::{Applier, ApplyReport, LiveTable, TableEngine};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_samples, write_response, SampleLine};

/// Replay configuration file: table knobs, columns and an optional filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(flatten)]
    pub table: TableConfig,

    /// Columns in display order
    pub columns: Vec<ColumnSpec>,

    /// Alarm filter, alarm replays only
    #[serde(default)]
    pub filter: Option<SelectionFilter>,
}

impl ReplayConfig {
    /// Load and validate from a JSON file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: ReplayConfig = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("max_rows", &config.table.max_rows.to_string()),
                ("columns", &config.columns.len().to_string()),
            ],
        );
        Ok(config)
    }

    /// Reject unusable table settings and empty column lists
    pub fn validate(&self) -> CliResult<()> {
        self.table.validate()?;
        if self.columns.is_empty() {
            return Err(CliError::config_error("columns must not be empty"));
        }
        Ok(())
    }

    pub fn schema(&self) -> TableSchema {
        TableSchema::new(self.columns.clone())
    }
}

/// Options of one replay run
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub config: PathBuf,
    pub samples: PathBuf,
    pub sort: Option<String>,
    pub descending: bool,
    pub alarm: bool,
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Replay {
            config,
            samples,
            sort,
            descending,
            alarm,
            verbose,
        } => {
            // Keep stdout parseable unless asked for the event stream
            Logger::set_min_severity(if verbose {
                Severity::Info
            } else {
                Severity::Warn
            });
            let options = ReplayOptions {
                config,
                samples,
                sort,
                descending,
                alarm,
            };
            write_response(replay(&options)?)
        }
        Command::CheckConfig { config } => write_response(check_config(&config)?),
    }
}

/// Validate a configuration file; returns it with defaults filled in
pub fn check_config(config_path: &Path) -> CliResult<Value> {
    let config = ReplayConfig::load(config_path)?;
    Ok(json!({
        "config": serde_json::to_value(&config)?,
        "queue_capacity": config.table.queue_capacity(),
    }))
}

/// Feed a sample file through a live table; returns rows, report and metrics
pub fn replay(options: &ReplayOptions) -> CliResult<Value> {
    let config = ReplayConfig::load(&options.config)?;
    let samples = read_samples(&options.samples)?;
    let schema = config.schema();
    let sort_column = options
        .sort
        .as_deref()
        .map(|name| resolve_column(&schema, name))
        .transpose()?;

    let count = samples.len().to_string();
    let mode = if options.alarm { "alarm" } else { "table" };
    log_event_with_fields(Event::ReplayStart, &[("samples", &count), ("mode", mode)]);
    let scope = ObservationScope::with_fields("REPLAY", &[("samples", &count), ("mode", mode)]);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let result = if options.alarm {
        let mut table = AlarmTable::new(schema, config.table.clone(), Arc::clone(&clock));
        if let Some(filter) = config.filter.clone() {
            table = table.with_filter(Box::new(filter));
        }
        if let Some(column) = sort_column {
            table.engine_mut().sort_by(column, !options.descending);
        }
        let items = samples
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                line.into_alarm_sample()
                    .ok_or_else(|| CliError::invalid_sample(i + 1, "alarm samples need a key"))
            })
            .collect::<CliResult<Vec<_>>>()?;
        let live = Arc::new(LiveTable::new(table, config.table, clock));
        let report = feed(&live, items)?;
        live.read(|table| summarize(table.rows(), report, live.metrics()))
    } else {
        let mut table = TableEngine::new(schema, config.table.clone(), Arc::clone(&clock));
        if let Some(column) = sort_column {
            table.sort_by(column, !options.descending);
        }
        let items = samples.into_iter().map(SampleLine::into_ingest).collect();
        let live = Arc::new(LiveTable::new(table, config.table, clock));
        let report = feed(&live, items)?;
        live.read(|table| summarize(table.rows(), report, live.metrics()))
    };

    match result {
        Ok(value) => {
            let rows = value["rows"].as_array().map_or(0, Vec::len).to_string();
            log_event_with_fields(Event::ReplayComplete, &[("rows", &rows)]);
            scope.complete_with_fields(&[("rows", &rows)]);
            Ok(value)
        }
        Err(e) => {
            scope.fail(e.message());
            Err(e)
        }
    }
}

/// Producer thread submits, this thread ticks until everything is applied
fn feed<A>(live: &Arc<LiveTable<A>>, items: Vec<A::Item>) -> CliResult<ApplyReport>
where
    A: Applier + 'static,
    A::Item: 'static,
{
    let producer = {
        let live = Arc::clone(live);
        thread::spawn(move || {
            for item in items {
                live.submit(item);
            }
        })
    };

    let mut report = ApplyReport::default();
    while !producer.is_finished() {
        report.merge(live.tick());
        thread::sleep(Duration::from_millis(2));
    }
    producer
        .join()
        .map_err(|_| CliError::replay_failed("producer thread panicked"))?;
    report.merge(live.tick());
    Ok(report)
}

fn summarize(
    rows: &[Row<CellRow>],
    report: ApplyReport,
    metrics: &TableMetrics,
) -> CliResult<Value> {
    Ok(json!({
        "rows": serde_json::to_value(rows)?,
        "report": serde_json::to_value(report)?,
        "metrics": serde_json::to_value(metrics.snapshot())?,
    }))
}

/// Column by case-insensitive name, or by index
fn resolve_column(schema: &TableSchema, name: &str) -> CliResult<ColumnId> {
    if let Some(id) = schema.column_id(name) {
        return Ok(id);
    }
    match name.parse::<usize>() {
        Ok(index) if index < schema.len() => Ok(ColumnId(index)),
        _ => Err(CliError::unknown_column(name)),
    }
}
