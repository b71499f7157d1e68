//! CLI module for livetable
//!
//! Provides command-line interface for:
//! - replay: Feed a JSON-lines sample file through a live table
//! - check-config: Validate a replay configuration

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, replay, run, run_command, ReplayConfig, ReplayOptions};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_samples, write_response, SampleLine};
