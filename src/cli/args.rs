//! CLI argument definitions using clap
//!
//! Commands:
//! - livetable replay --config <path> --samples <path> [--sort <column>] [--descending] [--alarm]
//! - livetable check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// livetable - bounded, sortable live tables fed from sample streams
#[derive(Parser, Debug)]
#[command(name = "livetable")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a sample file through a live table and print the result
    Replay {
        /// Path to configuration file
        #[arg(long, default_value = "./livetable.json")]
        config: PathBuf,

        /// JSON-lines sample file
        #[arg(long)]
        samples: PathBuf,

        /// Column to sort on, by name or index
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending instead of ascending
        #[arg(long)]
        descending: bool,

        /// Track alarm lifecycles instead of listing every sample
        #[arg(long)]
        alarm: bool,

        /// Log table events at INFO instead of WARN
        #[arg(long)]
        verbose: bool,
    },

    /// Validate a configuration file and print it with defaults filled in
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./livetable.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::try_parse_from([
            "livetable",
            "replay",
            "--config",
            "t.json",
            "--samples",
            "s.jsonl",
            "--sort",
            "Value",
            "--descending",
        ])
        .unwrap();
        match cli.command {
            Command::Replay {
                sort,
                descending,
                alarm,
                ..
            } => {
                assert_eq!(sort.as_deref(), Some("Value"));
                assert!(descending);
                assert!(!alarm);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_replay_requires_samples() {
        assert!(Cli::try_parse_from(["livetable", "replay"]).is_err());
    }
}
