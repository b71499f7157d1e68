//! livetable CLI entry point
//!
//! Parses arguments, dispatches through `cli::run` and prints errors to
//! stderr with a non-zero exit. All logic lives in the CLI module.

use livetable::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
