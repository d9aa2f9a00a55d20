//! Telescope CLI application entry point.
//!
//! This binary handles command dispatch for the Telescope OpenAPI validator.

use std::process::ExitCode;

use clap::Parser;
use telescope::cli::{Arguments, ExitStatus};

fn main() -> ExitCode {
    let args = Arguments::parse();

    match telescope::cli::run_cli(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitStatus::Error.into()
        }
    }
}
