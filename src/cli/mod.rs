//! Command-line interface layer.
//!
//! - `args`: clap argument definitions
//! - `exit_status`: process exit codes
//! - `report`: human and JSON diagnostic output
//! - `run`: command dispatch

pub mod args;
pub mod exit_status;
pub mod report;
pub mod run;

pub use args::{Arguments, CheckArgs, Command, OutputFormat};
pub use exit_status::ExitStatus;
pub use run::run_cli;
