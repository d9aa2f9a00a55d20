//! Command-line argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "telescope",
    version,
    about = "OpenAPI validation with byte-accurate diagnostics"
)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate OpenAPI documents (the default command).
    Check(CheckArgs),
    /// Write a default .telescoperc.json to the current directory.
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Documents to validate; every discovered root when empty.
    pub paths: Vec<String>,

    /// Workspace root directory.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Extra root-document candidates.
    #[arg(long = "entrypoint")]
    pub entrypoints: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Print progress details.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for CheckArgs {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            root: PathBuf::from("."),
            entrypoints: Vec::new(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::args::*;
    use clap::Parser;

    #[test]
    fn test_parse_check_with_paths() {
        let args = Arguments::parse_from(["telescope", "check", "api.yaml", "--format", "json"]);
        match args.command {
            Some(Command::Check(check)) => {
                assert_eq!(check.paths, vec!["api.yaml"]);
                assert_eq!(check.format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_no_command() {
        let args = Arguments::parse_from(["telescope"]);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_parse_entrypoints() {
        let args = Arguments::parse_from([
            "telescope",
            "check",
            "--entrypoint",
            "a.yaml",
            "--entrypoint",
            "b.yaml",
        ]);
        match args.command {
            Some(Command::Check(check)) => {
                assert_eq!(check.entrypoints, vec!["a.yaml", "b.yaml"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
