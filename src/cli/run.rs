//! Command dispatch.

use std::process::ExitCode;

use anyhow::{Context, Result};

use crate::cli::args::{Arguments, CheckArgs, Command, OutputFormat};
use crate::cli::exit_status::ExitStatus;
use crate::cli::report::{render_human, render_json};
use crate::config::load_config;
use crate::core::cache::EngineCaches;
use crate::core::cancel::CancelToken;
use crate::core::context::{ResolveOptions, resolve_linting_context};
use crate::core::host::FsHost;
use crate::core::roots::discover_roots;
use crate::diagnostics::{Diagnostic, Severity};
use crate::runner::lint_document;

pub fn run_cli(args: Arguments) -> Result<ExitCode> {
    let status = match args.command {
        Some(Command::Init) => run_init()?,
        Some(Command::Check(check)) => run_check(check)?,
        None => run_check(CheckArgs::default())?,
    };
    Ok(status.into())
}

fn run_init() -> Result<ExitStatus> {
    let path = std::path::Path::new(crate::config::CONFIG_FILE_NAME);
    if path.exists() {
        eprintln!("{} already exists.", crate::config::CONFIG_FILE_NAME);
        return Ok(ExitStatus::Error);
    }
    std::fs::write(path, crate::config::default_config_json()?)
        .context("Failed to write config file")?;
    println!("Created {}", crate::config::CONFIG_FILE_NAME);
    Ok(ExitStatus::Success)
}

fn run_check(args: CheckArgs) -> Result<ExitStatus> {
    let config_result = load_config(&args.root)?;
    if args.verbose && !config_result.from_file {
        eprintln!(
            "Note: No {} found, using default configuration",
            crate::config::CONFIG_FILE_NAME
        );
    }
    let config = config_result.config;

    let host = FsHost::new(&args.root);
    let mut caches = EngineCaches::new();
    let cancel = CancelToken::new();

    let mut entrypoints = config.entrypoints.clone();
    entrypoints.extend(args.entrypoints.iter().cloned());
    let options = ResolveOptions { entrypoints };

    // Explicit paths, or every discovered root.
    let targets: Vec<String> = if args.paths.is_empty() {
        discover_roots(&host, &mut caches.doc_types, &options.entrypoints)
    } else {
        args.paths.clone()
    };

    let (rules, overrides) = config.materialize();

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for target in &targets {
        if args.verbose {
            eprintln!("Checking {}", target);
        }
        let lctx = resolve_linting_context(target, &host, &mut caches, &options);
        let outcome = lint_document(&lctx, &rules, &overrides, &cancel);
        diagnostics.extend(outcome.diagnostics);
    }

    match args.format {
        OutputFormat::Human => print!("{}", render_human(&diagnostics)),
        OutputFormat::Json => println!("{}", render_json(&diagnostics)),
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    if has_errors {
        Ok(ExitStatus::IssuesFound)
    } else {
        Ok(ExitStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use crate::cli::args::{Arguments, CheckArgs};
    use crate::cli::run::*;
    use clap::Parser;

    #[test]
    fn test_check_clean_workspace() {
        use std::fs;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("api.yaml"),
            "openapi: 3.0.3\npaths:\n  /x:\n    get:\n      tags: [t]\n      operationId: getX\n      responses:\n        '200':\n          description: ok\n        '400':\n          description: e\n        '401':\n          description: e\n        '403':\n          description: e\n        '429':\n          description: e\n        '500':\n          description: e\n",
        )
        .unwrap();

        let args = CheckArgs {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let status = run_check(args).unwrap();
        assert_eq!(status, ExitStatus::Success);
    }

    #[test]
    fn test_check_reports_errors_with_exit_code() {
        use std::fs;
        use tempfile::tempdir;

        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("api.yaml"),
            "openapi: 3.0.3\npaths:\n  /x:\n    get:\n      responses:\n        '200':\n          description: ok\n",
        )
        .unwrap();

        let args = CheckArgs {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let status = run_check(args).unwrap();
        assert_eq!(status, ExitStatus::IssuesFound);
    }

    #[test]
    fn test_run_cli_defaults_to_check() {
        use tempfile::tempdir;
        let dir = tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = run_cli(Arguments::parse_from(["telescope"]));
        std::env::set_current_dir(original).unwrap();
        assert!(result.is_ok());
    }
}
