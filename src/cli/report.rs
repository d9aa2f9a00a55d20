//! Diagnostic output: colored human report and machine-readable JSON.

use colored::Colorize;

use crate::diagnostics::{Diagnostic, Severity};

/// Render diagnostics grouped per file, sorted by position.
pub fn render_human(diagnostics: &[Diagnostic]) -> String {
    let mut sorted: Vec<&Diagnostic> = diagnostics.iter().collect();
    sorted.sort_by(|a, b| {
        a.uri
            .cmp(&b.uri)
            .then_with(|| a.range.start.line.cmp(&b.range.start.line))
            .then_with(|| a.range.start.character.cmp(&b.range.start.character))
            .then_with(|| a.code.cmp(&b.code))
    });

    let mut output = String::new();
    let mut current_uri: Option<&str> = None;
    for diag in &sorted {
        if current_uri != Some(diag.uri.as_str()) {
            if current_uri.is_some() {
                output.push('\n');
            }
            output.push_str(&format!("{}\n", diag.uri.bold().underline()));
            current_uri = Some(diag.uri.as_str());
        }
        let severity = match diag.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".blue().bold(),
            Severity::Hint => "hint".dimmed(),
        };
        output.push_str(&format!(
            "  {}:{}  {}  {}  {}\n",
            diag.range.start.line + 1,
            diag.range.start.character + 1,
            severity,
            diag.message,
            diag.code.dimmed()
        ));
    }

    if !sorted.is_empty() {
        let errors = sorted
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        let warnings = sorted
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        let summary = format!(
            "\n{} problem(s) ({} error(s), {} warning(s))\n",
            sorted.len(),
            errors,
            warnings
        );
        if errors > 0 {
            output.push_str(&summary.red().bold().to_string());
        } else {
            output.push_str(&summary.yellow().to_string());
        }
    }
    output
}

/// Render diagnostics as a JSON array.
pub fn render_json(diagnostics: &[Diagnostic]) -> String {
    serde_json::to_string_pretty(diagnostics).unwrap_or_else(|_| "[]".to_string())
}
