//! Process exit codes.

use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// No diagnostics at error severity.
    Success,
    /// At least one error-severity diagnostic.
    IssuesFound,
    /// The command itself failed.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::IssuesFound => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}
