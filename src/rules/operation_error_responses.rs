//! Operations should document the standard error responses.

use crate::runner::context::ReportOptions;
use crate::runner::{Rule, RuleContext, RuleMeta, RuleState};
use crate::runner::views::OperationView;

const EXPECTED_STATUSES: &[&str] = &["400", "401", "403", "429", "500"];

pub struct OperationErrorResponses {
    meta: RuleMeta,
}

impl OperationErrorResponses {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "operation-error-responses",
                421,
                "problem",
                "Operations must document the standard error responses",
            )
            .with_severity(crate::diagnostics::Severity::Warning)
            .with_url("https://telescope.dev/rules/operation-error-responses"),
        }
    }
}

impl Default for OperationErrorResponses {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for OperationErrorResponses {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_operation(&self, cx: &mut RuleContext, op: &OperationView, _state: &mut RuleState) {
        let statuses = op.response_statuses();
        let missing: Vec<&str> = EXPECTED_STATUSES
            .iter()
            .copied()
            .filter(|expected| !statuses.contains(expected))
            .collect();
        if missing.is_empty() {
            return;
        }
        cx.report_at(
            op,
            &["responses"],
            ReportOptions::message(format!(
                "Operation is missing error responses: {}.",
                missing.join(", ")
            ))
            .with_prefer_key(),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::core::cache::EngineCaches;
    use crate::core::cancel::CancelToken;
    use crate::core::context::{ResolveOptions, resolve_linting_context};
    use crate::core::host::MemoryHost;
    use crate::runner::{Rule, lint_document};
    use crate::rules::OperationErrorResponses;
    use pretty_assertions::assert_eq;

    fn api_with_statuses(statuses: &[&str]) -> String {
        let mut raw = String::from(
            "openapi: 3.0.3\npaths:\n  /x:\n    get:\n      responses:\n",
        );
        for status in statuses {
            raw.push_str(&format!("        '{}':\n          description: r\n", status));
        }
        raw
    }

    fn lint(raw: &str) -> crate::runner::LintOutcome {
        let host = MemoryHost::new().with_file("api.yaml", raw);
        let mut caches = EngineCaches::new();
        let lctx =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        let rules: Vec<Box<dyn Rule>> = vec![Box::new(OperationErrorResponses::new())];
        lint_document(&lctx, &rules, &Default::default(), &CancelToken::new())
    }

    #[test]
    fn test_complete_error_responses_pass() {
        let raw = api_with_statuses(&["200", "400", "401", "403", "429", "500"]);
        let out = lint(&raw);
        assert_eq!(out.diagnostics.len(), 0);
    }

    #[test]
    fn test_missing_statuses_listed_in_message() {
        let raw = api_with_statuses(&["200", "400", "401", "403"]);
        let out = lint(&raw);
        assert_eq!(out.diagnostics.len(), 1);
        let message = &out.diagnostics[0].message;
        assert!(message.contains("429"), "{}", message);
        assert!(message.contains("500"), "{}", message);
        assert!(!message.contains("400"), "{}", message);
    }

    #[test]
    fn test_no_responses_at_all() {
        let raw = "openapi: 3.0.3\npaths:\n  /x:\n    get:\n      summary: x\n";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 1);
        let message = &out.diagnostics[0].message;
        for status in ["400", "401", "403", "429", "500"] {
            assert!(message.contains(status), "{}", message);
        }
    }
}
