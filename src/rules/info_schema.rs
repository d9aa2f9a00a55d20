//! The `info` object carries the fields clients depend on.
//!
//! Backed by a JSON Schema: validator errors translate to diagnostics
//! with ranges resolved against the document IR. The compiled validator
//! memoizes in per-run state.

use std::sync::LazyLock;

use serde_json::{Value, json};

use crate::core::cache::SchemaValidatorCache;
use crate::diagnostics::{Range, RangePrecision, Severity};
use crate::runner::context::ReportOptions;
use crate::runner::schema::validate_against_schema;
use crate::runner::views::InfoView;
use crate::runner::{Rule, RuleContext, RuleMeta, RuleState};

static INFO_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "required": ["title", "version"],
        "properties": {
            "title": {"type": "string", "minLength": 1},
            "version": {"type": "string"},
            "description": {"type": "string"},
            "termsOfService": {"type": "string"}
        }
    })
});

pub struct InfoSchema {
    meta: RuleMeta,
}

impl InfoSchema {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "info-fields",
                210,
                "problem",
                "The info object carries title and version",
            )
            .with_url("https://telescope.dev/rules/info-fields"),
        }
    }
}

impl Default for InfoSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for InfoSchema {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn state(&self) -> RuleState {
        Box::new(SchemaValidatorCache::default())
    }

    fn check_info(&self, cx: &mut RuleContext, info: &InfoView, state: &mut RuleState) {
        let cache = state
            .downcast_mut::<SchemaValidatorCache>()
            .expect("state is the validator cache");
        let Some(doc) = cx.project().documents.get(info.uri).cloned() else {
            return;
        };
        match validate_against_schema(&INFO_SCHEMA, &doc, &info.node.ptr, cache) {
            Ok(findings) => {
                for finding in findings {
                    cx.report(
                        info.uri,
                        finding.range,
                        finding.precision,
                        ReportOptions::message(finding.message),
                    );
                }
            }
            Err(err) => {
                cx.report_with_code(
                    "schema-compilation-error",
                    info.uri,
                    Range::zero(),
                    RangePrecision::Fallback,
                    ReportOptions::message(err.message).with_severity(Severity::Error),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::cache::EngineCaches;
    use crate::core::cancel::CancelToken;
    use crate::core::context::{ResolveOptions, resolve_linting_context};
    use crate::core::host::MemoryHost;
    use crate::runner::{Rule, lint_document};
    use crate::rules::InfoSchema;
    use pretty_assertions::assert_eq;

    fn lint(raw: &str) -> crate::runner::LintOutcome {
        let host = MemoryHost::new().with_file("api.yaml", raw);
        let mut caches = EngineCaches::new();
        let lctx =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        let rules: Vec<Box<dyn Rule>> = vec![Box::new(InfoSchema::new())];
        lint_document(&lctx, &rules, &Default::default(), &CancelToken::new())
    }

    #[test]
    fn test_complete_info_passes() {
        let raw = "openapi: 3.0.3\ninfo:\n  title: Pets\n  version: '1.0'\npaths: {}\n";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 0);
    }

    #[test]
    fn test_missing_version_reported() {
        let raw = "openapi: 3.0.3\ninfo:\n  title: Pets\npaths: {}\n";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 1);
        let diag = &out.diagnostics[0];
        assert_eq!(diag.code, "rule-210-info-fields");
        assert!(diag.message.contains("\"version\""));
        // Anchored at the info object's first key.
        assert_eq!(diag.range.start.line, 2);
        assert_eq!(diag.range.start.character, 2);
    }

    #[test]
    fn test_wrong_type_reported_at_value() {
        let raw = "openapi: 3.0.3\ninfo:\n  title: Pets\n  version: 1\npaths: {}\n";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].range.start.line, 3);
    }

    #[test]
    fn test_no_info_object_no_dispatch() {
        let raw = "openapi: 3.0.3\npaths: {}\n";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 0);
    }
}
