//! Operations must carry at least one tag.

use crate::runner::{FieldSpec, Rule, RuleMeta, VisitorKind};

pub struct TagsRequired {
    meta: RuleMeta,
}

impl TagsRequired {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "tags-required",
                420,
                "problem",
                "Operations must have at least one tag",
            )
            .with_url("https://telescope.dev/rules/tags-required"),
        }
    }
}

impl Default for TagsRequired {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for TagsRequired {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![FieldSpec::required(
            VisitorKind::Operation,
            "tags",
            "Operations must have at least one tag.",
        )]
    }
}

#[cfg(test)]
mod tests {
    use crate::core::cache::EngineCaches;
    use crate::core::cancel::CancelToken;
    use crate::core::context::{ResolveOptions, resolve_linting_context};
    use crate::core::host::MemoryHost;
    use crate::diagnostics::{RangePrecision, Severity};
    use crate::runner::{Rule, lint_document};
    use crate::rules::TagsRequired;
    use pretty_assertions::assert_eq;

    fn lint(raw: &str) -> crate::runner::LintOutcome {
        let host = MemoryHost::new().with_file("api.yaml", raw);
        let mut caches = EngineCaches::new();
        let lctx =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        let rules: Vec<Box<dyn Rule>> = vec![Box::new(TagsRequired::new())];
        lint_document(&lctx, &rules, &Default::default(), &CancelToken::new())
    }

    #[test]
    fn test_missing_tags_reported_at_operation_key() {
        let raw = "\
openapi: 3.0.3
paths:
  /x:
    get:
      responses:
        '200':
          description: ok
";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 1);
        let diag = &out.diagnostics[0];
        assert_eq!(diag.code, "rule-420-tags-required");
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.message.contains("at least one tag"));
        // The field is missing, so the range falls back to the `get:` key.
        assert_eq!(diag.range_precision, RangePrecision::Parent);
        assert_eq!(diag.range.start.line, 3);
        assert_eq!(diag.range.start.character, 4);
        assert_eq!(diag.range.end.character, 7);
    }

    #[test]
    fn test_tagged_operation_passes() {
        let raw = "\
openapi: 3.0.3
paths:
  /x:
    get:
      tags: [pets]
      responses:
        '200':
          description: ok
";
        let out = lint(raw);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_tags_array_is_absent() {
        let raw = "\
openapi: 3.0.3
paths:
  /x:
    get:
      tags: []
      responses:
        '200':
          description: ok
";
        let out = lint(raw);
        assert_eq!(out.diagnostics.len(), 1);
    }
}
