//! `$ref` targets that cannot be loaded or resolved.

use crate::runner::context::ReportOptions;
use crate::runner::views::ReferenceView;
use crate::runner::{Rule, RuleContext, RuleMeta, RuleScope, RuleState};

pub struct UnresolvedRef {
    meta: RuleMeta,
}

impl UnresolvedRef {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "unresolved-ref",
                101,
                "problem",
                "$ref targets must resolve",
            )
            .with_scope(RuleScope::CrossFile)
            .with_url("https://telescope.dev/rules/unresolved-ref"),
        }
    }
}

impl Default for UnresolvedRef {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnresolvedRef {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_reference(&self, cx: &mut RuleContext, re: &ReferenceView, _state: &mut RuleState) {
        if re.is_resolved() {
            return;
        }
        // The range covers the `$ref` string value.
        cx.report_at(
            re,
            &["$ref"],
            ReportOptions::message(format!(
                "Cannot resolve reference \"{}\".",
                re.ref_string()
            )),
        );
    }
}
