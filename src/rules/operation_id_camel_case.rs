//! operationId values are camelCase, with an auto-fix.

use crate::core::pointer::join_pointer;
use crate::runner::context::ReportOptions;
use crate::runner::validators::camel_case_with_fix;
use crate::runner::views::OperationView;
use crate::runner::{Rule, RuleContext, RuleMeta, RuleState};

pub struct OperationIdCamelCase {
    meta: RuleMeta,
}

impl OperationIdCamelCase {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "operation-id-camel-case",
                422,
                "suggestion",
                "operationId values are camelCase",
            )
            .with_url("https://telescope.dev/rules/operation-id-camel-case"),
        }
    }
}

impl Default for OperationIdCamelCase {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for OperationIdCamelCase {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_operation(&self, cx: &mut RuleContext, op: &OperationView, _state: &mut RuleState) {
        let Some(operation_id) = op.operation_id() else {
            return;
        };
        let field_ptr = join_pointer(&op.r.node.ptr, "operationId");
        let result = camel_case_with_fix(operation_id, &op.r.node.uri, &field_ptr);
        if result.valid {
            return;
        }
        let mut options = ReportOptions::message(
            result
                .message
                .clone()
                .unwrap_or_else(|| "operationId must be camelCase.".into()),
        );
        if let Some(fix) = result.fix {
            options = options.with_suggestion("Convert to camelCase", fix.clone());
            cx.fix(fix);
        }
        cx.report_at(op, &["operationId"], options);
    }
}
