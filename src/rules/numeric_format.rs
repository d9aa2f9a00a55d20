//! Numeric schemas must declare an explicit format.

use crate::runner::context::ReportOptions;
use crate::runner::validators::one_of;
use crate::runner::views::SchemaView;
use crate::runner::{Rule, RuleContext, RuleMeta, RuleState};

const INTEGER_FORMATS: &[&str] = &["int32", "int64"];
const NUMBER_FORMATS: &[&str] = &["float", "double"];

pub struct NumericFormat {
    meta: RuleMeta,
}

impl NumericFormat {
    pub fn new() -> Self {
        Self {
            meta: RuleMeta::new(
                "numeric-format",
                310,
                "suggestion",
                "Numeric schemas declare an explicit format",
            )
            .with_url("https://telescope.dev/rules/numeric-format"),
        }
    }
}

impl Default for NumericFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for NumericFormat {
    fn meta(&self) -> &RuleMeta {
        &self.meta
    }

    fn check_schema(&self, cx: &mut RuleContext, schema: &SchemaView, _state: &mut RuleState) {
        let allowed = match schema.ty() {
            Some("integer") => INTEGER_FORMATS,
            Some("number") => NUMBER_FORMATS,
            _ => return,
        };
        match schema.format() {
            None => {
                cx.report_at(
                    schema,
                    &["type"],
                    ReportOptions::message(format!(
                        "Schemas of type {} must declare a format of {}.",
                        schema.ty().unwrap_or_default(),
                        allowed.join(" or ")
                    )),
                );
            }
            Some(format) => {
                let result = one_of(format, allowed);
                if !result.valid {
                    cx.report_at(
                        schema,
                        &["format"],
                        ReportOptions::message(
                            result.message.unwrap_or_else(|| "Invalid format.".into()),
                        ),
                    );
                }
            }
        }
    }
}
