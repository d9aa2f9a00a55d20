//! Field validators, with auto-fix variants.
//!
//! Validators are pure functions over field values returning a
//! [`ValidationResult`]; the `*_with_fix` variants also attach the patch
//! that would repair the failure. Rules register the patch through
//! `RuleContext::fix` when the validator fails.

use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostics::FilePatch;
use crate::runner::fix::FixBuilder;
use crate::utils::word_count;

static CAMEL_CASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-z][a-zA-Z0-9]*$").expect("valid pattern"));

/// The outcome of one validator application.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: Option<String>,
    pub fix: Option<FilePatch>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
            fix: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: FilePatch) -> Self {
        self.fix = Some(fix);
        self
    }
}

// ============================================================
// Plain validators
// ============================================================

/// A value is present when it is a non-empty-trimmed string.
pub fn required(value: Option<&str>) -> ValidationResult {
    match value {
        Some(s) if !s.trim().is_empty() => ValidationResult::ok(),
        _ => ValidationResult::fail("Value is required."),
    }
}

pub fn min_length(value: &str, min: usize) -> ValidationResult {
    if value.chars().count() >= min {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(format!(
            "Value must be at least {} characters, got {}.",
            min,
            value.chars().count()
        ))
    }
}

/// Word counting splits on whitespace and filters empties; an empty
/// string has zero words.
pub fn max_words(value: &str, max: usize) -> ValidationResult {
    let words = word_count(value);
    if words <= max {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(format!(
            "Value must be at most {} words, got {}.",
            max, words
        ))
    }
}

pub fn one_of(value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.contains(&value) {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(format!(
            "Value must be one of {}, got \"{}\".",
            allowed.join(" or "),
            value
        ))
    }
}

/// camelCase: a lowercase first letter, alphanumeric throughout.
pub fn camel_case(value: &str) -> ValidationResult {
    if is_camel_case(value) {
        ValidationResult::ok()
    } else {
        ValidationResult::fail(format!("Value must be camelCase, got \"{}\".", value))
    }
}

fn is_camel_case(value: &str) -> bool {
    CAMEL_CASE.is_match(value)
}

/// Convert a value to camelCase: split on non-alphanumerics and case
/// boundaries, lowercase the first word, capitalize the rest.
pub fn to_camel_case(value: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in value.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && previous_lower {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut result = String::new();
    for (index, word) in words.iter().enumerate() {
        let lower = word.to_ascii_lowercase();
        if index == 0 {
            result.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                result.push(first.to_ascii_uppercase());
                result.push_str(chars.as_str());
            }
        }
    }
    result
}

// ============================================================
// Auto-fix variants
// ============================================================

/// Required with a default value patch when absent.
pub fn required_with_fix(
    value: Option<&str>,
    uri: &str,
    parent_ptr: &str,
    field: &str,
    default_value: serde_json::Value,
) -> ValidationResult {
    let result = required(value);
    if result.valid {
        return result;
    }
    let fix = FixBuilder::new(uri)
        .at(parent_ptr)
        .add_field(field, default_value)
        .build();
    result.with_fix(fix)
}

/// Minimum length with a patch replacing the value by the caller's
/// replacement text.
pub fn min_length_with_fix(
    value: &str,
    min: usize,
    uri: &str,
    field_ptr: &str,
    replacement: &str,
) -> ValidationResult {
    let result = min_length(value, min);
    if result.valid {
        return result;
    }
    result.with_fix(value_patch(uri, field_ptr, replacement))
}

/// An `add` patch setting a field's value (JSON Patch `add` on an
/// existing member replaces it).
fn value_patch(uri: &str, field_ptr: &str, value: &str) -> FilePatch {
    FilePatch {
        uri: uri.to_string(),
        ops: vec![crate::diagnostics::PatchOp::Add {
            path: crate::core::pointer::normalize_pointer(field_ptr),
            value: serde_json::Value::String(value.to_string()),
        }],
    }
}

/// One-of with a patch replacing the value by the first allowed option.
pub fn one_of_with_fix(
    value: &str,
    allowed: &[&str],
    uri: &str,
    field_ptr: &str,
) -> ValidationResult {
    let result = one_of(value, allowed);
    if result.valid {
        return result;
    }
    let Some(first) = allowed.first() else {
        return result;
    };
    result.with_fix(value_patch(uri, field_ptr, first))
}

/// camelCase with a patch rewriting the value in camelCase.
pub fn camel_case_with_fix(value: &str, uri: &str, field_ptr: &str) -> ValidationResult {
    let result = camel_case(value);
    if result.valid {
        return result;
    }
    result.with_fix(value_patch(uri, field_ptr, &to_camel_case(value)))
}
