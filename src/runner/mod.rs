//! Rule model and visitor runner.
//!
//! A rule is a struct implementing [`Rule`]: metadata, optional per-run
//! state, optional declarative field specs, and per-entity visitor
//! methods with empty defaults. The runner dispatches every indexed
//! entity to every rule in deterministic order; declarative specs and
//! imperative visitors both fire for the same entity kind.
//!
//! ## Module Structure
//!
//! - `context`: The `RuleContext` every visitor receives
//! - `dispatch`: The visitor runner
//! - `fix`: Fluent `FilePatch` builder
//! - `generic`: Rules for non-OpenAPI YAML/JSON files
//! - `schema`: JSON-Schema to diagnostic translation
//! - `validators`: Declarative field validators (with auto-fix variants)
//! - `views`: Typed entity payloads with cached accessors

pub mod context;
pub mod dispatch;
pub mod fix;
pub mod generic;
pub mod schema;
pub mod validators;
pub mod views;

use std::any::Any;
use std::collections::HashMap;

use crate::core::document::DocumentFormat;
use crate::core::index::ProjectIndex;
use crate::diagnostics::Severity;

pub use context::{ReportOptions, RuleContext, ScopeContext};
pub use dispatch::{LintOutcome, lint_document};
pub use fix::FixBuilder;
pub use views::{
    CallbackView, ComponentView, DocumentView, ExampleView, HeaderView, InfoView, LinkView,
    MediaTypeView, OperationView, ParameterView, PathItemView, ReferenceView, RequestBodyView,
    ResponseView, RootView, SchemaView, SecurityRequirementView, TagView,
};

// ============================================================
// Rule metadata
// ============================================================

/// Canonical rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    Problem,
    Suggestion,
    Layout,
}

impl RuleType {
    /// Canonicalize the string forms accepted by rule definitions.
    pub fn canonicalize(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "problem" | "error" => Some(RuleType::Problem),
            "suggestion" | "suggest" => Some(RuleType::Suggestion),
            "layout" | "style" => Some(RuleType::Layout),
            _ => None,
        }
    }

    /// The severity used when a rule sets no default of its own.
    pub fn implied_severity(self) -> Severity {
        match self {
            RuleType::Problem => Severity::Error,
            RuleType::Suggestion => Severity::Warning,
            RuleType::Layout => Severity::Info,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleScope {
    #[default]
    SingleFile,
    CrossFile,
}

#[derive(Debug, Clone)]
pub struct RuleMeta {
    pub id: String,
    pub number: u32,
    pub rule_type: RuleType,
    pub default_severity: Option<Severity>,
    pub url: Option<String>,
    pub description: String,
    /// Restrict the rule to certain document formats; `None` means all.
    pub file_formats: Option<Vec<DocumentFormat>>,
    pub scope: RuleScope,
}

impl RuleMeta {
    /// Build metadata, canonicalizing the rule type string. Unrecognized
    /// types default to `problem`.
    pub fn new(
        id: impl Into<String>,
        number: u32,
        rule_type: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            number,
            rule_type: RuleType::canonicalize(rule_type).unwrap_or(RuleType::Problem),
            default_severity: None,
            url: None,
            description: description.into(),
            file_formats: None,
            scope: RuleScope::default(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.default_severity = Some(severity);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_file_formats(mut self, formats: Vec<DocumentFormat>) -> Self {
        self.file_formats = Some(formats);
        self
    }

    /// Diagnostic code: `"rule-<number>-<id>"`.
    pub fn code(&self) -> String {
        format!("rule-{}-{}", self.number, self.id)
    }

    /// The severity applied when neither report nor config overrides it.
    pub fn severity(&self) -> Severity {
        self.default_severity
            .unwrap_or_else(|| self.rule_type.implied_severity())
    }

    pub fn applies_to(&self, format: DocumentFormat) -> bool {
        match &self.file_formats {
            Some(formats) => formats.contains(&format),
            None => true,
        }
    }
}

// ============================================================
// Declarative field specs
// ============================================================

/// The entity kinds a visitor can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitorKind {
    Document,
    Root,
    Info,
    Tag,
    PathItem,
    Operation,
    Component,
    Schema,
    Parameter,
    Response,
    RequestBody,
    Header,
    MediaType,
    SecurityRequirement,
    Example,
    Link,
    Callback,
    Reference,
    Project,
}

/// How strongly a declarative field is expected, with the message emitted
/// when it is absent.
#[derive(Debug, Clone)]
pub enum FieldRequirement {
    Required(String),
    Suggested(String),
    Recommended(String),
}

impl FieldRequirement {
    pub fn severity(&self) -> Severity {
        match self {
            FieldRequirement::Required(_) => Severity::Error,
            FieldRequirement::Suggested(_) => Severity::Warning,
            FieldRequirement::Recommended(_) => Severity::Info,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            FieldRequirement::Required(m)
            | FieldRequirement::Suggested(m)
            | FieldRequirement::Recommended(m) => m,
        }
    }
}

/// A declarative check: when the named field is absent on an entity of
/// the given kind, report with the requirement's severity and message.
/// Absent means a missing key, a string that trims to empty, or an empty
/// array; an explicit null is present.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub visitor: VisitorKind,
    pub field: String,
    pub requirement: FieldRequirement,
}

impl FieldSpec {
    pub fn required(visitor: VisitorKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            visitor,
            field: field.into(),
            requirement: FieldRequirement::Required(message.into()),
        }
    }

    pub fn suggested(visitor: VisitorKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            visitor,
            field: field.into(),
            requirement: FieldRequirement::Suggested(message.into()),
        }
    }

    pub fn recommended(visitor: VisitorKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            visitor,
            field: field.into(),
            requirement: FieldRequirement::Recommended(message.into()),
        }
    }
}

// ============================================================
// The rule trait
// ============================================================

/// Per-run rule state; rules downcast to their own type.
pub type RuleState = Box<dyn Any>;

/// A validation rule. Implementations override the visitor methods for
/// the entity kinds they care about; the defaults do nothing.
#[allow(unused_variables)]
pub trait Rule {
    fn meta(&self) -> &RuleMeta;

    /// Fresh state for one run; passed mutably to every visitor call.
    fn state(&self) -> RuleState {
        Box::new(())
    }

    /// Declarative field checks, merged with the imperative visitors.
    fn fields(&self) -> Vec<FieldSpec> {
        Vec::new()
    }

    fn check_document(&self, cx: &mut RuleContext, doc: &DocumentView, state: &mut RuleState) {}
    fn check_root(&self, cx: &mut RuleContext, root: &RootView, state: &mut RuleState) {}
    fn check_info(&self, cx: &mut RuleContext, info: &InfoView, state: &mut RuleState) {}
    fn check_tag(&self, cx: &mut RuleContext, tag: &TagView, state: &mut RuleState) {}
    fn check_path_item(&self, cx: &mut RuleContext, item: &PathItemView, state: &mut RuleState) {}
    fn check_operation(&self, cx: &mut RuleContext, op: &OperationView, state: &mut RuleState) {}
    fn check_component(&self, cx: &mut RuleContext, comp: &ComponentView, state: &mut RuleState) {}
    fn check_schema(&self, cx: &mut RuleContext, schema: &SchemaView, state: &mut RuleState) {}
    fn check_parameter(&self, cx: &mut RuleContext, param: &ParameterView, state: &mut RuleState) {}
    fn check_response(&self, cx: &mut RuleContext, resp: &ResponseView, state: &mut RuleState) {}
    fn check_request_body(
        &self,
        cx: &mut RuleContext,
        body: &RequestBodyView,
        state: &mut RuleState,
    ) {
    }
    fn check_header(&self, cx: &mut RuleContext, header: &HeaderView, state: &mut RuleState) {}
    fn check_media_type(&self, cx: &mut RuleContext, media: &MediaTypeView, state: &mut RuleState) {}
    fn check_security_requirement(
        &self,
        cx: &mut RuleContext,
        req: &SecurityRequirementView,
        state: &mut RuleState,
    ) {
    }
    fn check_example(&self, cx: &mut RuleContext, example: &ExampleView, state: &mut RuleState) {}
    fn check_link(&self, cx: &mut RuleContext, link: &LinkView, state: &mut RuleState) {}
    fn check_callback(&self, cx: &mut RuleContext, cb: &CallbackView, state: &mut RuleState) {}
    fn check_reference(&self, cx: &mut RuleContext, re: &ReferenceView, state: &mut RuleState) {}

    /// Fired once per run with the aggregated index, after every file's
    /// per-entity visitors complete. For aggregate checks.
    fn check_project(&self, cx: &mut RuleContext, index: &ProjectIndex, state: &mut RuleState) {}
}

// ============================================================
// Severity overrides (materialized configuration)
// ============================================================

/// Per-rule severity decision from the materialized configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSeverity {
    Off,
    Set(Severity),
}

pub type SeverityOverrides = HashMap<String, RuleSeverity>;

#[cfg(test)]
mod tests {
    use crate::diagnostics::Severity;
    use crate::runner::*;

    #[test]
    fn test_rule_type_canonicalize() {
        assert_eq!(RuleType::canonicalize("problem"), Some(RuleType::Problem));
        assert_eq!(RuleType::canonicalize("Suggestion"), Some(RuleType::Suggestion));
        assert_eq!(RuleType::canonicalize("style"), Some(RuleType::Layout));
        assert_eq!(RuleType::canonicalize("nope"), None);
    }

    #[test]
    fn test_meta_code_format() {
        let meta = RuleMeta::new("tags-required", 420, "problem", "Operations carry tags");
        assert_eq!(meta.code(), "rule-420-tags-required");
    }

    #[test]
    fn test_meta_severity_fallbacks() {
        let meta = RuleMeta::new("x", 1, "suggestion", "d");
        assert_eq!(meta.severity(), Severity::Warning);
        let meta = meta.with_severity(Severity::Hint);
        assert_eq!(meta.severity(), Severity::Hint);
    }

    #[test]
    fn test_field_requirement_severity() {
        assert_eq!(
            FieldRequirement::Required("m".into()).severity(),
            Severity::Error
        );
        assert_eq!(
            FieldRequirement::Suggested("m".into()).severity(),
            Severity::Warning
        );
        assert_eq!(
            FieldRequirement::Recommended("m".into()).severity(),
            Severity::Info
        );
    }
}
