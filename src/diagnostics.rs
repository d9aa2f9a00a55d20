//! Diagnostic and file-patch types.
//!
//! These are the engine's only outputs: every abnormal condition surfaces
//! as a [`Diagnostic`], and every auto-fix as a [`FilePatch`] of RFC 6902
//! operations. Nothing here depends on the transport layer; an LSP server
//! or CLI reporter consumes these as-is.

use serde::{Deserialize, Serialize, Serializer};

/// Diagnostic source string attached to every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "telescope";

// ============================================================
// Positions and ranges
// ============================================================

/// A 0-based line / byte-column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// The `(0:0)` position used by fallback ranges.
    pub fn zero() -> Self {
        Self { line: 0, character: 0 }
    }
}

/// A half-open source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// The `(0:0, 0:0)` range used when no better location is known.
    pub fn zero() -> Self {
        Self {
            start: Position::zero(),
            end: Position::zero(),
        }
    }
}

// ============================================================
// Severity
// ============================================================

/// Diagnostic severity. Serializes to the numeric LSP encoding
/// (error = 1 .. hint = 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Numeric LSP encoding.
    pub fn to_number(self) -> u8 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }

    /// Parse the string form used by configuration files and rule specs.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            "info" | "information" => Some(Severity::Info),
            "hint" => Some(Severity::Hint),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_number())
    }
}

// ============================================================
// Range precision
// ============================================================

/// How precisely a diagnostic range matched the reported field.
///
/// `report_at` degrades gracefully when a field is absent; the precision
/// records which fallback level produced the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangePrecision {
    /// The exact value range of the addressed field.
    Exact,
    /// The key range of the addressed field.
    Key,
    /// The key range of an enclosing node (the field itself is absent).
    Parent,
    /// The first child key of the nearest existing object.
    FirstChild,
    /// `(0:0, 0:0)` - nothing better was available.
    Fallback,
}

// ============================================================
// Diagnostic
// ============================================================

/// A link to the rule's documentation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
    pub href: String,
}

/// A secondary location related to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInformation {
    pub uri: String,
    pub range: Range,
    pub message: String,
}

/// A suggested fix: a title plus the patches that implement it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub fix: Vec<FilePatch>,
}

/// A single validation finding against a precise source range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// `"rule-<number>-<id>"` for rule diagnostics, or an engine-level
    /// code such as `"parse-error"`.
    pub code: String,
    pub message: String,
    pub uri: String,
    pub range: Range,
    pub severity: Severity,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_description: Option<CodeDescription>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related_information: Vec<RelatedInformation>,
    pub range_precision: RangePrecision,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggest: Vec<Suggestion>,
}

impl Diagnostic {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        uri: impl Into<String>,
        range: Range,
        severity: Severity,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            uri: uri.into(),
            range,
            severity,
            source: DIAGNOSTIC_SOURCE.to_string(),
            code_description: None,
            related_information: Vec::new(),
            range_precision: RangePrecision::Exact,
            suggest: Vec::new(),
        }
    }

    pub fn with_precision(mut self, precision: RangePrecision) -> Self {
        self.range_precision = precision;
        self
    }
}

// ============================================================
// File patches
// ============================================================

/// A single RFC 6902 operation. `path` is a canonical JSON Pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: serde_json::Value },
    Remove { path: String },
    Replace { path: String, value: serde_json::Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. } => path,
            PatchOp::Remove { path } => path,
            PatchOp::Replace { path, .. } => path,
        }
    }
}

/// A set of patch operations against one document. Consumers apply the
/// operations in listed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    pub uri: String,
    pub ops: Vec<PatchOp>,
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_severity_numbers() {
        assert_eq!(Severity::Error.to_number(), 1);
        assert_eq!(Severity::Warning.to_number(), 2);
        assert_eq!(Severity::Info.to_number(), 3);
        assert_eq!(Severity::Hint.to_number(), 4);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("error"), Some(Severity::Error));
        assert_eq!(Severity::parse("warn"), Some(Severity::Warning));
        assert_eq!(Severity::parse("warning"), Some(Severity::Warning));
        assert_eq!(Severity::parse("hint"), Some(Severity::Hint));
        assert_eq!(Severity::parse("off"), None);
    }

    #[test]
    fn test_severity_serializes_numeric() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn test_diagnostic_defaults() {
        let diag = Diagnostic::new(
            "rule-420-tags-required",
            "Operations must have at least one tag.",
            "api.yaml",
            Range::zero(),
            Severity::Error,
        );
        assert_eq!(diag.source, "telescope");
        assert_eq!(diag.range_precision, RangePrecision::Exact);
        assert!(diag.suggest.is_empty());
    }

    #[test]
    fn test_patch_op_serialization() {
        let op = PatchOp::Add {
            path: "#/paths/~1x/get/operationId".to_string(),
            value: serde_json::json!("listUsers"),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "add");
        assert_eq!(json["path"], "#/paths/~1x/get/operationId");
        assert_eq!(json["value"], "listUsers");
    }

    #[test]
    fn test_range_zero() {
        let range = Range::zero();
        assert_eq!(range.start, Position { line: 0, character: 0 });
        assert_eq!(range.end, Position { line: 0, character: 0 });
    }
}
