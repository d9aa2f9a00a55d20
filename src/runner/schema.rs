//! JSON-Schema validation as a rule backend.
//!
//! Rules that wrap a JSON Schema hand it here: the schema compiles once
//! (memoized by SHA-1 of its serialization, draft detected from
//! `$schema`, draft-07 by default), every validation error converts to a
//! message plus a source range resolved against the document IR -
//! `required` errors anchor at the object's first key, unexpected
//! properties at the offending key, value errors at the value, with
//! parent / root / `(0:0)` fallbacks.

use std::sync::Arc;

use jsonschema::{Draft, ValidationError, error::ValidationErrorKind};
use serde_json::Value;

use crate::core::cache::SchemaValidatorCache;
use crate::core::document::ParsedDocument;
use crate::core::loader::hash_text;
use crate::core::pointer::normalize_pointer;
use crate::diagnostics::{Range, RangePrecision};

/// A schema failed to compile; surfaces as one
/// `schema-compilation-error` diagnostic at `(0:0)`.
#[derive(Debug, Clone)]
pub struct SchemaCompileError {
    pub message: String,
}

/// One translated validator error.
#[derive(Debug, Clone)]
pub struct SchemaDiagnostic {
    pub message: String,
    pub pointer: String,
    pub range: Range,
    pub precision: RangePrecision,
}

/// Validate the value at `base_ptr` of `doc` against `schema`.
pub fn validate_against_schema(
    schema: &Value,
    doc: &ParsedDocument,
    base_ptr: &str,
    cache: &mut SchemaValidatorCache,
) -> Result<Vec<SchemaDiagnostic>, SchemaCompileError> {
    let validator = compile_schema(schema, cache)?;
    let base = normalize_pointer(base_ptr);
    let data = match doc.node_at(&base) {
        Some(node) => node.to_value(),
        None => return Ok(Vec::new()),
    };

    let mut diagnostics = Vec::new();
    for error in validator.iter_errors(&data) {
        diagnostics.push(translate_error(&error, doc, &base));
    }
    Ok(diagnostics)
}

/// Compile a schema, memoized by SHA-1 of its serialized form.
pub fn compile_schema(
    schema: &Value,
    cache: &mut SchemaValidatorCache,
) -> Result<Arc<jsonschema::Validator>, SchemaCompileError> {
    let serialized = serde_json::to_string(schema).unwrap_or_default();
    let key = hash_text(&serialized);
    if let Some(validator) = cache.get(&key) {
        return Ok(validator);
    }
    let draft = detect_draft(schema);
    let validator = jsonschema::options()
        .with_draft(draft)
        .build(schema)
        .map_err(|err| SchemaCompileError {
            message: err.to_string(),
        })?;
    let validator = Arc::new(validator);
    cache.insert(key, validator.clone());
    Ok(validator)
}

/// Detect the draft from `$schema`; draft-07 when absent or unknown.
fn detect_draft(schema: &Value) -> Draft {
    match schema.get("$schema").and_then(Value::as_str) {
        Some(s) if s.contains("draft-04") => Draft::Draft4,
        Some(s) if s.contains("draft-06") => Draft::Draft6,
        Some(s) if s.contains("draft-07") => Draft::Draft7,
        Some(s) if s.contains("2019-09") => Draft::Draft201909,
        Some(s) if s.contains("2020-12") => Draft::Draft202012,
        _ => Draft::Draft7,
    }
}

fn translate_error(
    error: &ValidationError<'_>,
    doc: &ParsedDocument,
    base: &str,
) -> SchemaDiagnostic {
    // The instance path is RFC 6901 relative to the validated value;
    // appending it to the base pointer addresses the document node.
    let instance_path = error.instance_path.to_string();
    let pointer = if instance_path.is_empty() {
        base.to_string()
    } else {
        format!("{}{}", base, instance_path)
    };

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let property = property.as_str().map(String::from).unwrap_or_else(|| property.to_string());
            let (range, precision) = first_key_range(doc, &pointer);
            SchemaDiagnostic {
                message: format!("Missing required property \"{}\".", property),
                pointer,
                range,
                precision,
            }
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            let property = unexpected.first().cloned().unwrap_or_default();
            let (range, precision) = child_key_range(doc, &pointer, &property);
            SchemaDiagnostic {
                message: format!("Property \"{}\" is not allowed.", property),
                pointer,
                range,
                precision,
            }
        }
        ValidationErrorKind::Format { format } => {
            let (range, precision) = value_range(doc, &pointer);
            SchemaDiagnostic {
                message: friendly_format_message(format),
                pointer,
                range,
                precision,
            }
        }
        _ => {
            let (range, precision) = value_range(doc, &pointer);
            SchemaDiagnostic {
                message: error.to_string(),
                pointer,
                range,
                precision,
            }
        }
    }
}

/// The first key of the object at `pointer`; falls back to the object's
/// own key, then the document root, then `(0:0)`.
fn first_key_range(doc: &ParsedDocument, pointer: &str) -> (Range, RangePrecision) {
    if let Some(node) = doc.node_at(pointer) {
        if let Some(first) = node.children.first() {
            let (start, end) = first.loc.key_span();
            return (doc.offset_range(start, end), RangePrecision::FirstChild);
        }
        if node.loc.key_start.is_some() {
            let (start, end) = node.loc.key_span();
            return (doc.offset_range(start, end), RangePrecision::Key);
        }
    }
    fallback_range(doc, pointer)
}

/// The key range of a named child of the object at `pointer`.
fn child_key_range(doc: &ParsedDocument, pointer: &str, key: &str) -> (Range, RangePrecision) {
    if let Some(node) = doc.node_at(pointer)
        && let Some(child) = node.child(key)
    {
        let (start, end) = child.loc.key_span();
        return (doc.offset_range(start, end), RangePrecision::Key);
    }
    fallback_range(doc, pointer)
}

/// The value range at `pointer`, with parent / root / zero fallbacks.
fn value_range(doc: &ParsedDocument, pointer: &str) -> (Range, RangePrecision) {
    if let Some(node) = doc.node_at(pointer) {
        return (
            doc.offset_range(node.loc.val_start, node.loc.val_end),
            RangePrecision::Exact,
        );
    }
    fallback_range(doc, pointer)
}

fn fallback_range(doc: &ParsedDocument, pointer: &str) -> (Range, RangePrecision) {
    let mut cursor = crate::core::pointer::parent_pointer(pointer);
    while let Some(ptr) = cursor {
        if let Some(node) = doc.node_at(&ptr) {
            let (start, end) = node.loc.key_span();
            return (doc.offset_range(start, end), RangePrecision::Parent);
        }
        cursor = crate::core::pointer::parent_pointer(&ptr);
    }
    if let Some(root) = &doc.ir {
        return (
            doc.offset_range(root.loc.start, root.loc.start),
            RangePrecision::Fallback,
        );
    }
    (Range::zero(), RangePrecision::Fallback)
}

/// Friendly phrasing for known format keywords.
fn friendly_format_message(format: &str) -> String {
    let noun = match format {
        "email" => "a valid email address",
        "uri" => "a valid URI",
        "uri-reference" => "a valid URI reference",
        "uuid" => "a valid UUID",
        "date" => "a valid date (YYYY-MM-DD)",
        "date-time" => "a valid RFC 3339 date-time",
        "time" => "a valid time",
        "ipv4" => "a valid IPv4 address",
        "ipv6" => "a valid IPv6 address",
        "hostname" => "a valid hostname",
        "regex" => "a valid regular expression",
        other => return format!("Value does not match format \"{}\".", other),
    };
    format!("Value must be {}.", noun)
}

#[cfg(test)]
mod tests {
    use crate::core::cache::SchemaValidatorCache;
    use crate::core::document::DocumentFormat;
    use crate::core::loader::parse_document;
    use crate::diagnostics::RangePrecision;
    use crate::runner::schema::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn doc_of(raw: &str) -> crate::core::document::ParsedDocument {
        parse_document("data.yaml", raw.to_string(), DocumentFormat::Yaml, 0)
    }

    #[test]
    fn test_required_error_anchors_first_key() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        });
        let doc = doc_of("age: 3\n");
        let mut cache = SchemaValidatorCache::default();
        let diags = validate_against_schema(&schema, &doc, "#", &mut cache).unwrap();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("\"name\""));
        assert_eq!(diags[0].precision, RangePrecision::FirstChild);
        // Anchored at the `age` key.
        assert_eq!(diags[0].range.start.line, 0);
        assert_eq!(diags[0].range.start.character, 0);
        assert_eq!(diags[0].range.end.character, 3);
    }

    #[test]
    fn test_additional_property_points_at_offending_key() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": false
        });
        let doc = doc_of("name: x\nextra: y\n");
        let mut cache = SchemaValidatorCache::default();
        let diags = validate_against_schema(&schema, &doc, "#", &mut cache).unwrap();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("\"extra\""));
        assert_eq!(diags[0].range.start.line, 1);
        assert_eq!(diags[0].range.start.character, 0);
    }

    #[test]
    fn test_type_error_points_at_value() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {"count": {"type": "integer"}}
        });
        let doc = doc_of("count: nope\n");
        let mut cache = SchemaValidatorCache::default();
        let diags = validate_against_schema(&schema, &doc, "#", &mut cache).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].pointer, "#/count");
        assert_eq!(diags[0].precision, RangePrecision::Exact);
        assert_eq!(diags[0].range.start.character, 7);
    }

    #[test]
    fn test_nested_instance_path() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "pet": {
                    "type": "object",
                    "properties": {"age": {"type": "integer"}}
                }
            }
        });
        let doc = doc_of("pet:\n  age: kitten\n");
        let mut cache = SchemaValidatorCache::default();
        let diags = validate_against_schema(&schema, &doc, "#", &mut cache).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].pointer, "#/pet/age");
        assert_eq!(diags[0].range.start.line, 1);
    }

    #[test]
    fn test_all_errors_collected() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "string"},
                "c": {"type": "integer"}
            }
        });
        let doc = doc_of("c: text\n");
        let mut cache = SchemaValidatorCache::default();
        let diags = validate_against_schema(&schema, &doc, "#", &mut cache).unwrap();
        // Two required + one type.
        assert_eq!(diags.len(), 3);
    }

    #[test]
    fn test_validator_memoized_by_schema_hash() {
        let schema = serde_json::json!({"type": "object"});
        let mut cache = SchemaValidatorCache::default();
        let first = compile_schema(&schema, &mut cache).unwrap();
        let second = compile_schema(&schema, &mut cache).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let other = serde_json::json!({"type": "array"});
        compile_schema(&other, &mut cache).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_compile_error_reported() {
        let schema = serde_json::json!({"type": "not-a-type"});
        let mut cache = SchemaValidatorCache::default();
        let doc = doc_of("a: 1\n");
        let result = validate_against_schema(&schema, &doc, "#", &mut cache);
        assert!(result.is_err());
    }

    #[test]
    fn test_friendly_format_messages() {
        assert!(friendly_format_message("email").contains("email address"));
        assert!(friendly_format_message("date-time").contains("RFC 3339"));
        assert!(friendly_format_message("ipv4").contains("IPv4"));
        assert!(friendly_format_message("custom-thing").contains("custom-thing"));
    }
}
