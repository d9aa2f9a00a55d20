//! Document type classification: root, partial, or unknown.
//!
//! A root document carries `openapi` or `swagger` at its top level. A
//! partial is a recognizable OpenAPI fragment referenced via `$ref` -
//! a bare operation, schema, parameter, path item, components slice, or
//! `paths` slice. Everything else is unknown and never linted.

use crate::core::document::{IrKind, IrNode, ParsedDocument};

pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// HTTP method keys valid under a path item, including the 3.2 `query`.
pub fn is_http_method(key: &str, allow_query: bool) -> bool {
    HTTP_METHODS.contains(&key) || (allow_query && key == "query")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Root,
    Partial,
    Unknown,
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentType::Root => write!(f, "root"),
            DocumentType::Partial => write!(f, "partial"),
            DocumentType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Classify a parsed document. Documents with parse errors are unknown.
pub fn classify(doc: &ParsedDocument) -> DocumentType {
    if doc.parse_error.is_some() {
        return DocumentType::Unknown;
    }
    let Some(root) = &doc.ir else {
        return DocumentType::Unknown;
    };
    if root.kind != IrKind::Object {
        return DocumentType::Unknown;
    }
    if root.child("openapi").is_some() || root.child("swagger").is_some() {
        return DocumentType::Root;
    }
    if is_partial_document(root) {
        return DocumentType::Partial;
    }
    DocumentType::Unknown
}

/// Recognize the shapes real OpenAPI fragments take: bare operations,
/// schemas, parameters, path items, components maps, and `paths` slices.
pub fn is_partial_document(root: &IrNode) -> bool {
    // Document slices.
    if root.child("paths").is_some()
        || root.child("components").is_some()
        || root.child("definitions").is_some()
    {
        return true;
    }
    // A bare reference file.
    if root.child("$ref").is_some() {
        return true;
    }
    // A bare path item: any HTTP method key at the top level.
    if root
        .children
        .iter()
        .any(|c| c.key.as_deref().is_some_and(|k| is_http_method(k, true)))
    {
        return true;
    }
    // A bare operation.
    if root.child("responses").is_some() {
        return true;
    }
    // A bare parameter.
    if root.child("in").is_some() && root.child("name").is_some() {
        return true;
    }
    // A bare schema.
    if SCHEMA_MARKERS.iter().any(|k| root.child(k).is_some()) {
        return true;
    }
    // A bare components map: every entry is an object and at least one
    // has a recognizable entity shape.
    if !root.children.is_empty()
        && root.children.iter().all(|c| c.kind == IrKind::Object)
        && root.children.iter().any(looks_like_entity)
    {
        return true;
    }
    false
}

/// Keys that mark an object as a schema.
pub const SCHEMA_MARKERS: &[&str] = &[
    "type",
    "properties",
    "allOf",
    "oneOf",
    "anyOf",
    "items",
    "additionalProperties",
    "patternProperties",
];

pub fn has_schema_shape(node: &IrNode) -> bool {
    node.kind == IrKind::Object && SCHEMA_MARKERS.iter().any(|k| node.child(k).is_some())
}

fn looks_like_entity(node: &IrNode) -> bool {
    if has_schema_shape(node) || node.child("$ref").is_some() {
        return true;
    }
    if node.child("responses").is_some() {
        return true;
    }
    if node.child("in").is_some() && node.child("name").is_some() {
        return true;
    }
    node.children
        .iter()
        .any(|c| c.key.as_deref().is_some_and(|k| is_http_method(k, true)))
}
