//! Parsed document and intermediate representation.
//!
//! A [`ParsedDocument`] is an immutable bundle of raw text, content hash,
//! a plain-data value view, and an IR tree whose every node carries byte
//! offsets and a canonical JSON Pointer. The IR is the source of truth for
//! diagnostic ranges; the value view feeds schema validation and shape
//! classification.

use std::sync::OnceLock;

use std::collections::HashMap;

use serde_json::Value;

use crate::core::line_index::LineIndex;
use crate::core::pointer::{as_array_index, split_pointer};
use crate::diagnostics::Range;

// ============================================================
// Locations
// ============================================================

/// Byte offsets of a node in the raw text.
///
/// Key offsets are present only for object entries whose parser exposes
/// them; `val_start`/`val_end` default to `start`/`end` otherwise. When a
/// key range is present, `key_start < key_end <= val_start <= val_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub start: usize,
    pub end: usize,
    pub key_start: Option<usize>,
    pub key_end: Option<usize>,
    pub val_start: usize,
    pub val_end: usize,
}

impl Location {
    pub fn of_value(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            key_start: None,
            key_end: None,
            val_start: start,
            val_end: end,
        }
    }

    pub fn with_key(mut self, key_start: usize, key_end: usize) -> Self {
        self.key_start = Some(key_start);
        self.key_end = Some(key_end);
        self.start = self.start.min(key_start);
        self
    }

    /// Key range when present, otherwise the value range.
    pub fn key_span(&self) -> (usize, usize) {
        match (self.key_start, self.key_end) {
            (Some(s), Some(e)) => (s, e),
            _ => (self.val_start, self.val_end),
        }
    }
}

// ============================================================
// IR nodes
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrKind {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

/// A node of the located document tree.
///
/// `ptr` is the canonical pointer (`#` for the root); object children keep
/// source order, which rules rely on for key-ordering checks.
#[derive(Debug, Clone, PartialEq)]
pub struct IrNode {
    pub kind: IrKind,
    /// The key under which this node sits in its parent object.
    pub key: Option<String>,
    /// Leaf value for string/number/boolean/null nodes.
    pub scalar: Option<Value>,
    pub ptr: String,
    pub loc: Location,
    pub children: Vec<IrNode>,
}

impl IrNode {
    /// Look up a descendant by canonical pointer. Total for any pointer
    /// constructed during traversal of the same tree.
    pub fn find_by_pointer(&self, ptr: &str) -> Option<&IrNode> {
        let segments = split_pointer(ptr);
        let mut current = self;
        for segment in &segments {
            current = match current.kind {
                IrKind::Object => current
                    .children
                    .iter()
                    .find(|c| c.key.as_deref() == Some(segment.as_str()))?,
                IrKind::Array => {
                    let index = as_array_index(segment)?;
                    current.children.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Child of an object node by key.
    pub fn child(&self, key: &str) -> Option<&IrNode> {
        if self.kind != IrKind::Object {
            return None;
        }
        self.children.iter().find(|c| c.key.as_deref() == Some(key))
    }

    /// The string value of a leaf node.
    pub fn as_str(&self) -> Option<&str> {
        match &self.scalar {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Reconstruct the plain-data view of this subtree. Object key order
    /// follows source order.
    pub fn to_value(&self) -> Value {
        match self.kind {
            IrKind::Object => {
                let mut map = serde_json::Map::new();
                for child in &self.children {
                    if let Some(key) = &child.key {
                        map.insert(key.clone(), child.to_value());
                    }
                }
                Value::Object(map)
            }
            IrKind::Array => Value::Array(self.children.iter().map(IrNode::to_value).collect()),
            _ => self.scalar.clone().unwrap_or(Value::Null),
        }
    }

    /// Depth-first walk over this subtree, parents before children.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a IrNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

// ============================================================
// Parsed documents
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    /// JSON with comments and trailing commas permitted.
    Jsonc,
}

impl DocumentFormat {
    /// Detect the format from a URI's extension; unknown extensions are
    /// treated as YAML, which is a superset of JSON for our purposes.
    pub fn detect(uri: &str) -> Self {
        let lower = uri.to_ascii_lowercase();
        if lower.ends_with(".json") {
            DocumentFormat::Json
        } else if lower.ends_with(".jsonc") {
            DocumentFormat::Jsonc
        } else {
            DocumentFormat::Yaml
        }
    }

    pub fn is_json_family(self) -> bool {
        matches!(self, DocumentFormat::Json | DocumentFormat::Jsonc)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Yaml => write!(f, "yaml"),
            DocumentFormat::Json => write!(f, "json"),
            DocumentFormat::Jsonc => write!(f, "jsonc"),
        }
    }
}

/// A duplicate mapping key found while parsing YAML. The first occurrence
/// wins in the IR; duplicates are recorded for rules to surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    /// Pointer of the enclosing object.
    pub parent_ptr: String,
    pub key: String,
    pub loc: Location,
}

/// The first parser error of a malformed document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub message: String,
    pub range: Range,
}

/// Immutable bundle produced by the loader.
#[derive(Debug)]
pub struct ParsedDocument {
    pub uri: String,
    pub raw_text: String,
    /// SHA-1 over the raw bytes, hex encoded. Stable across identical bytes.
    pub hash: String,
    /// Host-reported modification time in milliseconds.
    pub mtime: u64,
    pub format: DocumentFormat,
    /// `None` when the document failed to parse.
    pub ir: Option<IrNode>,
    /// Plain-data view of the IR (`Null` on parse failure).
    pub value: Value,
    pub duplicate_keys: Vec<DuplicateKey>,
    pub parse_error: Option<ParseFailure>,
    /// Pointer -> location table built at load time.
    source_map: HashMap<String, Location>,
    line_index: OnceLock<LineIndex>,
}

impl ParsedDocument {
    pub fn new(
        uri: impl Into<String>,
        raw_text: String,
        hash: String,
        mtime: u64,
        format: DocumentFormat,
        ir: Option<IrNode>,
        duplicate_keys: Vec<DuplicateKey>,
        parse_error: Option<ParseFailure>,
    ) -> Self {
        let value = ir.as_ref().map(IrNode::to_value).unwrap_or(Value::Null);
        let mut source_map = HashMap::new();
        if let Some(root) = &ir {
            root.walk(&mut |node| {
                source_map.insert(node.ptr.clone(), node.loc);
            });
        }
        Self {
            uri: uri.into(),
            raw_text,
            hash,
            mtime,
            format,
            ir,
            value,
            duplicate_keys,
            parse_error,
            source_map,
            line_index: OnceLock::new(),
        }
    }

    /// Line offsets, computed on first request and retained.
    pub fn line_index(&self) -> &LineIndex {
        self.line_index.get_or_init(|| LineIndex::new(&self.raw_text))
    }

    /// Translate a byte-offset pair into a line/character range.
    pub fn offset_range(&self, start: usize, end: usize) -> Range {
        self.line_index().range(start, end)
    }

    /// Source-map lookup: the recorded location of a pointer, if any.
    pub fn pointer_location(&self, ptr: &str) -> Option<Location> {
        self.source_map.get(ptr).copied()
    }

    /// The value range of a pointer as line/character positions.
    pub fn pointer_to_range(&self, ptr: &str) -> Option<Range> {
        let loc = self.pointer_location(ptr)?;
        Some(self.offset_range(loc.val_start, loc.val_end))
    }

    /// True when the top level carries `openapi` or `swagger`.
    pub fn has_root_marker(&self) -> bool {
        match &self.ir {
            Some(root) => root.child("openapi").is_some() || root.child("swagger").is_some(),
            None => false,
        }
    }

    /// IR node at a pointer, when the document parsed.
    pub fn node_at(&self, ptr: &str) -> Option<&IrNode> {
        self.ir.as_ref()?.find_by_pointer(ptr)
    }
}
