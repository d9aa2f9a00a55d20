//! Document loading: YAML/JSON text to a [`ParsedDocument`].
//!
//! YAML is parsed through `yaml-rust2`'s marked event stream so every node
//! carries its source marker; value end offsets are recovered from the raw
//! text (quoted scalars scan to the closing quote, plain scalars to the
//! end of their first line minus trailing comments). JSON goes through
//! `jsonc-parser`, which reports byte ranges directly; comments and
//! trailing commas are permitted only for the `jsonc` format.
//!
//! The loader never fails on malformed input: parse errors produce a
//! document with `ir = None` and a recorded [`ParseFailure`]. IO errors are
//! the host's business and propagate from the call sites that read.

use std::collections::HashMap;

use serde_json::Value;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use crate::core::document::{
    DocumentFormat, DuplicateKey, IrKind, IrNode, Location, ParseFailure, ParsedDocument,
};
use crate::core::line_index::LineIndex;
use crate::core::pointer::{join_index, join_pointer};

/// SHA-1 over the raw bytes, hex encoded.
pub fn hash_text(text: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse `raw_text`, detecting the format from the URI extension.
pub fn load_document(uri: &str, raw_text: String, mtime: u64) -> ParsedDocument {
    let format = DocumentFormat::detect(uri);
    parse_document(uri, raw_text, format, mtime)
}

/// Parse `raw_text` as the given format.
pub fn parse_document(
    uri: &str,
    raw_text: String,
    format: DocumentFormat,
    mtime: u64,
) -> ParsedDocument {
    let hash = hash_text(&raw_text);
    let parsed = match format {
        DocumentFormat::Yaml => parse_yaml(&raw_text),
        DocumentFormat::Json | DocumentFormat::Jsonc => {
            parse_json(&raw_text, format == DocumentFormat::Jsonc)
        }
    };
    match parsed {
        Ok(ParsedTree { ir, duplicate_keys }) => ParsedDocument::new(
            uri,
            raw_text,
            hash,
            mtime,
            format,
            ir,
            duplicate_keys,
            None,
        ),
        Err(failure) => ParsedDocument::new(
            uri,
            raw_text,
            hash,
            mtime,
            format,
            None,
            Vec::new(),
            Some(failure),
        ),
    }
}

struct ParsedTree {
    ir: Option<IrNode>,
    duplicate_keys: Vec<DuplicateKey>,
}

// ============================================================
// YAML
// ============================================================

#[derive(Default)]
struct EventSink {
    events: Vec<(Event, Marker)>,
}

impl MarkedEventReceiver for EventSink {
    fn on_event(&mut self, event: Event, marker: Marker) {
        self.events.push((event, marker));
    }
}

fn parse_yaml(raw: &str) -> Result<ParsedTree, ParseFailure> {
    if raw.trim().is_empty() {
        return Ok(ParsedTree {
            ir: None,
            duplicate_keys: Vec::new(),
        });
    }
    let mut sink = EventSink::default();
    let mut parser = Parser::new_from_str(raw);
    if let Err(err) = parser.load(&mut sink, false) {
        let marker = *err.marker();
        let line_index = LineIndex::new(raw);
        let offset = char_to_byte(raw, marker.index());
        return Err(ParseFailure {
            message: err.to_string(),
            range: line_index.range(offset, offset),
        });
    }

    // Marker indices count characters; convert to byte offsets up front.
    let char_table = build_char_table(raw);
    let events: Vec<(Event, usize)> = sink
        .events
        .into_iter()
        .map(|(event, marker)| {
            let offset = match &char_table {
                Some(table) => table.get(marker.index()).copied().unwrap_or(raw.len()),
                None => marker.index().min(raw.len()),
            };
            (event, offset)
        })
        .collect();

    let mut builder = YamlIrBuilder {
        raw,
        events,
        pos: 0,
        flow_depth: 0,
        anchors: HashMap::new(),
        duplicates: Vec::new(),
    };
    let ir = builder.build();
    Ok(ParsedTree {
        ir,
        duplicate_keys: builder.duplicates,
    })
}

/// Char-index to byte-offset table; `None` for ASCII text where the two
/// coincide.
fn build_char_table(raw: &str) -> Option<Vec<usize>> {
    if raw.is_ascii() {
        return None;
    }
    let mut table: Vec<usize> = raw.char_indices().map(|(i, _)| i).collect();
    table.push(raw.len());
    Some(table)
}

fn char_to_byte(raw: &str, char_index: usize) -> usize {
    if raw.is_ascii() {
        return char_index.min(raw.len());
    }
    raw.char_indices()
        .map(|(i, _)| i)
        .nth(char_index)
        .unwrap_or(raw.len())
}

struct YamlIrBuilder<'a> {
    raw: &'a str,
    events: Vec<(Event, usize)>,
    pos: usize,
    /// Depth of enclosing flow (`[...]` / `{...}`) collections.
    flow_depth: usize,
    anchors: HashMap<usize, IrNode>,
    duplicates: Vec<DuplicateKey>,
}

impl<'a> YamlIrBuilder<'a> {
    fn build(&mut self) -> Option<IrNode> {
        // Skip StreamStart / DocumentStart framing.
        while self.pos < self.events.len() {
            match self.events[self.pos].0 {
                Event::StreamStart | Event::DocumentStart => self.pos += 1,
                Event::StreamEnd => return None,
                _ => break,
            }
        }
        if self.pos >= self.events.len() {
            return None;
        }
        self.build_node("#".to_string(), None, None)
    }

    fn next_event(&mut self) -> Option<(Event, usize)> {
        let item = self.events.get(self.pos).cloned();
        self.pos += 1;
        item
    }

    /// Offset of the upcoming event, used to cap scalar end scans.
    fn peek_offset(&self) -> usize {
        self.events
            .get(self.pos)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.raw.len())
    }

    fn build_node(
        &mut self,
        ptr: String,
        key: Option<String>,
        key_span: Option<(usize, usize)>,
    ) -> Option<IrNode> {
        let (event, start) = self.next_event()?;
        let node = match event {
            Event::Scalar(value, style, anchor_id, _) => {
                let end = self.scalar_end(start, style);
                let (kind, scalar) = resolve_scalar(&value, style);
                let node = IrNode {
                    kind,
                    key: None,
                    scalar: Some(scalar),
                    ptr,
                    loc: Location::of_value(start, end),
                    children: Vec::new(),
                };
                self.remember_anchor(anchor_id, &node);
                node
            }
            Event::SequenceStart(anchor_id, _) => {
                let node = self.build_sequence(start, ptr)?;
                self.remember_anchor(anchor_id, &node);
                node
            }
            Event::MappingStart(anchor_id, _) => {
                let node = self.build_mapping(start, ptr)?;
                self.remember_anchor(anchor_id, &node);
                node
            }
            Event::Alias(anchor_id) => {
                let template = self.anchors.get(&anchor_id).cloned()?;
                repoint(template, &ptr)
            }
            _ => return None,
        };
        Some(finish_entry(node, key, key_span))
    }

    fn build_sequence(&mut self, start: usize, ptr: String) -> Option<IrNode> {
        let in_flow = self.raw.as_bytes().get(start) == Some(&b'[');
        if in_flow {
            self.flow_depth += 1;
        }
        let mut children = Vec::new();
        loop {
            match self.events.get(self.pos) {
                Some((Event::SequenceEnd, end_offset)) => {
                    let end_offset = *end_offset;
                    self.pos += 1;
                    if in_flow {
                        self.flow_depth -= 1;
                    }
                    let end = self.container_end(start, &children, in_flow, end_offset, b']');
                    return Some(IrNode {
                        kind: IrKind::Array,
                        key: None,
                        scalar: None,
                        ptr,
                        loc: Location::of_value(start, end),
                        children,
                    });
                }
                Some(_) => {
                    let child_ptr = join_index(&ptr, children.len());
                    let child = self.build_node(child_ptr, None, None)?;
                    children.push(child);
                }
                None => return None,
            }
        }
    }

    fn build_mapping(&mut self, start: usize, ptr: String) -> Option<IrNode> {
        let in_flow = self.raw.as_bytes().get(start) == Some(&b'{');
        if in_flow {
            self.flow_depth += 1;
        }
        let mut children: Vec<IrNode> = Vec::new();
        loop {
            match self.events.get(self.pos) {
                Some((Event::MappingEnd, end_offset)) => {
                    let end_offset = *end_offset;
                    self.pos += 1;
                    if in_flow {
                        self.flow_depth -= 1;
                    }
                    let end = self.container_end(start, &children, in_flow, end_offset, b'}');
                    return Some(IrNode {
                        kind: IrKind::Object,
                        key: None,
                        scalar: None,
                        ptr,
                        loc: Location::of_value(start, end),
                        children,
                    });
                }
                Some(_) => {
                    // Key node: scalar keys become entry keys; non-scalar
                    // keys are built and discarded along with their values.
                    let (key_event, key_start) = self.next_event()?;
                    let key_text = match key_event {
                        Event::Scalar(value, style, _, _) => {
                            let key_end = self.scalar_end(key_start, style);
                            Some((value, key_start, key_end))
                        }
                        Event::SequenceStart(..) | Event::MappingStart(..) => {
                            // Rewind so the discard walk sees the container.
                            self.pos -= 1;
                            let _ = self.build_node("#".to_string(), None, None);
                            None
                        }
                        _ => None,
                    };
                    let Some((key_text, key_start, key_end)) = key_text else {
                        let _ = self.build_node("#".to_string(), None, None);
                        continue;
                    };

                    let duplicate = children
                        .iter()
                        .any(|c| c.key.as_deref() == Some(key_text.as_str()));
                    let child_ptr = join_pointer(&ptr, &key_text);
                    let child = self.build_node(
                        child_ptr,
                        Some(key_text.clone()),
                        Some((key_start, key_end)),
                    )?;
                    if duplicate {
                        // First occurrence wins; record the duplicate key.
                        self.duplicates.push(DuplicateKey {
                            parent_ptr: ptr.clone(),
                            key: key_text,
                            loc: Location::of_value(key_start, key_end),
                        });
                    } else {
                        children.push(child);
                    }
                }
                None => return None,
            }
        }
    }

    fn container_end(
        &self,
        start: usize,
        children: &[IrNode],
        in_flow: bool,
        end_event_offset: usize,
        closer: u8,
    ) -> usize {
        let content_end = children.iter().map(|c| c.loc.end).max().unwrap_or(start);
        if in_flow {
            // Scan forward for the closing bracket.
            let bytes = self.raw.as_bytes();
            let scan_to = end_event_offset.min(self.raw.len()).max(content_end);
            for i in content_end..=scan_to.min(self.raw.len().saturating_sub(1)) {
                if bytes[i] == closer {
                    return i + 1;
                }
            }
            (end_event_offset + 1).min(self.raw.len())
        } else if children.is_empty() {
            start
        } else {
            content_end
        }
    }

    fn scalar_end(&self, start: usize, style: TScalarStyle) -> usize {
        let raw = self.raw;
        let bytes = raw.as_bytes();
        let cap = self.peek_offset().clamp(start, raw.len());
        match style {
            TScalarStyle::DoubleQuoted => {
                let mut i = start + 1;
                while i < raw.len() {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b'"' => return i + 1,
                        _ => i += 1,
                    }
                }
                cap
            }
            TScalarStyle::SingleQuoted => {
                let mut i = start + 1;
                while i < raw.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                        } else {
                            return i + 1;
                        }
                    } else {
                        i += 1;
                    }
                }
                cap
            }
            TScalarStyle::Literal | TScalarStyle::Folded => {
                let span = &raw[start..cap];
                start + span.trim_end().len()
            }
            _ => {
                if start >= raw.len() {
                    return start;
                }
                let span = &raw[start..cap];
                let line = match span.find('\n') {
                    Some(idx) => &span[..idx],
                    None => span,
                };
                let line = cut_trailing_comment(line);
                let line = cut_key_separator(line);
                let line = if self.flow_depth > 0 {
                    cut_flow_terminators(line)
                } else {
                    line
                };
                let trimmed = line.trim_end();
                start + trimmed.len()
            }
        }
    }

    fn remember_anchor(&mut self, anchor_id: usize, node: &IrNode) {
        if anchor_id != 0 {
            self.anchors.insert(anchor_id, node.clone());
        }
    }
}

/// Attach the entry key and key span onto a freshly built node.
fn finish_entry(mut node: IrNode, key: Option<String>, key_span: Option<(usize, usize)>) -> IrNode {
    node.key = key;
    if let Some((key_start, key_end)) = key_span {
        node.loc = node.loc.with_key(key_start, key_end);
    }
    node
}

/// Clone an anchored subtree under a new pointer, recomputing every
/// descendant pointer.
fn repoint(mut node: IrNode, new_ptr: &str) -> IrNode {
    node.ptr = new_ptr.to_string();
    let kind = node.kind;
    let children = std::mem::take(&mut node.children);
    node.children = children
        .into_iter()
        .enumerate()
        .map(|(index, child)| {
            let child_ptr = match (kind, &child.key) {
                (IrKind::Object, Some(key)) => join_pointer(new_ptr, key),
                _ => join_index(new_ptr, index),
            };
            repoint(child, &child_ptr)
        })
        .collect();
    node
}

/// Cut a trailing ` # comment` from a plain-scalar line. A `#` not
/// preceded by whitespace is part of the scalar.
fn cut_trailing_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i] == b'#' && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

/// Cut a `: ` mapping separator that leaks into a key scalar's scan. A
/// plain scalar cannot contain `:` followed by whitespace, so the first
/// such colon (or a trailing one) always terminates the scalar.
fn cut_key_separator(line: &str) -> &str {
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b':'
            && (i + 1 == bytes.len() || bytes[i + 1].is_ascii_whitespace())
        {
            return &line[..i];
        }
    }
    line
}

/// Cut flow terminators (`,`, `}`, `]`) that leak into a plain-scalar scan
/// inside flow collections. In block context the cap already stops at the
/// next line, so genuine commas in values survive.
fn cut_flow_terminators(line: &str) -> &str {
    match line.find(|c| matches!(c, ',' | '}' | ']')) {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// YAML core-schema scalar resolution. Quoted and block scalars are
/// strings; plain scalars resolve null/bool/int/float.
fn resolve_scalar(value: &str, style: TScalarStyle) -> (IrKind, Value) {
    if style != TScalarStyle::Plain {
        return (IrKind::String, Value::String(value.to_string()));
    }
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return (IrKind::Null, Value::Null),
        "true" | "True" | "TRUE" => return (IrKind::Boolean, Value::Bool(true)),
        "false" | "False" | "FALSE" => return (IrKind::Boolean, Value::Bool(false)),
        _ => {}
    }
    if let Ok(int) = value.parse::<i64>() {
        return (IrKind::Number, Value::Number(int.into()));
    }
    if !value.is_empty()
        && let Ok(float) = value.parse::<f64>()
        && float.is_finite()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return (IrKind::Number, Value::Number(number));
    }
    (IrKind::String, Value::String(value.to_string()))
}

// ============================================================
// JSON / JSONC
// ============================================================

fn parse_json(raw: &str, jsonc: bool) -> Result<ParsedTree, ParseFailure> {
    use jsonc_parser::{CollectOptions, ParseOptions, parse_to_ast};

    let options = ParseOptions {
        allow_comments: jsonc,
        allow_trailing_commas: jsonc,
        allow_loose_object_property_names: false,
    };
    match parse_to_ast(raw, &CollectOptions::default(), &options) {
        Ok(result) => {
            let ir = result
                .value
                .as_ref()
                .map(|value| build_json_node(value, "#".to_string(), None, None));
            Ok(ParsedTree {
                ir,
                duplicate_keys: Vec::new(),
            })
        }
        Err(err) => {
            let line_index = LineIndex::new(raw);
            let range = line_index.range(err.range().start, err.range().end);
            Err(ParseFailure {
                message: err.to_string(),
                range,
            })
        }
    }
}

fn build_json_node(
    value: &jsonc_parser::ast::Value<'_>,
    ptr: String,
    key: Option<String>,
    key_span: Option<(usize, usize)>,
) -> IrNode {
    use jsonc_parser::ast::{ObjectPropName, Value as Ast};

    let node = match value {
        Ast::StringLit(lit) => IrNode {
            kind: IrKind::String,
            key: None,
            scalar: Some(Value::String(lit.value.to_string())),
            ptr,
            loc: Location::of_value(lit.range.start, lit.range.end),
            children: Vec::new(),
        },
        Ast::NumberLit(lit) => {
            let scalar = parse_json_number(lit.value);
            IrNode {
                kind: IrKind::Number,
                key: None,
                scalar: Some(scalar),
                ptr,
                loc: Location::of_value(lit.range.start, lit.range.end),
                children: Vec::new(),
            }
        }
        Ast::BooleanLit(lit) => IrNode {
            kind: IrKind::Boolean,
            key: None,
            scalar: Some(Value::Bool(lit.value)),
            ptr,
            loc: Location::of_value(lit.range.start, lit.range.end),
            children: Vec::new(),
        },
        Ast::NullKeyword(lit) => IrNode {
            kind: IrKind::Null,
            key: None,
            scalar: Some(Value::Null),
            ptr,
            loc: Location::of_value(lit.range.start, lit.range.end),
            children: Vec::new(),
        },
        Ast::Object(object) => {
            let children = object
                .properties
                .iter()
                .map(|prop| {
                    let (name, name_range) = match &prop.name {
                        ObjectPropName::String(s) => (s.value.to_string(), s.range),
                        ObjectPropName::Word(w) => (w.value.to_string(), w.range),
                    };
                    let child_ptr = join_pointer(&ptr, &name);
                    build_json_node(
                        &prop.value,
                        child_ptr,
                        Some(name),
                        Some((name_range.start, name_range.end)),
                    )
                })
                .collect();
            IrNode {
                kind: IrKind::Object,
                key: None,
                scalar: None,
                ptr,
                loc: Location::of_value(object.range.start, object.range.end),
                children,
            }
        }
        Ast::Array(array) => {
            let children = array
                .elements
                .iter()
                .enumerate()
                .map(|(index, element)| {
                    build_json_node(element, join_index(&ptr, index), None, None)
                })
                .collect();
            IrNode {
                kind: IrKind::Array,
                key: None,
                scalar: None,
                ptr,
                loc: Location::of_value(array.range.start, array.range.end),
                children,
            }
        }
    };
    finish_entry(node, key, key_span)
}

fn parse_json_number(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }
    if let Ok(float) = raw.parse::<f64>()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}
