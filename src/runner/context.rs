//! The context handed to every rule visitor.
//!
//! `RuleContext` owns diagnostic construction (code prefixing, severity
//! resolution, source tagging), range resolution with graceful fallback,
//! fix collection, and the lookup helpers rules need: pointer location,
//! key ranges, owning roots, enclosing scope, and schema navigation.

use std::collections::{HashSet, VecDeque};

use crate::core::atoms::{ComponentKind, NodeRef, SchemaRef};
use crate::core::context::ProjectContext;
use crate::core::doc_type::is_http_method;
use crate::core::graph::node_key;
use crate::core::index::OpenApiVersion;
use crate::core::pointer::{
    join_pointer, normalize_pointer, parent_pointer, split_pointer, unescape_segment,
};
use crate::diagnostics::{
    CodeDescription, Diagnostic, FilePatch, Range, RangePrecision, Severity, Suggestion,
};
use crate::runner::views::Locate;
use crate::runner::{RuleMeta, RuleSeverity};

/// What encloses a pointer: the nearest path/operation/component scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeContext {
    pub path: Option<String>,
    pub method: Option<String>,
    pub operation_id: Option<String>,
    pub component: Option<(ComponentKind, String)>,
}

/// Options for `report_at` / `report_here`.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub message: String,
    /// Overrides the rule's configured/default severity.
    pub severity: Option<Severity>,
    /// Prefer the field's key range over its value range.
    pub prefer_key: bool,
    pub suggest: Vec<Suggestion>,
}

impl ReportOptions {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_prefer_key(mut self) -> Self {
        self.prefer_key = true;
        self
    }

    pub fn with_suggestion(mut self, title: impl Into<String>, fix: FilePatch) -> Self {
        self.suggest.push(Suggestion {
            title: title.into(),
            fix: vec![fix],
        });
        self
    }
}

/// Sink for one run's diagnostics and fixes.
#[derive(Debug, Default)]
pub struct RunOutput {
    pub diagnostics: Vec<Diagnostic>,
    pub fixes: Vec<FilePatch>,
}

pub struct RuleContext<'a> {
    project: &'a ProjectContext,
    rule: &'a RuleMeta,
    severity_override: Option<Severity>,
    out: &'a mut RunOutput,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        project: &'a ProjectContext,
        rule: &'a RuleMeta,
        override_setting: Option<&RuleSeverity>,
        out: &'a mut RunOutput,
    ) -> Self {
        let severity_override = match override_setting {
            Some(RuleSeverity::Set(severity)) => Some(*severity),
            _ => None,
        };
        Self {
            project,
            rule,
            severity_override,
            out,
        }
    }

    // ============================================================
    // Reporting
    // ============================================================

    /// Resolved severity: explicit > configured override > rule default.
    fn severity_for(&self, explicit: Option<Severity>) -> Severity {
        explicit
            .or(self.severity_override)
            .unwrap_or_else(|| self.rule.severity())
    }

    /// Emit a diagnostic with a known range. The code is prefixed
    /// `"rule-<number>-<id>"`, the source is set, and the rule's
    /// documentation URL is attached when present.
    pub fn report(
        &mut self,
        uri: &str,
        range: Range,
        precision: RangePrecision,
        options: ReportOptions,
    ) {
        let mut diagnostic = Diagnostic::new(
            self.rule.code(),
            options.message,
            uri,
            range,
            self.severity_for(options.severity),
        )
        .with_precision(precision);
        diagnostic.code_description = self
            .rule
            .url
            .clone()
            .map(|href| CodeDescription { href });
        diagnostic.suggest = options.suggest;
        self.out.diagnostics.push(diagnostic);
    }

    /// Emit a diagnostic under an engine-level code (`parse-error`,
    /// `schema-compilation-error`, ...) instead of the rule's own.
    pub fn report_with_code(
        &mut self,
        code: &str,
        uri: &str,
        range: Range,
        precision: RangePrecision,
        options: ReportOptions,
    ) {
        let mut diagnostic = Diagnostic::new(
            code,
            options.message,
            uri,
            range,
            self.severity_for(options.severity),
        )
        .with_precision(precision);
        diagnostic.suggest = options.suggest;
        self.out.diagnostics.push(diagnostic);
    }

    /// Report on a field relative to a target, degrading gracefully when
    /// the field is absent: exact value, key (when preferred), nearest
    /// existing ancestor key, the target's own key, the target's first
    /// child key, then `(0:0, 0:0)`.
    pub fn report_at(&mut self, target: &dyn Locate, segments: &[&str], options: ReportOptions) {
        let at = target.target();
        let uri = at.uri.to_string();
        let (range, precision) =
            self.resolve_field_range(&uri, at.ptr, segments, options.prefer_key);
        self.report(&uri, range, precision, options);
    }

    /// Report on the target itself.
    pub fn report_here(&mut self, target: &dyn Locate, options: ReportOptions) {
        self.report_at(target, &[], options);
    }

    /// Append to the collected fix list.
    pub fn fix(&mut self, patch: FilePatch) {
        self.out.fixes.push(patch);
    }

    pub fn fix_all(&mut self, patches: impl IntoIterator<Item = FilePatch>) {
        self.out.fixes.extend(patches);
    }

    // ============================================================
    // Range resolution
    // ============================================================

    fn resolve_field_range(
        &self,
        uri: &str,
        base_ptr: &str,
        segments: &[&str],
        prefer_key: bool,
    ) -> (Range, RangePrecision) {
        let Some(doc) = self.project.documents.get(uri) else {
            return (Range::zero(), RangePrecision::Fallback);
        };
        let base = normalize_pointer(base_ptr);
        let target_ptr = segments
            .iter()
            .fold(base.clone(), |ptr, segment| join_pointer(&ptr, segment));

        // Exact: the field exists.
        if let Some(node) = doc.node_at(&target_ptr) {
            if prefer_key && node.loc.key_start.is_some() {
                let (start, end) = node.loc.key_span();
                return (doc.offset_range(start, end), RangePrecision::Key);
            }
            return (
                doc.offset_range(node.loc.val_start, node.loc.val_end),
                RangePrecision::Exact,
            );
        }

        // Nearest existing ancestor strictly between target and base.
        let mut cursor = parent_pointer(&target_ptr);
        while let Some(ptr) = cursor {
            if ptr == base {
                break;
            }
            if let Some(node) = doc.node_at(&ptr)
                && node.loc.key_start.is_some()
            {
                let (start, end) = node.loc.key_span();
                return (doc.offset_range(start, end), RangePrecision::Parent);
            }
            cursor = parent_pointer(&ptr);
        }

        // The base node's own key range.
        if let Some(node) = doc.node_at(&base) {
            if node.loc.key_start.is_some() {
                let (start, end) = node.loc.key_span();
                return (doc.offset_range(start, end), RangePrecision::Parent);
            }
            // First child key of the base object (root objects have no key).
            if let Some(first) = node.children.first() {
                let (start, end) = first.loc.key_span();
                return (doc.offset_range(start, end), RangePrecision::FirstChild);
            }
        }

        (Range::zero(), RangePrecision::Fallback)
    }

    // ============================================================
    // Location helpers
    // ============================================================

    /// Value range of a pointer: IR lookup first, then the source map.
    pub fn locate(&self, uri: &str, ptr: &str) -> Option<Range> {
        let doc = self.project.documents.get(uri)?;
        if let Some(node) = doc.node_at(ptr) {
            return Some(doc.offset_range(node.loc.val_start, node.loc.val_end));
        }
        doc.pointer_to_range(ptr)
    }

    /// Key range of a pointer (falls back to the value range when the
    /// parser exposed no key offsets).
    pub fn locate_key(&self, uri: &str, ptr: &str) -> Option<Range> {
        let doc = self.project.documents.get(uri)?;
        let loc = doc.node_at(ptr).map(|n| n.loc).or_else(|| doc.pointer_location(ptr))?;
        let (start, end) = loc.key_span();
        Some(doc.offset_range(start, end))
    }

    /// Key range of the first child of the object at a pointer.
    pub fn locate_first_child(&self, uri: &str, ptr: &str) -> Option<Range> {
        let doc = self.project.documents.get(uri)?;
        let first = doc.node_at(ptr)?.children.first()?;
        let (start, end) = first.loc.key_span();
        Some(doc.offset_range(start, end))
    }

    /// Direct byte-offset translation using the document's cached line
    /// offsets.
    pub fn offset_to_range(&self, uri: &str, start: usize, end: Option<usize>) -> Option<Range> {
        let doc = self.project.documents.get(uri)?;
        Some(doc.offset_range(start, end.unwrap_or(start)))
    }

    /// Search backward from the child value's start offset for the
    /// literal key token (quoted or bare followed by a colon).
    pub fn find_key_range(&self, uri: &str, parent_ptr: &str, key: &str) -> Option<Range> {
        let doc = self.project.documents.get(uri)?;
        let parent = doc.node_at(parent_ptr)?;
        let search_end = parent
            .child(key)
            .map(|child| child.loc.val_start)
            .unwrap_or(parent.loc.end)
            .min(doc.raw_text.len());
        let search_start = parent.loc.start.min(search_end);
        let haystack = &doc.raw_text[search_start..search_end];

        let quoted = format!("\"{}\"", key);
        if let Some(idx) = haystack.rfind(&quoted) {
            let start = search_start + idx;
            return Some(doc.offset_range(start, start + quoted.len()));
        }
        // Bare key: last occurrence followed by optional spaces and ':'.
        let mut position = haystack.len();
        while let Some(idx) = haystack[..position].rfind(key) {
            let after = &haystack[idx + key.len()..];
            if after.trim_start_matches([' ', '\t']).starts_with(':') {
                let start = search_start + idx;
                return Some(doc.offset_range(start, start + key.len()));
            }
            if idx == 0 {
                break;
            }
            position = idx;
        }
        None
    }

    // ============================================================
    // Roots and scope
    // ============================================================

    /// Root documents owning `(uri, ptr)` within this context, by reverse
    /// traversal over the context graph. Sorted for determinism.
    pub fn get_root_documents(&self, uri: &str, ptr: &str) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([(uri.to_string(), normalize_pointer(ptr))]);
        let mut roots: Vec<String> = Vec::new();

        while let Some((current_uri, current_ptr)) = queue.pop_front() {
            let key = node_key(&current_uri, &current_ptr);
            if !visited.insert(key) {
                continue;
            }
            let is_root = self
                .project
                .documents
                .get(&current_uri)
                .is_some_and(|doc| doc.has_root_marker());
            if is_root {
                if !roots.contains(&current_uri) {
                    roots.push(current_uri);
                }
                continue;
            }
            for edge in self.project.graph.dependents_of(&current_uri, &current_ptr) {
                queue.push_back((edge.from_uri.clone(), edge.from_ptr.clone()));
                queue.push_back((edge.from_uri.clone(), "#".to_string()));
            }
        }
        roots.sort();
        roots
    }

    /// The lexicographically smallest owning root.
    pub fn get_primary_root(&self, uri: &str, ptr: &str) -> Option<String> {
        self.get_root_documents(uri, ptr).into_iter().next()
    }

    /// What path/operation/component encloses a pointer.
    pub fn get_scope_context(&self, uri: &str, ptr: &str) -> Option<ScopeContext> {
        let segments = split_pointer(ptr);
        let mut scope = ScopeContext::default();
        match segments.first().map(String::as_str) {
            Some("paths") => {
                scope.path = segments.get(1).cloned();
                if let Some(method) = segments.get(2)
                    && is_http_method(method, true)
                {
                    scope.method = Some(method.clone());
                    let op_ptr = format!(
                        "#/paths/{}/{}",
                        crate::core::pointer::escape_segment(segments.get(1)?),
                        method
                    );
                    scope.operation_id = self
                        .project
                        .documents
                        .get(uri)
                        .and_then(|doc| doc.node_at(&op_ptr))
                        .and_then(|node| node.child("operationId"))
                        .and_then(|id| id.as_str())
                        .map(String::from);
                }
            }
            Some("components") => {
                if let (Some(kind), Some(name)) = (segments.get(1), segments.get(2)) {
                    if let Some(kind) = ComponentKind::parse(kind) {
                        scope.component = Some((kind, unescape_segment(name)));
                    }
                }
            }
            _ => return None,
        }
        Some(scope)
    }

    // ============================================================
    // Schema helpers
    // ============================================================

    /// Direct schema children of a schema, in index order.
    pub fn get_child_schemas(&self, schema: &SchemaRef) -> Vec<&SchemaRef> {
        self.project.index.schema_children(&schema.node)
    }

    /// The child schema for a named property.
    pub fn get_property_schema(&self, schema: &SchemaRef, name: &str) -> Option<&SchemaRef> {
        self.get_child_schemas(schema)
            .into_iter()
            .find(|child| child.property_name.as_deref() == Some(name))
    }

    /// The `items` child schema.
    pub fn get_items_schema(&self, schema: &SchemaRef) -> Option<&SchemaRef> {
        use crate::core::atoms::SchemaLocation;
        self.get_child_schemas(schema)
            .into_iter()
            .find(|child| child.location == SchemaLocation::Items)
    }

    /// The names in the schema's `required` array.
    pub fn get_required_properties(&self, schema: &SchemaRef) -> Vec<String> {
        self.project
            .documents
            .get(&schema.node.uri)
            .and_then(|doc| doc.node_at(&schema.node.ptr))
            .and_then(|node| node.child("required"))
            .map(|required| {
                required
                    .children
                    .iter()
                    .filter_map(|c| c.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ============================================================
    // Version and documents
    // ============================================================

    pub fn version(&self) -> OpenApiVersion {
        self.project.index.version
    }

    /// Version-aware branching on the string forms (`"3.0"`, `"3.1"`, ...).
    pub fn is_version(&self, version: &str) -> bool {
        self.version().as_str() == version
    }

    pub fn project(&self) -> &ProjectContext {
        self.project
    }

    /// IR node behind any addressable target.
    pub fn node_of(&self, node_ref: &NodeRef) -> Option<&crate::core::document::IrNode> {
        self.project
            .documents
            .get(&node_ref.uri)
            .and_then(|doc| doc.node_at(&node_ref.ptr))
    }
}
