//! Cross-document `$ref` graph.
//!
//! Every object carrying a string `$ref` property contributes a directed
//! edge. Edges are stored out-of-line in an arena; forward and reverse
//! maps index them by `"{uri}#{ptr}"` node keys. The graph is a
//! multigraph - the same logical edge may appear from several locations -
//! and cycles are permitted; all traversals use visited sets.

use std::collections::HashMap;

use indexmap::IndexMap;
use std::sync::Arc;

use crate::core::document::{IrKind, IrNode, ParsedDocument};
use crate::core::host::Host;
use crate::core::pointer::{is_self_or_descendant, normalize_pointer};

/// Documents of one linting context, keyed by URI in load order.
pub type DocMap = IndexMap<String, Arc<ParsedDocument>>;

/// Node key: `"{uri}#{ptr}"` (the pointer's own `#` supplies the separator).
pub fn node_key(uri: &str, ptr: &str) -> String {
    format!("{}{}", uri, normalize_pointer(ptr))
}

/// A directed `$ref` edge. The original ref string is kept for display
/// and for edges whose target cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEdge {
    pub from_uri: String,
    /// Pointer of the object holding the `$ref` property.
    pub from_ptr: String,
    pub to_uri: String,
    pub to_ptr: String,
    pub ref_str: String,
    /// False when the target document is absent or the pointer does not
    /// resolve within it.
    pub resolved: bool,
}

impl RefEdge {
    pub fn from_key(&self) -> String {
        node_key(&self.from_uri, &self.from_ptr)
    }

    pub fn to_key(&self) -> String {
        node_key(&self.to_uri, &self.to_ptr)
    }
}

#[derive(Debug, Default)]
pub struct RefGraph {
    edges: Vec<RefEdge>,
    forward: HashMap<String, Vec<usize>>,
    /// Target key -> indexes of edges pointing at it.
    reverse: HashMap<String, Vec<usize>>,
    /// Target URI -> indexes of edges into that document (any pointer).
    reverse_by_uri: HashMap<String, Vec<usize>>,
}

impl RefGraph {
    /// Discover every `$ref` in the given documents and build the graph.
    pub fn build(docs: &DocMap, host: &dyn Host) -> Self {
        let mut graph = RefGraph::default();
        for (uri, doc) in docs {
            let Some(ir) = &doc.ir else { continue };
            ir.walk(&mut |node| {
                if let Some(edge) = ref_edge_of(uri, node, host, docs) {
                    graph.push(edge);
                }
            });
        }
        graph
    }

    fn push(&mut self, edge: RefEdge) {
        let index = self.edges.len();
        self.forward.entry(edge.from_key()).or_default().push(index);
        self.reverse.entry(edge.to_key()).or_default().push(index);
        self.reverse_by_uri
            .entry(edge.to_uri.clone())
            .or_default()
            .push(index);
        self.edges.push(edge);
    }

    pub fn all_edges(&self) -> &[RefEdge] {
        &self.edges
    }

    /// Edges leaving `uri`; with a pointer, only edges whose `from_ptr`
    /// equals it or addresses a descendant of it.
    pub fn edges_from(&self, uri: &str, ptr: Option<&str>) -> Vec<&RefEdge> {
        self.edges
            .iter()
            .filter(|e| e.from_uri == uri)
            .filter(|e| match ptr {
                Some(prefix) => is_self_or_descendant(&e.from_ptr, prefix),
                None => true,
            })
            .collect()
    }

    /// First outgoing edge from exactly `(uri, ptr)`.
    pub fn first_edge_at(&self, uri: &str, ptr: &str) -> Option<&RefEdge> {
        let key = node_key(uri, ptr);
        self.forward
            .get(&key)
            .and_then(|indexes| indexes.first())
            .map(|&i| &self.edges[i])
    }

    /// Edges whose target is `(uri, ptr)`. A root pointer (`#`) matches
    /// edges into any pointer of the document; otherwise the target must
    /// equal the pointer or address a descendant of it.
    pub fn dependents_of(&self, uri: &str, ptr: &str) -> Vec<&RefEdge> {
        let ptr = normalize_pointer(ptr);
        if ptr == "#" {
            return self
                .reverse_by_uri
                .get(uri)
                .map(|indexes| indexes.iter().map(|&i| &self.edges[i]).collect())
                .unwrap_or_default();
        }
        self.reverse_by_uri
            .get(uri)
            .map(|indexes| {
                indexes
                    .iter()
                    .map(|&i| &self.edges[i])
                    .filter(|e| is_self_or_descendant(&e.to_ptr, &ptr))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Emit the edge for a node when it is an object with a string `$ref`.
fn ref_edge_of(
    uri: &str,
    node: &IrNode,
    host: &dyn Host,
    docs: &DocMap,
) -> Option<RefEdge> {
    if node.kind != IrKind::Object {
        return None;
    }
    let ref_value = node.child("$ref")?.as_str()?;
    let (to_uri, to_ptr) = split_ref(uri, ref_value, host);
    let resolved = match docs.get(&to_uri) {
        Some(target) => {
            to_ptr == "#"
                || target
                    .ir
                    .as_ref()
                    .is_some_and(|ir| ir.find_by_pointer(&to_ptr).is_some())
        }
        None => false,
    };
    Some(RefEdge {
        from_uri: uri.to_string(),
        from_ptr: node.ptr.clone(),
        to_uri,
        to_ptr,
        ref_str: ref_value.to_string(),
        resolved,
    })
}

/// Split a `$ref` string into `(to_uri, to_ptr)`.
///
/// An empty path means a same-document ref; URLs are absolute; anything
/// else resolves against `from_uri` via the host's pure `resolve`. A
/// missing fragment addresses the target's root.
pub fn split_ref(from_uri: &str, reference: &str, host: &dyn Host) -> (String, String) {
    let (path, fragment) = match reference.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (reference, None),
    };
    let to_uri = if path.is_empty() {
        from_uri.to_string()
    } else {
        host.resolve(from_uri, path)
    };
    let to_ptr = match fragment {
        Some(fragment) => normalize_pointer(fragment),
        None => "#".to_string(),
    };
    (to_uri, to_ptr)
}

/// Walk an IR tree by pointer; `None` when the path is missing. Numeric
/// segments address array indices.
pub fn get_value_at_pointer<'a>(ir: &'a IrNode, ptr: &str) -> Option<&'a IrNode> {
    ir.find_by_pointer(ptr)
}
