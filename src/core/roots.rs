//! Root discovery and reverse root search.
//!
//! Roots are documents carrying `openapi`/`swagger` at the top level,
//! discovered by globbing the workspace through the document-type cache.
//! For a partial document, the owning roots are found by loading every
//! root's forward closure, building a reference graph, and walking the
//! reverse edges from the partial; roots are terminal in reverse search.

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::core::cache::DocumentTypeCache;
use crate::core::doc_type::DocumentType;
use crate::core::graph::{DocMap, RefGraph, node_key, split_ref};
use crate::core::host::Host;
use crate::core::loader::load_document;
use std::sync::Arc;

/// Glob patterns for workspace document discovery.
pub const DISCOVERY_PATTERNS: &[&str] = &["**/*.yaml", "**/*.yml", "**/*.json"];

/// The outcome of a reverse root search. Roots are sorted, which makes
/// the search order-independent and the primary root deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RootSearch {
    pub roots: Vec<String>,
}

impl RootSearch {
    /// The lexicographically smallest owning root.
    pub fn primary(&self) -> Option<&str> {
        self.roots.first().map(String::as_str)
    }
}

/// Discover every root document in the workspace, validating
/// user-supplied entrypoints through the same cache.
pub fn discover_roots(
    host: &dyn Host,
    doc_types: &mut DocumentTypeCache,
    entrypoints: &[String],
) -> Vec<String> {
    let mut candidates = host.glob(DISCOVERY_PATTERNS);
    for entry in entrypoints {
        if !candidates.contains(entry) {
            candidates.push(entry.clone());
        }
    }
    let mut roots: Vec<String> = candidates
        .into_iter()
        .filter(|uri| doc_types.get_or_load(uri, host).0 == DocumentType::Root)
        .collect();
    roots.sort();
    roots.dedup();
    roots
}

/// Load a document into the map unless already present. Load failures
/// are absorbed: the URI simply stays absent and any edge into it stays
/// unresolved.
pub fn load_into(docs: &mut DocMap, uri: &str, host: &dyn Host) {
    if docs.contains_key(uri) {
        return;
    }
    if let Ok(content) = host.read(uri) {
        let doc = load_document(uri, content.text, content.mtime);
        docs.insert(uri.to_string(), Arc::new(doc));
    }
}

/// Load the forward `$ref` closure of `start` into the map. BFS with a
/// visited set; cycles terminate.
pub fn load_forward_closure(docs: &mut DocMap, start: &str, host: &dyn Host) {
    let mut queue = VecDeque::from([start.to_string()]);
    let mut visited = HashSet::new();
    while let Some(uri) = queue.pop_front() {
        if !visited.insert(uri.clone()) {
            continue;
        }
        load_into(docs, &uri, host);
        let Some(doc) = docs.get(&uri) else { continue };
        let Some(ir) = &doc.ir else { continue };
        let mut targets = Vec::new();
        ir.walk(&mut |node| {
            if let Some(reference) = node.child("$ref").and_then(|r| r.as_str()) {
                let (to_uri, _) = split_ref(&uri, reference, host);
                targets.push(to_uri);
            }
        });
        for target in targets {
            if !visited.contains(&target) {
                queue.push_back(target);
            }
        }
    }
}

/// Find the root documents owning a partial by reverse traversal.
///
/// Every discovered root's forward closure is loaded first so the graph
/// contains a complete path between roots and partials. The BFS then
/// walks dependents backwards from `(partial, #)`; a root records and
/// terminates its branch.
pub fn find_roots_for_partial(
    partial_uri: &str,
    roots: &[String],
    host: &dyn Host,
) -> RootSearch {
    let mut docs = DocMap::new();
    load_into(&mut docs, partial_uri, host);
    for root in roots {
        load_forward_closure(&mut docs, root, host);
    }
    let graph = RefGraph::build(&docs, host);

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, String)> =
        VecDeque::from([(partial_uri.to_string(), "#".to_string())]);
    let mut found: BTreeSet<String> = BTreeSet::new();

    while let Some((uri, ptr)) = queue.pop_front() {
        let key = node_key(&uri, &ptr);
        if !visited.insert(key) {
            continue;
        }
        let is_root = docs
            .get(&uri)
            .is_some_and(|doc| doc.has_root_marker());
        if is_root {
            found.insert(uri);
            continue;
        }
        for edge in graph.dependents_of(&uri, &ptr) {
            queue.push_back((edge.from_uri.clone(), edge.from_ptr.clone()));
            queue.push_back((edge.from_uri.clone(), "#".to_string()));
        }
    }

    RootSearch {
        roots: found.into_iter().collect(),
    }
}
