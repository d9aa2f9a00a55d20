//! Project contexts and linting-context resolution.
//!
//! A [`ProjectContext`] couples a root document with every document it
//! transitively references, plus the reference graph and project index
//! built over that snapshot. Resolving a [`LintingContext`] for an edited
//! URI picks the mode: `project-aware` when exactly one root owns the
//! document, `multi-root` when several do, `fragment` otherwise.

use std::collections::HashSet;

use rayon::prelude::*;
use std::sync::Arc;

use crate::core::cache::EngineCaches;
use crate::core::cancel::CancelToken;
use crate::core::doc_type::DocumentType;
use crate::core::document::ParsedDocument;
use crate::core::graph::{DocMap, RefGraph, split_ref};
use crate::core::host::Host;
use crate::core::index::{ProjectIndex, build_index};
use crate::core::loader::load_document;
use crate::core::roots::{discover_roots, find_roots_for_partial};

// ============================================================
// Project context
// ============================================================

/// A consistent snapshot of one root and its transitive references.
/// All member reads complete before the graph and index are built.
#[derive(Debug)]
pub struct ProjectContext {
    pub root_uri: String,
    pub documents: DocMap,
    pub graph: RefGraph,
    pub index: ProjectIndex,
}

/// Forward-BFS load of a root's reference closure, then graph and index
/// construction. Each BFS level's reads run in parallel; a load failure
/// is not fatal - the edge simply stays unresolved and surfaces later as
/// an `unresolved-ref` diagnostic.
pub fn build_project_context(
    root_uri: &str,
    host: &dyn Host,
    extra_docs: &[Arc<ParsedDocument>],
) -> ProjectContext {
    let mut docs = DocMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut level: Vec<String> = vec![root_uri.to_string()];

    while !level.is_empty() {
        for uri in &level {
            visited.insert(uri.clone());
        }
        let loaded: Vec<(String, Option<ParsedDocument>)> = level
            .par_iter()
            .map(|uri| {
                let doc = host
                    .read(uri)
                    .ok()
                    .map(|content| load_document(uri, content.text, content.mtime));
                (uri.clone(), doc)
            })
            .collect();

        let mut next: Vec<String> = Vec::new();
        for (uri, doc) in loaded {
            let Some(doc) = doc else { continue };
            if let Some(ir) = &doc.ir {
                ir.walk(&mut |node| {
                    if let Some(reference) = node.child("$ref").and_then(|r| r.as_str()) {
                        let (to_uri, _) = split_ref(&uri, reference, host);
                        if !visited.contains(&to_uri) && !next.contains(&to_uri) {
                            next.push(to_uri);
                        }
                    }
                });
            }
            docs.insert(uri, Arc::new(doc));
        }
        level = next;
    }

    for doc in extra_docs {
        if !docs.contains_key(&doc.uri) {
            docs.insert(doc.uri.clone(), doc.clone());
        }
    }

    let graph = RefGraph::build(&docs, host);
    let index = build_index(&docs, &graph, &CancelToken::new());
    ProjectContext {
        root_uri: root_uri.to_string(),
        documents: docs,
        graph,
        index,
    }
}

/// A single-document context for fragment-mode linting.
pub fn build_fragment_context(doc: Arc<ParsedDocument>, host: &dyn Host) -> ProjectContext {
    let mut docs = DocMap::new();
    let uri = doc.uri.clone();
    docs.insert(uri.clone(), doc);
    let graph = RefGraph::build(&docs, host);
    let index = build_index(&docs, &graph, &CancelToken::new());
    ProjectContext {
        root_uri: uri,
        documents: docs,
        graph,
        index,
    }
}

// ============================================================
// Linting context
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintMode {
    ProjectAware,
    MultiRoot,
    Fragment,
}

impl std::fmt::Display for LintMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LintMode::ProjectAware => write!(f, "project-aware"),
            LintMode::MultiRoot => write!(f, "multi-root"),
            LintMode::Fragment => write!(f, "fragment"),
        }
    }
}

/// One root's view in multi-root mode.
#[derive(Debug)]
pub struct MultiRootEntry {
    pub root_uri: String,
    pub context: Arc<ProjectContext>,
    pub uris: Vec<String>,
}

/// The resolved linting plan for one edited URI.
#[derive(Debug)]
pub struct LintingContext {
    pub mode: LintMode,
    /// Documents to lint, in order.
    pub uris: Vec<String>,
    pub root_uris: Vec<String>,
    /// Present in project-aware mode, and in fragment mode when the
    /// document itself loaded (single-document context).
    pub context: Option<Arc<ProjectContext>>,
    pub multi_root_contexts: Vec<MultiRootEntry>,
}

impl LintingContext {
    fn fragment(uri: &str, context: Option<Arc<ProjectContext>>) -> Self {
        Self {
            mode: LintMode::Fragment,
            uris: vec![uri.to_string()],
            root_uris: Vec::new(),
            context,
            multi_root_contexts: Vec::new(),
        }
    }
}

/// Options for [`resolve_linting_context`].
#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    /// Extra root candidates validated through the document-type cache.
    pub entrypoints: Vec<String>,
}

/// Decide the linting mode for a URI and assemble its contexts.
pub fn resolve_linting_context(
    uri: &str,
    host: &dyn Host,
    caches: &mut EngineCaches,
    options: &ResolveOptions,
) -> LintingContext {
    let (doc_type, doc) = caches.doc_types.get_or_load(uri, host);

    match doc_type {
        DocumentType::Unknown => {
            // Unloadable or unrecognizable; a loaded document still gets a
            // single-document context so parse errors can surface.
            let context = doc.map(|d| Arc::new(build_fragment_context(d, host)));
            LintingContext::fragment(uri, context)
        }
        DocumentType::Root => {
            let context = cached_or_built(uri, host, caches, &[]);
            LintingContext {
                mode: LintMode::ProjectAware,
                uris: context.documents.keys().cloned().collect(),
                root_uris: vec![uri.to_string()],
                context: Some(context),
                multi_root_contexts: Vec::new(),
            }
        }
        DocumentType::Partial => {
            let roots = discover_roots(host, &mut caches.doc_types, &options.entrypoints);
            let search = find_roots_for_partial(uri, &roots, host);
            match search.roots.len() {
                0 => {
                    let context = doc.map(|d| Arc::new(build_fragment_context(d, host)));
                    LintingContext::fragment(uri, context)
                }
                1 => {
                    let root_uri = &search.roots[0];
                    let context = context_with_partial(root_uri, uri, &doc, host, caches);
                    LintingContext {
                        mode: LintMode::ProjectAware,
                        uris: context.documents.keys().cloned().collect(),
                        root_uris: search.roots.clone(),
                        context: Some(context),
                        multi_root_contexts: Vec::new(),
                    }
                }
                _ => {
                    let entries: Vec<MultiRootEntry> = search
                        .roots
                        .iter()
                        .map(|root_uri| {
                            let context =
                                context_with_partial(root_uri, uri, &doc, host, caches);
                            MultiRootEntry {
                                root_uri: root_uri.clone(),
                                uris: context.documents.keys().cloned().collect(),
                                context,
                            }
                        })
                        .collect();
                    LintingContext {
                        mode: LintMode::MultiRoot,
                        uris: vec![uri.to_string()],
                        root_uris: search.roots.clone(),
                        context: None,
                        multi_root_contexts: entries,
                    }
                }
            }
        }
    }
}

/// A cached project context for the root, rebuilt when stale.
fn cached_or_built(
    root_uri: &str,
    host: &dyn Host,
    caches: &mut EngineCaches,
    extra_docs: &[Arc<ParsedDocument>],
) -> Arc<ProjectContext> {
    if let Some(context) = caches.projects.lookup(root_uri, host) {
        return context;
    }
    let context = Arc::new(build_project_context(root_uri, host, extra_docs));
    caches.projects.insert(root_uri, context.clone());
    context
}

/// The root's context with the partial injected if it is not already a
/// member. An injected variant is built fresh and left uncached so the
/// cached entry stays a pure function of the root.
fn context_with_partial(
    root_uri: &str,
    partial_uri: &str,
    partial_doc: &Option<Arc<ParsedDocument>>,
    host: &dyn Host,
    caches: &mut EngineCaches,
) -> Arc<ProjectContext> {
    let context = cached_or_built(root_uri, host, caches, &[]);
    if context.documents.contains_key(partial_uri) {
        return context;
    }
    let extra: Vec<Arc<ParsedDocument>> = partial_doc.iter().cloned().collect();
    Arc::new(build_project_context(root_uri, host, &extra))
}

#[cfg(test)]
mod tests {
    use crate::core::cache::EngineCaches;
    use crate::core::context::*;
    use crate::core::host::MemoryHost;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn root_with_ref(reference: &str) -> String {
        format!(
            "openapi: 3.0.3\npaths:\n  /pets:\n    get:\n      responses:\n        '200':\n          content:\n            application/json:\n              schema:\n                $ref: '{}'\n",
            reference
        )
    }

    #[test]
    fn test_root_document_project_aware() {
        let host = MemoryHost::new().with_file("api.yaml", "openapi: 3.0.3\npaths: {}\n");
        let mut caches = EngineCaches::new();
        let context =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        assert_eq!(context.mode, LintMode::ProjectAware);
        assert_eq!(context.uris, vec!["api.yaml"]);
        assert_eq!(context.root_uris, vec!["api.yaml"]);
        // A root with no $refs yields a context of exactly one document.
        assert_eq!(context.context.as_ref().unwrap().documents.len(), 1);
    }

    #[test]
    fn test_project_context_loads_closure() {
        let host = MemoryHost::new()
            .with_file("api.yaml", root_with_ref("./schemas/Pet.yaml#/Pet"))
            .with_file(
                "schemas/Pet.yaml",
                "Pet:\n  type: object\n  properties:\n    owner:\n      $ref: './Owner.yaml#/Owner'\n",
            )
            .with_file("schemas/Owner.yaml", "Owner:\n  type: object\n");
        let mut caches = EngineCaches::new();
        let context =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        let project = context.context.unwrap();
        assert_eq!(project.documents.len(), 3);
        assert!(project.documents.contains_key("schemas/Owner.yaml"));
    }

    #[test]
    fn test_partial_with_single_root() {
        let host = MemoryHost::new()
            .with_file("api.yaml", root_with_ref("./Pet.yaml#/Pet"))
            .with_file("Pet.yaml", "Pet:\n  type: object\n");
        let mut caches = EngineCaches::new();
        let context =
            resolve_linting_context("Pet.yaml", &host, &mut caches, &ResolveOptions::default());
        assert_eq!(context.mode, LintMode::ProjectAware);
        assert_eq!(context.root_uris, vec!["api.yaml"]);
        let project = context.context.unwrap();
        assert!(project.documents.contains_key("Pet.yaml"));
    }

    #[test]
    fn test_partial_with_two_roots_multi_root() {
        // Both contexts contain the partial.
        let host = MemoryHost::new()
            .with_file("a.yaml", root_with_ref("./shared.yaml#/Pet"))
            .with_file("b.yaml", root_with_ref("./shared.yaml#/Pet"))
            .with_file("shared.yaml", "Pet:\n  type: object\n");
        let mut caches = EngineCaches::new();
        let context = resolve_linting_context(
            "shared.yaml",
            &host,
            &mut caches,
            &ResolveOptions::default(),
        );
        assert_eq!(context.mode, LintMode::MultiRoot);
        assert_eq!(context.root_uris, vec!["a.yaml", "b.yaml"]);
        assert_eq!(context.multi_root_contexts.len(), 2);
        for entry in &context.multi_root_contexts {
            assert!(
                entry.context.documents.contains_key("shared.yaml"),
                "partial missing from {}",
                entry.root_uri
            );
        }
    }

    #[test]
    fn test_partial_with_no_roots_fragment() {
        let host = MemoryHost::new().with_file("orphan.yaml", "type: object\n");
        let mut caches = EngineCaches::new();
        let context = resolve_linting_context(
            "orphan.yaml",
            &host,
            &mut caches,
            &ResolveOptions::default(),
        );
        assert_eq!(context.mode, LintMode::Fragment);
        assert_eq!(context.uris, vec!["orphan.yaml"]);
        assert!(context.context.is_some());
    }

    #[test]
    fn test_unknown_document_fragment() {
        let host = MemoryHost::new().with_file("notes.yaml", "hello: world\n");
        let mut caches = EngineCaches::new();
        let context =
            resolve_linting_context("notes.yaml", &host, &mut caches, &ResolveOptions::default());
        assert_eq!(context.mode, LintMode::Fragment);
        assert!(context.root_uris.is_empty());
    }

    #[test]
    fn test_unloadable_uri_fragment() {
        let host = MemoryHost::new();
        let mut caches = EngineCaches::new();
        let context = resolve_linting_context(
            "missing.yaml",
            &host,
            &mut caches,
            &ResolveOptions::default(),
        );
        assert_eq!(context.mode, LintMode::Fragment);
        assert!(context.context.is_none());
    }

    #[test]
    fn test_unresolved_member_survives() {
        // A $ref to a missing file keeps the edge,
        // unresolved, and does not fail the build.
        let host = MemoryHost::new().with_file("api.yaml", root_with_ref("./nope.yaml#/Pet"));
        let mut caches = EngineCaches::new();
        let context =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        let project = context.context.unwrap();
        assert_eq!(project.documents.len(), 1);
        let unresolved: Vec<_> = project
            .graph
            .all_edges()
            .iter()
            .filter(|e| !e.resolved)
            .collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].to_uri, "nope.yaml");
    }

    #[test]
    fn test_project_cache_hit_keeps_identity() {
        // No file changes -> the same ProjectContext identity.
        let host = MemoryHost::new().with_file("api.yaml", "openapi: 3.0.3\npaths: {}\n");
        let mut caches = EngineCaches::new();
        let first =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        let second =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        assert!(Arc::ptr_eq(
            first.context.as_ref().unwrap(),
            second.context.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_project_cache_invalidated_on_member_change() {
        let mut host = MemoryHost::new()
            .with_file("api.yaml", root_with_ref("./Pet.yaml#/Pet"))
            .with_file("Pet.yaml", "Pet:\n  type: object\n");
        let mut caches = EngineCaches::new();
        let first =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());

        // A member's content changes on disk; hash validation rebuilds.
        host.insert("Pet.yaml", "Pet:\n  type: string\n");
        let second =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        assert!(!Arc::ptr_eq(
            first.context.as_ref().unwrap(),
            second.context.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_cache_invalidated_when_unresolved_target_appears() {
        let mut host = MemoryHost::new().with_file("api.yaml", root_with_ref("./Pet.yaml#/Pet"));
        let mut caches = EngineCaches::new();
        let first =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        assert_eq!(first.context.as_ref().unwrap().documents.len(), 1);

        // The missing member appears; the cached entry is stale.
        host.insert("Pet.yaml", "Pet:\n  type: object\n");
        let second =
            resolve_linting_context("api.yaml", &host, &mut caches, &ResolveOptions::default());
        assert_eq!(second.context.as_ref().unwrap().documents.len(), 2);
    }
}
