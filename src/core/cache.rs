//! Engine caches.
//!
//! The caches are the engine's only shared state. They are single-writer:
//! entry points take them by mutable reference so callers control
//! lifecycles, and an entry is either fully initialized or absent. File
//! change notifications arrive through [`EngineCaches::handle_file_change`],
//! which invalidates the document-type entry for the URI and every project
//! entry whose member set includes it.

use std::collections::HashMap;

use std::sync::Arc;

use crate::core::context::ProjectContext;
use crate::core::doc_type::{DocumentType, classify};
use crate::core::host::Host;
use crate::core::loader::load_document;

// ============================================================
// Document-type cache
// ============================================================

#[derive(Debug, Clone)]
pub struct DocTypeEntry {
    pub doc_type: DocumentType,
    pub doc: Option<Arc<crate::core::document::ParsedDocument>>,
}

/// `uri -> {type, loadedDoc}`; the type is computed once per content hash
/// and invalidated on file-change notifications.
#[derive(Default)]
pub struct DocumentTypeCache {
    entries: HashMap<String, DocTypeEntry>,
}

impl DocumentTypeCache {
    /// Classify a document, loading it on a cache miss. An unreadable URI
    /// is `Unknown` with no document.
    pub fn get_or_load(
        &mut self,
        uri: &str,
        host: &dyn Host,
    ) -> (DocumentType, Option<Arc<crate::core::document::ParsedDocument>>) {
        if let Some(entry) = self.entries.get(uri) {
            return (entry.doc_type, entry.doc.clone());
        }
        let entry = match host.read(uri) {
            Ok(content) => {
                let doc = Arc::new(load_document(uri, content.text, content.mtime));
                DocTypeEntry {
                    doc_type: classify(&doc),
                    doc: Some(doc),
                }
            }
            Err(_) => DocTypeEntry {
                doc_type: DocumentType::Unknown,
                doc: None,
            },
        };
        let result = (entry.doc_type, entry.doc.clone());
        self.entries.insert(uri.to_string(), entry);
        result
    }

    pub fn invalidate(&mut self, uri: &str) {
        self.entries.remove(uri);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================
// Project-context cache
// ============================================================

pub struct ProjectCacheEntry {
    pub context: Arc<ProjectContext>,
    /// Member URI -> content hash at build time.
    pub member_hashes: HashMap<String, String>,
    /// Targets of unresolved edges at build time; if one appears, the
    /// member set would grow and the entry is stale.
    pub unresolved_targets: Vec<String>,
    /// Creation time in milliseconds.
    pub ts: u64,
}

/// `rootUri -> built project context`, validated on each lookup by
/// re-reading every member's hash.
#[derive(Default)]
pub struct ProjectContextCache {
    entries: HashMap<String, ProjectCacheEntry>,
}

impl ProjectContextCache {
    /// A still-valid cached context, or `None`. Validation re-reads every
    /// member: a changed hash, a removed member, or a newly appeared
    /// unresolved target invalidates the entry.
    pub fn lookup(&mut self, root_uri: &str, host: &dyn Host) -> Option<Arc<ProjectContext>> {
        let entry = self.entries.get(root_uri)?;
        let mut valid = true;
        for (uri, hash) in &entry.member_hashes {
            match host.read(uri) {
                Ok(content) if &content.hash == hash => {}
                _ => {
                    valid = false;
                    break;
                }
            }
        }
        if valid {
            for target in &entry.unresolved_targets {
                if host.exists(target) {
                    valid = false;
                    break;
                }
            }
        }
        if !valid {
            self.entries.remove(root_uri);
            return None;
        }
        Some(self.entries[root_uri].context.clone())
    }

    pub fn insert(&mut self, root_uri: &str, context: Arc<ProjectContext>) {
        let member_hashes = context
            .documents
            .iter()
            .map(|(uri, doc)| (uri.clone(), doc.hash.clone()))
            .collect();
        let unresolved_targets = context
            .graph
            .all_edges()
            .iter()
            .filter(|e| !e.resolved)
            .map(|e| e.to_uri.clone())
            .collect();
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.entries.insert(
            root_uri.to_string(),
            ProjectCacheEntry {
                context,
                member_hashes,
                unresolved_targets,
                ts,
            },
        );
    }

    pub fn invalidate_member(&mut self, uri: &str) {
        self.entries.retain(|_, entry| {
            !entry.member_hashes.contains_key(uri)
                && !entry.unresolved_targets.iter().any(|t| t == uri)
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================
// Schema validator cache
// ============================================================

/// Compiled JSON-Schema validators memoized by SHA-1 of the serialized
/// schema.
#[derive(Default)]
pub struct SchemaValidatorCache {
    entries: HashMap<String, Arc<jsonschema::Validator>>,
}

impl SchemaValidatorCache {
    pub fn get(&self, key: &str) -> Option<Arc<jsonschema::Validator>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, validator: Arc<jsonschema::Validator>) {
        self.entries.insert(key, validator);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================
// Bundle
// ============================================================

/// All process-wide caches, passed by reference into the entry points.
#[derive(Default)]
pub struct EngineCaches {
    pub doc_types: DocumentTypeCache,
    pub projects: ProjectContextCache,
    pub schema_validators: SchemaValidatorCache,
}

impl EngineCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// File-change protocol: invalidate the document-type entry and every
    /// project whose member set (or unresolved-target set) includes the
    /// URI. Running requests are not preempted; the new state takes
    /// effect on the next lint invocation.
    pub fn handle_file_change(&mut self, uri: &str) {
        self.doc_types.invalidate(uri);
        self.projects.invalidate_member(uri);
    }
}
