//! Core engine: documents, reference graph, contexts, and the index.
//!
//! The pipeline, leaves first: the loader turns raw text into a
//! [`document::ParsedDocument`]; the document-type cache classifies it;
//! the context resolver picks project-aware, multi-root, or fragment mode
//! and assembles [`context::ProjectContext`]s; the graph and index make
//! every `$ref` edge and OpenAPI entity addressable for rules.

pub mod atoms;
pub mod cache;
pub mod cancel;
pub mod context;
pub mod doc_type;
pub mod document;
pub mod graph;
pub mod host;
pub mod index;
pub mod line_index;
pub mod loader;
pub mod pointer;
pub mod roots;

pub use atoms::{ComponentKind, EntityRef, NodeRef};
pub use cache::EngineCaches;
pub use cancel::CancelToken;
pub use context::{
    LintMode, LintingContext, ProjectContext, ResolveOptions, resolve_linting_context,
};
pub use doc_type::DocumentType;
pub use document::{DocumentFormat, IrKind, IrNode, ParsedDocument};
pub use graph::{DocMap, RefEdge, RefGraph};
pub use host::{FsHost, Host, MemoryHost};
pub use index::{OpenApiVersion, ProjectIndex};
