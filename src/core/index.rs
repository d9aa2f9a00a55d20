//! Atom extraction and the project index.
//!
//! Given the documents of a project context and its reference graph, this
//! module extracts every OpenAPI entity into per-kind tables keyed by
//! `"{uri}#{ptr}"` for O(1) rule access. Extraction order per document:
//! path items, operations, components, schemas (recursive), the remaining
//! entity kinds, references. Table iteration order is insertion order,
//! which makes rule dispatch deterministic.

use std::collections::HashSet;

use indexmap::IndexMap;
use std::sync::Arc;

use crate::core::atoms::{
    CallbackRef, ComponentKind, ComponentRef, ExampleRef, HeaderRef, LinkRef, MediaTypeRef,
    NodeRef, OperationRef, ParameterRef, PathItemRef, ReferenceRef, RequestBodyRef, ResponseRef,
    SchemaLocation, SchemaRef, SecurityRequirementRef, SecuritySchemeRef,
};
use crate::core::cancel::CancelToken;
use crate::core::doc_type::{HTTP_METHODS, is_http_method};
use crate::core::document::{IrKind, IrNode, ParsedDocument};
use crate::core::graph::{DocMap, RefGraph, node_key};

// ============================================================
// Version
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenApiVersion {
    V2_0,
    V3_0,
    V3_1,
    V3_2,
    #[default]
    Unknown,
}

impl OpenApiVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            OpenApiVersion::V2_0 => "2.0",
            OpenApiVersion::V3_0 => "3.0",
            OpenApiVersion::V3_1 => "3.1",
            OpenApiVersion::V3_2 => "3.2",
            OpenApiVersion::Unknown => "unknown",
        }
    }

    /// 3.1 and later support `components.pathItems`.
    pub fn has_component_path_items(self) -> bool {
        matches!(self, OpenApiVersion::V3_1 | OpenApiVersion::V3_2)
    }

    /// 3.2 adds the `query` method and `additionalOperations`.
    pub fn has_extended_operations(self) -> bool {
        self == OpenApiVersion::V3_2
    }
}

impl std::fmt::Display for OpenApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deduce the project version from the first root document seen.
pub fn detect_version(docs: &DocMap) -> OpenApiVersion {
    for doc in docs.values() {
        let Some(ir) = &doc.ir else { continue };
        if let Some(version) = ir.child("openapi").and_then(IrNode::as_str) {
            if version.starts_with("3.2") {
                return OpenApiVersion::V3_2;
            }
            if version.starts_with("3.1") {
                return OpenApiVersion::V3_1;
            }
            if version.starts_with("3.0") {
                return OpenApiVersion::V3_0;
            }
        }
        if let Some(version) = ir.child("swagger").and_then(IrNode::as_str)
            && version.starts_with("2.")
        {
            return OpenApiVersion::V2_0;
        }
    }
    OpenApiVersion::Unknown
}

// ============================================================
// Project index
// ============================================================

/// Aggregated entity tables over all documents of a context.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    pub version: OpenApiVersion,
    /// Path string -> every path-item entry exposing it.
    pub paths_by_string: IndexMap<String, Vec<PathItemRef>>,
    /// Path-item node key -> the path strings exposing it (inverse).
    pub path_items_to_paths: IndexMap<String, Vec<String>>,
    /// Enclosing path-item node key -> its operations.
    pub operations_by_owner: IndexMap<String, Vec<OperationRef>>,
    pub components: IndexMap<ComponentKind, IndexMap<String, ComponentRef>>,
    pub security_schemes: IndexMap<String, SecuritySchemeRef>,
    pub schemas: IndexMap<String, SchemaRef>,
    pub parameters: IndexMap<String, ParameterRef>,
    pub responses: IndexMap<String, ResponseRef>,
    pub request_bodies: IndexMap<String, RequestBodyRef>,
    pub headers: IndexMap<String, HeaderRef>,
    pub media_types: IndexMap<String, MediaTypeRef>,
    pub security_requirements: IndexMap<String, SecurityRequirementRef>,
    pub examples: IndexMap<String, ExampleRef>,
    pub links: IndexMap<String, LinkRef>,
    pub callbacks: IndexMap<String, CallbackRef>,
    /// Every object holding a `$ref`, regardless of enclosing kind.
    pub references: IndexMap<String, ReferenceRef>,
    pub documents: IndexMap<String, Arc<ParsedDocument>>,
}

impl ProjectIndex {
    pub fn component(&self, kind: ComponentKind, name: &str) -> Option<&ComponentRef> {
        self.components.get(&kind)?.get(name)
    }

    /// Direct schema children of a parent schema node, in index order.
    pub fn schema_children(&self, parent: &NodeRef) -> Vec<&SchemaRef> {
        self.schemas
            .values()
            .filter(|s| s.parent.as_ref() == Some(parent))
            .collect()
    }

    /// Schema roots (depth 0), in index order.
    pub fn schema_roots(&self) -> Vec<&SchemaRef> {
        self.schemas.values().filter(|s| s.depth == 0).collect()
    }
}

/// Extract atoms from every document and aggregate the index.
pub fn build_index(docs: &DocMap, graph: &RefGraph, cancel: &CancelToken) -> ProjectIndex {
    let mut index = ProjectIndex {
        version: detect_version(docs),
        documents: docs.clone(),
        ..Default::default()
    };
    for kind in ComponentKind::ALL {
        index.components.insert(*kind, IndexMap::new());
    }

    let mut extractor = Extractor {
        index: &mut index,
        graph,
        seen_owners: HashSet::new(),
    };
    for (uri, doc) in docs {
        if cancel.is_cancelled() {
            break;
        }
        extractor.extract_document(uri, doc);
    }
    index
}

struct Extractor<'a> {
    index: &'a mut ProjectIndex,
    graph: &'a RefGraph,
    seen_owners: HashSet<String>,
}

impl<'a> Extractor<'a> {
    fn extract_document(&mut self, uri: &str, doc: &Arc<ParsedDocument>) {
        let Some(ir) = &doc.ir else { return };

        self.extract_paths(uri, ir);
        self.extract_components(uri, ir);
        self.extract_security_requirements(uri, ir);
        self.extract_schema_roots(uri, ir);
        self.extract_references(uri);
    }

    // --- paths and operations ---

    fn extract_paths(&mut self, uri: &str, ir: &IrNode) {
        let Some(paths) = ir.child("paths") else { return };
        if paths.kind != IrKind::Object {
            return;
        }
        for entry in &paths.children {
            let Some(path) = entry.key.clone() else { continue };
            if !path.starts_with('/') {
                continue;
            }
            let own = NodeRef::new(uri, entry.ptr.clone());

            // A `$ref` entry points the definition elsewhere; the graph's
            // first outgoing edge tells us where.
            let (definition, reference) = if entry.child("$ref").is_some() {
                let target = self
                    .graph
                    .first_edge_at(uri, &entry.ptr)
                    .map(|edge| NodeRef::new(edge.to_uri.clone(), edge.to_ptr.clone()));
                (target, Some(own.clone()))
            } else {
                (None, None)
            };

            let item = PathItemRef {
                node: own.clone(),
                path: path.clone(),
                definition: definition.clone(),
                reference,
            };

            let item_key = definition
                .as_ref()
                .map(NodeRef::key)
                .unwrap_or_else(|| own.key());
            self.index
                .paths_by_string
                .entry(path.clone())
                .or_default()
                .push(item.clone());
            self.index
                .path_items_to_paths
                .entry(item_key)
                .or_default()
                .push(path.clone());

            self.extract_operations(&item, &path);
        }
    }

    /// Operations are keyed by the defining path item's node so that
    /// referenced items deduplicate; the first path string wins for the
    /// `path` field of the shared operations.
    fn extract_operations(&mut self, item: &PathItemRef, path: &str) {
        let owner = item.definition.as_ref().unwrap_or(&item.node).clone();
        if !self.seen_owners.insert(owner.key()) {
            return;
        }
        let Some(item_node) = self.node_at(&owner) else {
            return;
        };
        let extended = self.index.version.has_extended_operations();

        let mut operations = Vec::new();
        for child in &item_node.children {
            let Some(method) = child.key.as_deref() else { continue };
            if is_http_method(method, extended) {
                operations.push(self.make_operation(&owner, child, method, path));
            } else if method == "additionalOperations" && extended {
                for op_node in &child.children {
                    let Some(custom) = op_node.key.as_deref() else { continue };
                    operations.push(self.make_operation(&owner, op_node, custom, path));
                }
            }
        }
        if !operations.is_empty() {
            self.index
                .operations_by_owner
                .entry(owner.key())
                .or_default()
                .extend(operations.iter().cloned());
        }

        // Operation-scoped entities.
        for op in &operations {
            let Some(op_node) = self.node_at(&op.node) else { continue };
            self.extract_operation_entities(&op.node.uri.clone(), &op_node);
        }
    }

    fn make_operation(
        &self,
        owner: &NodeRef,
        node: &IrNode,
        method: &str,
        path: &str,
    ) -> OperationRef {
        OperationRef {
            node: NodeRef::new(owner.uri.clone(), node.ptr.clone()),
            method: method.to_string(),
            path: path.to_string(),
            operation_id: node
                .child("operationId")
                .and_then(IrNode::as_str)
                .map(String::from),
            owner: owner.clone(),
        }
    }

    fn extract_operation_entities(&mut self, uri: &str, op_node: &IrNode) {
        // parameters[i]
        if let Some(params) = op_node.child("parameters") {
            for param in &params.children {
                self.add_parameter(uri, param);
            }
        }
        // requestBody
        if let Some(body) = op_node.child("requestBody") {
            self.index.request_bodies.insert(
                node_key(uri, &body.ptr),
                RequestBodyRef {
                    node: NodeRef::new(uri, body.ptr.clone()),
                },
            );
            self.extract_content(uri, body);
        }
        // responses.*
        if let Some(responses) = op_node.child("responses") {
            for response in &responses.children {
                let status = response.key.clone();
                self.index.responses.insert(
                    node_key(uri, &response.ptr),
                    ResponseRef {
                        node: NodeRef::new(uri, response.ptr.clone()),
                        status,
                    },
                );
                self.extract_response_entities(uri, response);
            }
        }
        // callbacks.*
        if let Some(callbacks) = op_node.child("callbacks") {
            for callback in &callbacks.children {
                self.index.callbacks.insert(
                    node_key(uri, &callback.ptr),
                    CallbackRef {
                        node: NodeRef::new(uri, callback.ptr.clone()),
                        name: callback.key.clone(),
                    },
                );
            }
        }
        // security[i]
        if let Some(security) = op_node.child("security") {
            for requirement in &security.children {
                self.index.security_requirements.insert(
                    node_key(uri, &requirement.ptr),
                    SecurityRequirementRef {
                        node: NodeRef::new(uri, requirement.ptr.clone()),
                    },
                );
            }
        }
    }

    fn extract_response_entities(&mut self, uri: &str, response: &IrNode) {
        if let Some(headers) = response.child("headers") {
            for header in &headers.children {
                self.index.headers.insert(
                    node_key(uri, &header.ptr),
                    HeaderRef {
                        node: NodeRef::new(uri, header.ptr.clone()),
                        name: header.key.clone(),
                    },
                );
                self.extract_content(uri, header);
            }
        }
        if let Some(links) = response.child("links") {
            for link in &links.children {
                self.index.links.insert(
                    node_key(uri, &link.ptr),
                    LinkRef {
                        node: NodeRef::new(uri, link.ptr.clone()),
                        name: link.key.clone(),
                    },
                );
            }
        }
        self.extract_content(uri, response);
    }

    /// `content.*` media types plus their examples, shared by request
    /// bodies, responses, parameters, and headers.
    fn extract_content(&mut self, uri: &str, parent: &IrNode) {
        let Some(content) = parent.child("content") else { return };
        for media in &content.children {
            let Some(media_type) = media.key.clone() else { continue };
            self.index.media_types.insert(
                node_key(uri, &media.ptr),
                MediaTypeRef {
                    node: NodeRef::new(uri, media.ptr.clone()),
                    media_type,
                },
            );
            if let Some(examples) = media.child("examples") {
                for example in &examples.children {
                    self.index.examples.insert(
                        node_key(uri, &example.ptr),
                        ExampleRef {
                            node: NodeRef::new(uri, example.ptr.clone()),
                            name: example.key.clone(),
                        },
                    );
                }
            }
        }
    }

    fn add_parameter(&mut self, uri: &str, param: &IrNode) {
        self.index.parameters.insert(
            node_key(uri, &param.ptr),
            ParameterRef {
                node: NodeRef::new(uri, param.ptr.clone()),
            },
        );
        if let Some(examples) = param.child("examples") {
            for example in &examples.children {
                self.index.examples.insert(
                    node_key(uri, &example.ptr),
                    ExampleRef {
                        node: NodeRef::new(uri, example.ptr.clone()),
                        name: example.key.clone(),
                    },
                );
            }
        }
        self.extract_content(uri, param);
    }

    // --- components ---

    fn extract_components(&mut self, uri: &str, ir: &IrNode) {
        // Path-item level parameters also index.
        if let Some(paths) = ir.child("paths") {
            for entry in &paths.children {
                if let Some(params) = entry.child("parameters") {
                    for param in &params.children {
                        self.add_parameter(uri, param);
                    }
                }
            }
        }

        let Some(components) = ir.child("components") else { return };
        let path_items_allowed = self.index.version.has_component_path_items();
        for section in &components.children {
            let Some(kind) = section.key.as_deref().and_then(ComponentKind::parse) else {
                continue;
            };
            if kind == ComponentKind::PathItems && !path_items_allowed {
                continue;
            }
            for entry in &section.children {
                let Some(name) = entry.key.clone() else { continue };
                let component = ComponentRef {
                    node: NodeRef::new(uri, entry.ptr.clone()),
                    kind,
                    name: name.clone(),
                };
                self.index
                    .components
                    .entry(kind)
                    .or_default()
                    .entry(name.clone())
                    .or_insert(component);

                match kind {
                    ComponentKind::SecuritySchemes => {
                        self.index.security_schemes.insert(
                            node_key(uri, &entry.ptr),
                            SecuritySchemeRef {
                                node: NodeRef::new(uri, entry.ptr.clone()),
                                name,
                            },
                        );
                    }
                    ComponentKind::Responses => {
                        let response = ResponseRef {
                            node: NodeRef::new(uri, entry.ptr.clone()),
                            status: None,
                        };
                        self.index
                            .responses
                            .insert(node_key(uri, &entry.ptr), response);
                        self.extract_response_entities(uri, entry);
                    }
                    ComponentKind::Parameters => {
                        self.add_parameter(uri, entry);
                    }
                    ComponentKind::RequestBodies => {
                        self.index.request_bodies.insert(
                            node_key(uri, &entry.ptr),
                            RequestBodyRef {
                                node: NodeRef::new(uri, entry.ptr.clone()),
                            },
                        );
                        self.extract_content(uri, entry);
                    }
                    ComponentKind::Headers => {
                        self.index.headers.insert(
                            node_key(uri, &entry.ptr),
                            HeaderRef {
                                node: NodeRef::new(uri, entry.ptr.clone()),
                                name: entry.key.clone(),
                            },
                        );
                    }
                    ComponentKind::Examples => {
                        self.index.examples.insert(
                            node_key(uri, &entry.ptr),
                            ExampleRef {
                                node: NodeRef::new(uri, entry.ptr.clone()),
                                name: entry.key.clone(),
                            },
                        );
                    }
                    ComponentKind::Links => {
                        self.index.links.insert(
                            node_key(uri, &entry.ptr),
                            LinkRef {
                                node: NodeRef::new(uri, entry.ptr.clone()),
                                name: entry.key.clone(),
                            },
                        );
                    }
                    ComponentKind::Callbacks => {
                        self.index.callbacks.insert(
                            node_key(uri, &entry.ptr),
                            CallbackRef {
                                node: NodeRef::new(uri, entry.ptr.clone()),
                                name: entry.key.clone(),
                            },
                        );
                    }
                    _ => {}
                }
            }
        }
    }

    fn extract_security_requirements(&mut self, uri: &str, ir: &IrNode) {
        let Some(security) = ir.child("security") else { return };
        for requirement in &security.children {
            self.index.security_requirements.insert(
                node_key(uri, &requirement.ptr),
                SecurityRequirementRef {
                    node: NodeRef::new(uri, requirement.ptr.clone()),
                },
            );
        }
    }

    // --- schemas ---

    /// Schema roots: component schemas plus every `schema` object under an
    /// indexed parameter, header, or media type. Each root starts a
    /// recursive descent.
    fn extract_schema_roots(&mut self, uri: &str, ir: &IrNode) {
        if let Some(schemas) = ir
            .child("components")
            .and_then(|c| c.child("schemas"))
        {
            for entry in &schemas.children {
                self.walk_schema(uri, entry, 0, SchemaLocation::Component, None, None, None, None);
            }
        }

        // Bare schema fragments: a non-root document that is itself a
        // schema, or a bare map of schema-shaped entries.
        let is_rootish = ir.child("openapi").is_some()
            || ir.child("swagger").is_some()
            || ir.child("components").is_some()
            || ir.child("paths").is_some();
        if !is_rootish {
            if crate::core::doc_type::has_schema_shape(ir) {
                self.walk_schema(uri, ir, 0, SchemaLocation::Inline, None, None, None, None);
            } else if ir.kind == IrKind::Object {
                for entry in ir
                    .children
                    .iter()
                    .filter(|c| crate::core::doc_type::has_schema_shape(c))
                {
                    self.walk_schema(
                        uri,
                        entry,
                        0,
                        SchemaLocation::Inline,
                        None,
                        None,
                        None,
                        None,
                    );
                }
            }
        }

        // Fragment schemas: nodes in this document that other documents
        // reference from schema positions.
        let mut fragment_roots: Vec<String> = Vec::new();
        for edge in self.graph.all_edges() {
            if edge.to_uri != uri || !edge.resolved || edge.to_ptr == "#" {
                continue;
            }
            if let Some(node) = ir.find_by_pointer(&edge.to_ptr)
                && crate::core::doc_type::has_schema_shape(node)
            {
                fragment_roots.push(edge.to_ptr.clone());
            }
        }
        for ptr in fragment_roots {
            if let Some(node) = ir.find_by_pointer(&ptr) {
                self.walk_schema(uri, node, 0, SchemaLocation::Inline, None, None, None, None);
            }
        }

        // Inline roots hang off already-indexed entities in this document.
        let mut inline_roots: Vec<String> = Vec::new();
        for table_ptr in self
            .index
            .parameters
            .values()
            .map(|p| p.node.clone())
            .chain(self.index.headers.values().map(|h| h.node.clone()))
            .chain(self.index.media_types.values().map(|m| m.node.clone()))
            .collect::<Vec<_>>()
        {
            if table_ptr.uri != uri {
                continue;
            }
            if let Some(node) = ir.find_by_pointer(&table_ptr.ptr)
                && let Some(schema) = node.child("schema")
                && schema.kind == IrKind::Object
            {
                inline_roots.push(schema.ptr.clone());
            }
        }
        for ptr in inline_roots {
            if let Some(schema) = ir.find_by_pointer(&ptr) {
                self.walk_schema(uri, schema, 0, SchemaLocation::Inline, None, None, None, None);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_schema(
        &mut self,
        uri: &str,
        node: &IrNode,
        depth: u32,
        location: SchemaLocation,
        location_index: Option<usize>,
        property_name: Option<String>,
        is_required: Option<bool>,
        parent: Option<NodeRef>,
    ) {
        if node.kind != IrKind::Object {
            return;
        }
        let key = node_key(uri, &node.ptr);
        if self.index.schemas.contains_key(&key) {
            return;
        }
        let has_ref = node.child("$ref").is_some();
        self.index.schemas.insert(
            key,
            SchemaRef {
                node: NodeRef::new(uri, node.ptr.clone()),
                depth,
                location,
                location_index,
                property_name,
                is_required,
                parent,
            },
        );
        // Schemas with `$ref` are indexed but not descended into.
        if has_ref {
            return;
        }

        let self_ref = NodeRef::new(uri, node.ptr.clone());
        let required: Vec<String> = node
            .child("required")
            .map(|r| {
                r.children
                    .iter()
                    .filter_map(|c| c.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(properties) = node.child("properties") {
            for property in &properties.children {
                let name = property.key.clone();
                let is_required = name.as_ref().map(|n| required.contains(n));
                self.walk_schema(
                    uri,
                    property,
                    depth + 1,
                    SchemaLocation::Properties,
                    None,
                    name,
                    is_required,
                    Some(self_ref.clone()),
                );
            }
        }
        if let Some(items) = node.child("items") {
            self.walk_schema(
                uri,
                items,
                depth + 1,
                SchemaLocation::Items,
                None,
                None,
                None,
                Some(self_ref.clone()),
            );
        }
        for (keyword, location) in [
            ("allOf", SchemaLocation::AllOf),
            ("oneOf", SchemaLocation::OneOf),
            ("anyOf", SchemaLocation::AnyOf),
        ] {
            if let Some(list) = node.child(keyword) {
                for (index, branch) in list.children.iter().enumerate() {
                    self.walk_schema(
                        uri,
                        branch,
                        depth + 1,
                        location,
                        Some(index),
                        None,
                        None,
                        Some(self_ref.clone()),
                    );
                }
            }
        }
        if let Some(additional) = node.child("additionalProperties")
            && additional.kind == IrKind::Object
        {
            self.walk_schema(
                uri,
                additional,
                depth + 1,
                SchemaLocation::AdditionalProperties,
                None,
                None,
                None,
                Some(self_ref.clone()),
            );
        }
        if let Some(patterns) = node.child("patternProperties") {
            for pattern in &patterns.children {
                self.walk_schema(
                    uri,
                    pattern,
                    depth + 1,
                    SchemaLocation::PatternProperties,
                    None,
                    pattern.key.clone(),
                    None,
                    Some(self_ref.clone()),
                );
            }
        }
    }

    // --- references ---

    fn extract_references(&mut self, uri: &str) {
        for edge in self.graph.edges_from(uri, None) {
            self.index.references.insert(
                node_key(uri, &edge.from_ptr),
                ReferenceRef {
                    node: NodeRef::new(uri, edge.from_ptr.clone()),
                    target: edge.ref_str.clone(),
                    resolved: edge.resolved,
                },
            );
        }
    }

    // --- helpers ---

    fn node_at(&self, node_ref: &NodeRef) -> Option<IrNode> {
        self.index
            .documents
            .get(&node_ref.uri)
            .and_then(|doc| doc.node_at(&node_ref.ptr))
            .cloned()
    }
}

/// All HTTP method keys for the given version, for callers that enumerate.
pub fn method_keys(version: OpenApiVersion) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = HTTP_METHODS.to_vec();
    if version.has_extended_operations() {
        keys.push("query");
    }
    keys
}
