//! Extracted OpenAPI entities ("atoms").
//!
//! Every indexed entity carries `(uri, ptr)` plus entity-specific fields.
//! The variants are collected under [`EntityRef`] with `enum_dispatch`
//! providing the common addressing accessors, the way the issue enum in a
//! lint pipeline dispatches its reporting trait.

use enum_dispatch::enum_dispatch;

use crate::core::graph::node_key;

/// An addressable node: document URI plus canonical JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub uri: String,
    pub ptr: String,
}

impl NodeRef {
    pub fn new(uri: impl Into<String>, ptr: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ptr: ptr.into(),
        }
    }

    pub fn key(&self) -> String {
        node_key(&self.uri, &self.ptr)
    }
}

/// Common accessors over every atom variant.
#[enum_dispatch]
pub trait Addressable {
    fn node(&self) -> &NodeRef;

    fn uri(&self) -> &str {
        &self.node().uri
    }

    fn ptr(&self) -> &str {
        &self.node().ptr
    }
}

macro_rules! impl_addressable {
    ($($ty:ty),+ $(,)?) => {
        $(impl Addressable for $ty {
            fn node(&self) -> &NodeRef {
                &self.node
            }
        })+
    };
}

// ============================================================
// Path items and operations
// ============================================================

/// A path item, either defined inline under `paths` or referenced out.
#[derive(Debug, Clone, PartialEq)]
pub struct PathItemRef {
    pub node: NodeRef,
    /// The path string this item is exposed under (e.g. `/users/{id}`).
    pub path: String,
    /// Where the item's definition lives when the entry is a `$ref`.
    pub definition: Option<NodeRef>,
    /// The `$ref`-holding entry, when the definition lives elsewhere.
    pub reference: Option<NodeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationRef {
    pub node: NodeRef,
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
    /// Node of the enclosing path item; operations are keyed by it so
    /// referenced path items deduplicate correctly.
    pub owner: NodeRef,
}

// ============================================================
// Components
// ============================================================

/// The component kinds of `#/components`; `pathItems` exists from 3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Schemas,
    Responses,
    Parameters,
    Examples,
    RequestBodies,
    Headers,
    SecuritySchemes,
    Links,
    Callbacks,
    PathItems,
}

impl ComponentKind {
    pub const ALL: &'static [ComponentKind] = &[
        ComponentKind::Schemas,
        ComponentKind::Responses,
        ComponentKind::Parameters,
        ComponentKind::Examples,
        ComponentKind::RequestBodies,
        ComponentKind::Headers,
        ComponentKind::SecuritySchemes,
        ComponentKind::Links,
        ComponentKind::Callbacks,
        ComponentKind::PathItems,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Schemas => "schemas",
            ComponentKind::Responses => "responses",
            ComponentKind::Parameters => "parameters",
            ComponentKind::Examples => "examples",
            ComponentKind::RequestBodies => "requestBodies",
            ComponentKind::Headers => "headers",
            ComponentKind::SecuritySchemes => "securitySchemes",
            ComponentKind::Links => "links",
            ComponentKind::Callbacks => "callbacks",
            ComponentKind::PathItems => "pathItems",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRef {
    pub node: NodeRef,
    pub kind: ComponentKind,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecuritySchemeRef {
    pub node: NodeRef,
    pub name: String,
}

// ============================================================
// Schemas
// ============================================================

/// Where a schema sits relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaLocation {
    Component,
    Inline,
    Properties,
    Items,
    AllOf,
    OneOf,
    AnyOf,
    AdditionalProperties,
    PatternProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRef {
    pub node: NodeRef,
    /// Nesting depth; 0 for schema roots.
    pub depth: u32,
    pub location: SchemaLocation,
    /// Index within `allOf`/`oneOf`/`anyOf` composition lists.
    pub location_index: Option<usize>,
    /// Property name for `properties.*` / `patternProperties.*` children.
    pub property_name: Option<String>,
    /// Whether the property is listed in the parent's `required` array.
    pub is_required: Option<bool>,
    /// The parent schema's node, when this schema was reached by descent.
    pub parent: Option<NodeRef>,
}

// ============================================================
// Other entities
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRef {
    pub node: NodeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRef {
    pub node: NodeRef,
    /// Status code or `default` for operation responses.
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBodyRef {
    pub node: NodeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRef {
    pub node: NodeRef,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaTypeRef {
    pub node: NodeRef,
    /// The content-type key (e.g. `application/json`).
    pub media_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityRequirementRef {
    pub node: NodeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExampleRef {
    pub node: NodeRef,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkRef {
    pub node: NodeRef,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackRef {
    pub node: NodeRef,
    pub name: Option<String>,
}

/// Any object holding a `$ref`, regardless of enclosing kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceRef {
    pub node: NodeRef,
    /// The original `$ref` string.
    pub target: String,
    pub resolved: bool,
}

impl_addressable!(
    PathItemRef,
    OperationRef,
    ComponentRef,
    SecuritySchemeRef,
    SchemaRef,
    ParameterRef,
    ResponseRef,
    RequestBodyRef,
    HeaderRef,
    MediaTypeRef,
    SecurityRequirementRef,
    ExampleRef,
    LinkRef,
    CallbackRef,
    ReferenceRef,
);

/// A tagged entity reference, for code that handles atoms uniformly.
#[enum_dispatch(Addressable)]
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    PathItem(PathItemRef),
    Operation(OperationRef),
    Component(ComponentRef),
    SecurityScheme(SecuritySchemeRef),
    Schema(SchemaRef),
    Parameter(ParameterRef),
    Response(ResponseRef),
    RequestBody(RequestBodyRef),
    Header(HeaderRef),
    MediaType(MediaTypeRef),
    SecurityRequirement(SecurityRequirementRef),
    Example(ExampleRef),
    Link(LinkRef),
    Callback(CallbackRef),
    Reference(ReferenceRef),
}

#[cfg(test)]
mod tests {
    use crate::core::atoms::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_ref_key() {
        let node = NodeRef::new("api.yaml", "#/paths/~1x/get");
        assert_eq!(node.key(), "api.yaml#/paths/~1x/get");
    }

    #[test]
    fn test_component_kind_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::parse(kind.as_str()), Some(*kind));
        }
        assert_eq!(ComponentKind::parse("nope"), None);
    }

    #[test]
    fn test_entity_ref_dispatch() {
        let entity = EntityRef::Operation(OperationRef {
            node: NodeRef::new("api.yaml", "#/paths/~1x/get"),
            method: "get".to_string(),
            path: "/x".to_string(),
            operation_id: None,
            owner: NodeRef::new("api.yaml", "#/paths/~1x"),
        });
        assert_eq!(entity.uri(), "api.yaml");
        assert_eq!(entity.ptr(), "#/paths/~1x/get");
    }
}
