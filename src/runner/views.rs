//! Typed entity payloads handed to rule visitors.
//!
//! Views pair an indexed atom with its IR node and add accessor helpers
//! (`summary()`, `tags()`, `each_parameter(...)`). Derived collections
//! memoize per view instance; views are created at dispatch time and
//! never outlive a single pass.

use std::cell::OnceCell;

use crate::core::atoms::{
    CallbackRef, ComponentRef, ExampleRef, HeaderRef, LinkRef, MediaTypeRef, NodeRef,
    OperationRef, ParameterRef, PathItemRef, ReferenceRef, RequestBodyRef, ResponseRef, SchemaRef,
    SecurityRequirementRef,
};
use crate::core::document::{IrNode, ParsedDocument};

/// An addressable report target. Everything a visitor receives can be
/// passed to `report_at` / `report_here`.
#[derive(Debug, Clone, Copy)]
pub struct ReportTarget<'a> {
    pub uri: &'a str,
    pub ptr: &'a str,
}

pub trait Locate {
    fn target(&self) -> ReportTarget<'_>;
}

impl Locate for NodeRef {
    fn target(&self) -> ReportTarget<'_> {
        ReportTarget {
            uri: &self.uri,
            ptr: &self.ptr,
        }
    }
}

impl Locate for ReportTarget<'_> {
    fn target(&self) -> ReportTarget<'_> {
        *self
    }
}

macro_rules! locate_via_node {
    ($($ty:ident),+ $(,)?) => {
        $(impl Locate for $ty<'_> {
            fn target(&self) -> ReportTarget<'_> {
                ReportTarget { uri: &self.r.node.uri, ptr: &self.r.node.ptr }
            }
        })+
    };
}

// ============================================================
// Document-level views
// ============================================================

/// The whole-file payload; fires for every file, even non-root ones.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    pub uri: &'a str,
    pub doc: &'a ParsedDocument,
}

impl Locate for DocumentView<'_> {
    fn target(&self) -> ReportTarget<'_> {
        ReportTarget {
            uri: self.uri,
            ptr: "#",
        }
    }
}

/// The top-level object of a root document.
#[derive(Debug, Clone, Copy)]
pub struct RootView<'a> {
    pub uri: &'a str,
    pub node: &'a IrNode,
}

impl Locate for RootView<'_> {
    fn target(&self) -> ReportTarget<'_> {
        ReportTarget {
            uri: self.uri,
            ptr: &self.node.ptr,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InfoView<'a> {
    pub uri: &'a str,
    pub node: &'a IrNode,
}

impl<'a> InfoView<'a> {
    pub fn title(&self) -> Option<&'a str> {
        self.node.child("title").and_then(IrNode::as_str)
    }

    pub fn version(&self) -> Option<&'a str> {
        self.node.child("version").and_then(IrNode::as_str)
    }

    pub fn description(&self) -> Option<&'a str> {
        self.node.child("description").and_then(IrNode::as_str)
    }
}

impl Locate for InfoView<'_> {
    fn target(&self) -> ReportTarget<'_> {
        ReportTarget {
            uri: self.uri,
            ptr: &self.node.ptr,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagView<'a> {
    pub uri: &'a str,
    pub node: &'a IrNode,
}

impl<'a> TagView<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.node.child("name").and_then(IrNode::as_str)
    }
}

impl Locate for TagView<'_> {
    fn target(&self) -> ReportTarget<'_> {
        ReportTarget {
            uri: self.uri,
            ptr: &self.node.ptr,
        }
    }
}

// ============================================================
// Path items and operations
// ============================================================

#[derive(Debug)]
pub struct PathItemView<'a> {
    pub r: &'a PathItemRef,
    pub node: &'a IrNode,
}

impl<'a> PathItemView<'a> {
    pub fn path(&self) -> &'a str {
        &self.r.path
    }

    pub fn is_reference(&self) -> bool {
        self.r.reference.is_some()
    }
}

pub struct OperationView<'a> {
    pub r: &'a OperationRef,
    pub node: &'a IrNode,
    tags: OnceCell<Vec<&'a str>>,
    response_statuses: OnceCell<Vec<&'a str>>,
}

impl<'a> OperationView<'a> {
    pub fn new(r: &'a OperationRef, node: &'a IrNode) -> Self {
        Self {
            r,
            node,
            tags: OnceCell::new(),
            response_statuses: OnceCell::new(),
        }
    }

    pub fn method(&self) -> &'a str {
        &self.r.method
    }

    pub fn path(&self) -> &'a str {
        &self.r.path
    }

    pub fn operation_id(&self) -> Option<&'a str> {
        self.node.child("operationId").and_then(IrNode::as_str)
    }

    pub fn summary(&self) -> Option<&'a str> {
        self.node.child("summary").and_then(IrNode::as_str)
    }

    pub fn description(&self) -> Option<&'a str> {
        self.node.child("description").and_then(IrNode::as_str)
    }

    /// Tag names, memoized per view.
    pub fn tags(&self) -> &[&'a str] {
        self.tags.get_or_init(|| {
            self.node
                .child("tags")
                .map(|tags| tags.children.iter().filter_map(IrNode::as_str).collect())
                .unwrap_or_default()
        })
    }

    /// Response status keys (`200`, `default`, ...), memoized per view.
    pub fn response_statuses(&self) -> &[&'a str] {
        self.response_statuses.get_or_init(|| {
            self.node
                .child("responses")
                .map(|responses| {
                    responses
                        .children
                        .iter()
                        .filter_map(|c| c.key.as_deref())
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    pub fn responses_node(&self) -> Option<&'a IrNode> {
        self.node.child("responses")
    }

    /// Visit each parameter entry of the operation.
    pub fn each_parameter(&self, mut visit: impl FnMut(&'a IrNode, NodeRef)) {
        if let Some(parameters) = self.node.child("parameters") {
            for parameter in &parameters.children {
                let node_ref = NodeRef::new(self.r.node.uri.clone(), parameter.ptr.clone());
                visit(parameter, node_ref);
            }
        }
    }
}

// ============================================================
// Schemas
// ============================================================

pub struct SchemaView<'a> {
    pub r: &'a SchemaRef,
    pub node: &'a IrNode,
    required: OnceCell<Vec<&'a str>>,
}

impl<'a> SchemaView<'a> {
    pub fn new(r: &'a SchemaRef, node: &'a IrNode) -> Self {
        Self {
            r,
            node,
            required: OnceCell::new(),
        }
    }

    pub fn ty(&self) -> Option<&'a str> {
        self.node.child("type").and_then(IrNode::as_str)
    }

    pub fn format(&self) -> Option<&'a str> {
        self.node.child("format").and_then(IrNode::as_str)
    }

    pub fn has_ref(&self) -> bool {
        self.node.child("$ref").is_some()
    }

    pub fn properties(&self) -> Option<&'a IrNode> {
        self.node.child("properties")
    }

    pub fn items(&self) -> Option<&'a IrNode> {
        self.node.child("items")
    }

    /// Names listed in the schema's `required` array, memoized per view.
    pub fn required_properties(&self) -> &[&'a str] {
        self.required.get_or_init(|| {
            self.node
                .child("required")
                .map(|req| req.children.iter().filter_map(IrNode::as_str).collect())
                .unwrap_or_default()
        })
    }

    pub fn is_object_schema(&self) -> bool {
        self.ty() == Some("object")
            || (self.ty().is_none() && self.properties().is_some())
    }
}

// ============================================================
// Remaining entity views
// ============================================================

#[derive(Debug)]
pub struct ComponentView<'a> {
    pub r: &'a ComponentRef,
    pub node: &'a IrNode,
}

impl<'a> ComponentView<'a> {
    pub fn name(&self) -> &'a str {
        &self.r.name
    }
}

#[derive(Debug)]
pub struct ParameterView<'a> {
    pub r: &'a ParameterRef,
    pub node: &'a IrNode,
}

impl<'a> ParameterView<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.node.child("name").and_then(IrNode::as_str)
    }

    pub fn location(&self) -> Option<&'a str> {
        self.node.child("in").and_then(IrNode::as_str)
    }

    pub fn is_required(&self) -> bool {
        self.node
            .child("required")
            .and_then(|n| n.scalar.as_ref())
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[derive(Debug)]
pub struct ResponseView<'a> {
    pub r: &'a ResponseRef,
    pub node: &'a IrNode,
}

impl<'a> ResponseView<'a> {
    pub fn status(&self) -> Option<&str> {
        self.r.status.as_deref()
    }

    pub fn description(&self) -> Option<&'a str> {
        self.node.child("description").and_then(IrNode::as_str)
    }
}

#[derive(Debug)]
pub struct RequestBodyView<'a> {
    pub r: &'a RequestBodyRef,
    pub node: &'a IrNode,
}

#[derive(Debug)]
pub struct HeaderView<'a> {
    pub r: &'a HeaderRef,
    pub node: &'a IrNode,
}

#[derive(Debug)]
pub struct MediaTypeView<'a> {
    pub r: &'a MediaTypeRef,
    pub node: &'a IrNode,
}

impl<'a> MediaTypeView<'a> {
    pub fn media_type(&self) -> &'a str {
        &self.r.media_type
    }

    pub fn schema(&self) -> Option<&'a IrNode> {
        self.node.child("schema")
    }
}

#[derive(Debug)]
pub struct SecurityRequirementView<'a> {
    pub r: &'a SecurityRequirementRef,
    pub node: &'a IrNode,
}

#[derive(Debug)]
pub struct ExampleView<'a> {
    pub r: &'a ExampleRef,
    pub node: &'a IrNode,
}

#[derive(Debug)]
pub struct LinkView<'a> {
    pub r: &'a LinkRef,
    pub node: &'a IrNode,
}

#[derive(Debug)]
pub struct CallbackView<'a> {
    pub r: &'a CallbackRef,
    pub node: &'a IrNode,
}

#[derive(Debug)]
pub struct ReferenceView<'a> {
    pub r: &'a ReferenceRef,
    pub node: &'a IrNode,
}

impl<'a> ReferenceView<'a> {
    pub fn ref_string(&self) -> &'a str {
        &self.r.target
    }

    pub fn is_resolved(&self) -> bool {
        self.r.resolved
    }

    /// The `$ref` property's value node, for precise ranges.
    pub fn ref_value_node(&self) -> Option<&'a IrNode> {
        self.node.child("$ref")
    }
}

locate_via_node!(
    PathItemView,
    OperationView,
    SchemaView,
    ComponentView,
    ParameterView,
    ResponseView,
    RequestBodyView,
    HeaderView,
    MediaTypeView,
    SecurityRequirementView,
    ExampleView,
    LinkView,
    CallbackView,
    ReferenceView,
);

#[cfg(test)]
mod tests {
    use crate::core::atoms::{NodeRef, OperationRef};
    use crate::core::document::DocumentFormat;
    use crate::core::loader::parse_document;
    use crate::runner::views::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operation_view_accessors() {
        let raw = "\
get:
  operationId: listPets
  summary: List pets
  tags: [pets, public]
  responses:
    '200':
      description: ok
    '404':
      description: missing
";
        let doc = parse_document("x.yaml", raw.to_string(), DocumentFormat::Yaml, 0);
        let ir = doc.ir.as_ref().unwrap();
        let node = ir.find_by_pointer("#/get").unwrap();
        let r = OperationRef {
            node: NodeRef::new("x.yaml", "#/get"),
            method: "get".into(),
            path: "/pets".into(),
            operation_id: Some("listPets".into()),
            owner: NodeRef::new("x.yaml", "#"),
        };
        let view = OperationView::new(&r, node);

        assert_eq!(view.operation_id(), Some("listPets"));
        assert_eq!(view.summary(), Some("List pets"));
        assert_eq!(view.tags(), &["pets", "public"]);
        // Memoized: a second call returns the same contents.
        assert_eq!(view.tags(), &["pets", "public"]);
        assert_eq!(view.response_statuses(), &["200", "404"]);

        let mut params = 0;
        view.each_parameter(|_, _| params += 1);
        assert_eq!(params, 0);

        let target = view.target();
        assert_eq!(target.uri, "x.yaml");
        assert_eq!(target.ptr, "#/get");
    }

    #[test]
    fn test_schema_view_required() {
        use crate::core::atoms::{SchemaLocation, SchemaRef};
        let raw = "type: object\nrequired: [id, name]\nproperties:\n  id:\n    type: integer\n";
        let doc = parse_document("x.yaml", raw.to_string(), DocumentFormat::Yaml, 0);
        let ir = doc.ir.as_ref().unwrap();
        let r = SchemaRef {
            node: NodeRef::new("x.yaml", "#"),
            depth: 0,
            location: SchemaLocation::Component,
            location_index: None,
            property_name: None,
            is_required: None,
            parent: None,
        };
        let view = SchemaView::new(&r, ir);
        assert_eq!(view.ty(), Some("object"));
        assert_eq!(view.required_properties(), &["id", "name"]);
        assert!(view.is_object_schema());
        assert!(!view.has_ref());
    }
}
