//! Fluent builder for [`FilePatch`]es.
//!
//! A builder targets one URI, optionally anchored at a base pointer;
//! field names containing `/` or `~` are escaped on the way in.

use serde_json::Value;

use crate::core::pointer::{escape_segment, normalize_pointer};
use crate::diagnostics::{FilePatch, PatchOp};

#[derive(Debug, Clone)]
pub struct FixBuilder {
    uri: String,
    base: String,
    ops: Vec<PatchOp>,
}

impl FixBuilder {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            base: "#".to_string(),
            ops: Vec::new(),
        }
    }

    /// Anchor subsequent operations at a base pointer.
    pub fn at(mut self, base_ptr: &str) -> Self {
        self.base = normalize_pointer(base_ptr);
        self
    }

    fn path_of(&self, name: &str) -> String {
        format!("{}/{}", self.base, escape_segment(name))
    }

    fn path_of_segments(&self, segments: &[&str]) -> String {
        let mut path = self.base.clone();
        for segment in segments {
            path.push('/');
            path.push_str(&escape_segment(segment));
        }
        path
    }

    pub fn add_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Add {
            path: self.path_of(name),
            value: value.into(),
        });
        self
    }

    pub fn add_at_path(mut self, segments: &[&str], value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Add {
            path: self.path_of_segments(segments),
            value: value.into(),
        });
        self
    }

    pub fn set_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.ops.push(PatchOp::Replace {
            path: self.path_of(name),
            value: value.into(),
        });
        self
    }

    pub fn remove_field(mut self, name: &str) -> Self {
        self.ops.push(PatchOp::Remove {
            path: self.path_of(name),
        });
        self
    }

    pub fn build(self) -> FilePatch {
        FilePatch {
            uri: self.uri,
            ops: self.ops,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::PatchOp;
    use crate::runner::fix::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_field_at_base() {
        let patch = FixBuilder::new("api.yaml")
            .at("#/paths/~1x/get")
            .add_field("tags", serde_json::json!(["pets"]))
            .build();
        assert_eq!(patch.uri, "api.yaml");
        assert_eq!(patch.ops.len(), 1);
        match &patch.ops[0] {
            PatchOp::Add { path, value } => {
                assert_eq!(path, "#/paths/~1x/get/tags");
                assert_eq!(value, &serde_json::json!(["pets"]));
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_segment_escaping() {
        let patch = FixBuilder::new("api.yaml")
            .add_at_path(&["paths", "/users/{id}", "get"], serde_json::json!({}))
            .build();
        match &patch.ops[0] {
            PatchOp::Add { path, .. } => {
                assert_eq!(path, "#/paths/~1users~1{id}/get");
            }
            other => panic!("unexpected op: {:?}", other),
        }
    }

    #[test]
    fn test_set_and_remove() {
        let patch = FixBuilder::new("api.yaml")
            .at("#/info")
            .set_field("title", "Better title")
            .remove_field("x-legacy")
            .build();
        assert_eq!(patch.ops.len(), 2);
        assert!(matches!(&patch.ops[0], PatchOp::Replace { path, .. } if path == "#/info/title"));
        assert!(matches!(&patch.ops[1], PatchOp::Remove { path } if path == "#/info/x-legacy"));
    }

    #[test]
    fn test_tilde_escaping() {
        let patch = FixBuilder::new("x.yaml").add_field("a~b", 1).build();
        assert!(matches!(&patch.ops[0], PatchOp::Add { path, .. } if path == "#/a~0b"));
    }
}
