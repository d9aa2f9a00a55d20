//! Built-in rule implementations.
//!
//! Each rule is a struct implementing `runner::Rule`, one per file.
//! `recommended()` is the default preset the CLI runs.

pub mod info_schema;
pub mod numeric_format;
pub mod operation_error_responses;
pub mod operation_id_camel_case;
pub mod tags_required;
pub mod unresolved_ref;

use crate::runner::Rule;

pub use info_schema::InfoSchema;
pub use numeric_format::NumericFormat;
pub use operation_error_responses::OperationErrorResponses;
pub use operation_id_camel_case::OperationIdCamelCase;
pub use tags_required::TagsRequired;
pub use unresolved_ref::UnresolvedRef;

/// The recommended preset, in dispatch order.
pub fn recommended() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(UnresolvedRef::new()),
        Box::new(InfoSchema::new()),
        Box::new(NumericFormat::new()),
        Box::new(TagsRequired::new()),
        Box::new(OperationErrorResponses::new()),
        Box::new(OperationIdCamelCase::new()),
    ]
}

/// Look up a built-in rule by id.
pub fn by_id(id: &str) -> Option<Box<dyn Rule>> {
    recommended().into_iter().find(|rule| rule.meta().id == id)
}
