//! The visitor runner.
//!
//! Dispatch order per file: `Document` (every file), then `Root` /
//! `Info` / `Tag` for root-shaped documents, path items with their
//! operations, components, schemas depth-first (parent before children),
//! the remaining entity kinds, and references. After every file, each
//! rule's `Project` visitor fires once with the aggregated index.
//!
//! Rules never take the engine down: every visitor call is wrapped so a
//! panicking rule logs and the run continues. The cancellation token is
//! checked between files and between dispatch phases; cancellation
//! returns the partial result.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::core::atoms::SchemaRef;
use crate::core::cancel::CancelToken;
use crate::core::context::{LintMode, LintingContext, ProjectContext};
use crate::core::doc_type::{DocumentType, classify};
use crate::core::document::ParsedDocument;
use crate::diagnostics::{Diagnostic, FilePatch, RangePrecision, Severity};
use crate::runner::context::{RuleContext, RunOutput};
use crate::runner::views::{
    CallbackView, ComponentView, DocumentView, ExampleView, HeaderView, InfoView, LinkView,
    Locate, MediaTypeView, OperationView, ParameterView, PathItemView, ReferenceView,
    RequestBodyView, ResponseView, RootView, SchemaView, SecurityRequirementView, TagView,
};
use crate::runner::{Rule, RuleSeverity, RuleState, SeverityOverrides, VisitorKind};

/// The result of one lint run. On cancellation both lists may be
/// incomplete.
#[derive(Debug, Default)]
pub struct LintOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub fixes: Vec<FilePatch>,
}

/// Run the rule list over a resolved linting context.
pub fn lint_document(
    lctx: &LintingContext,
    rules: &[Box<dyn Rule>],
    overrides: &SeverityOverrides,
    cancel: &CancelToken,
) -> LintOutcome {
    let mut out = RunOutput::default();
    match lctx.mode {
        LintMode::ProjectAware | LintMode::Fragment => {
            if let Some(project) = &lctx.context {
                run_project(project, &lctx.uris, rules, overrides, cancel, &mut out);
            }
        }
        LintMode::MultiRoot => {
            for entry in &lctx.multi_root_contexts {
                if cancel.is_cancelled() {
                    break;
                }
                run_project(&entry.context, &entry.uris, rules, overrides, cancel, &mut out);
            }
            dedup_diagnostics(&mut out.diagnostics);
        }
    }
    LintOutcome {
        diagnostics: out.diagnostics,
        fixes: out.fixes,
    }
}

/// Identical findings reported under several roots collapse to one.
fn dedup_diagnostics(diagnostics: &mut Vec<Diagnostic>) {
    let mut seen = std::collections::HashSet::new();
    diagnostics.retain(|d| {
        seen.insert((
            d.code.clone(),
            d.uri.clone(),
            d.message.clone(),
            (d.range.start.line, d.range.start.character),
        ))
    });
}

struct ActiveRule<'a> {
    rule: &'a dyn Rule,
    override_setting: Option<RuleSeverity>,
    state: RuleState,
}

fn run_project(
    project: &ProjectContext,
    uris: &[String],
    rules: &[Box<dyn Rule>],
    overrides: &SeverityOverrides,
    cancel: &CancelToken,
    out: &mut RunOutput,
) {
    // Per-run state, created once.
    let mut active: Vec<ActiveRule> = rules
        .iter()
        .filter(|rule| {
            !matches!(
                overrides.get(&rule.meta().id),
                Some(RuleSeverity::Off)
            )
        })
        .map(|rule| ActiveRule {
            rule: rule.as_ref(),
            override_setting: overrides.get(&rule.meta().id).copied(),
            state: rule.state(),
        })
        .collect();

    for uri in uris {
        if cancel.is_cancelled() {
            return;
        }
        let Some(doc) = project.documents.get(uri) else {
            continue;
        };
        emit_parse_error(uri, doc, out);
        // Unknown documents are never linted.
        if doc.ir.is_none() || classify(doc) == DocumentType::Unknown {
            continue;
        }
        dispatch_file(project, uri, doc, &mut active, cancel, out);
    }

    if cancel.is_cancelled() {
        return;
    }
    // The aggregate pass: each rule's Project visitor, exactly once.
    for entry in &mut active {
        dispatch_one(project, entry, out, |rule, cx, state| {
            rule.check_project(cx, &project.index, state);
        });
    }
}

/// Engine-level diagnostic for malformed documents.
fn emit_parse_error(uri: &str, doc: &ParsedDocument, out: &mut RunOutput) {
    if let Some(failure) = &doc.parse_error {
        let diagnostic = Diagnostic::new(
            "parse-error",
            failure.message.clone(),
            uri,
            failure.range,
            Severity::Error,
        )
        .with_precision(RangePrecision::Exact);
        out.diagnostics.push(diagnostic);
    }
}

fn dispatch_file(
    project: &ProjectContext,
    uri: &str,
    doc: &ParsedDocument,
    active: &mut [ActiveRule],
    cancel: &CancelToken,
    out: &mut RunOutput,
) {
    let format = doc.format;
    let ir = doc.ir.as_ref().expect("caller checked ir");

    // 1. Document - always, every file.
    let document_view = DocumentView { uri, doc };
    for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
        apply_fields(project, entry, VisitorKind::Document, &document_view, ir, out);
        dispatch_one(project, entry, out, |rule, cx, state| {
            rule.check_document(cx, &document_view, state);
        });
    }

    // 2. Root, Info, Tags - only for root-shaped documents.
    if doc.has_root_marker() {
        let root_view = RootView { uri, node: ir };
        for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
            apply_fields(project, entry, VisitorKind::Root, &root_view, ir, out);
            dispatch_one(project, entry, out, |rule, cx, state| {
                rule.check_root(cx, &root_view, state);
            });
        }
        if let Some(info) = ir.child("info") {
            let info_view = InfoView { uri, node: info };
            for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
                apply_fields(project, entry, VisitorKind::Info, &info_view, info, out);
                dispatch_one(project, entry, out, |rule, cx, state| {
                    rule.check_info(cx, &info_view, state);
                });
            }
        }
        if let Some(tags) = ir.child("tags") {
            for tag in &tags.children {
                let tag_view = TagView { uri, node: tag };
                for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
                    apply_fields(project, entry, VisitorKind::Tag, &tag_view, tag, out);
                    dispatch_one(project, entry, out, |rule, cx, state| {
                        rule.check_tag(cx, &tag_view, state);
                    });
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return;
    }

    // 3. Path items, each followed by its operations.
    for items in project.index.paths_by_string.values() {
        for item in items.iter().filter(|i| i.node.uri == uri) {
            let owner = item.definition.as_ref().unwrap_or(&item.node);
            let Some(item_node) = doc.node_at(&item.node.ptr) else {
                continue;
            };
            let item_view = PathItemView { r: item, node: item_node };
            for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
                apply_fields(project, entry, VisitorKind::PathItem, &item_view, item_node, out);
                dispatch_one(project, entry, out, |rule, cx, state| {
                    rule.check_path_item(cx, &item_view, state);
                });
            }

            let Some(operations) = project.index.operations_by_owner.get(&owner.key()) else {
                continue;
            };
            for operation in operations {
                let Some(op_doc) = project.documents.get(&operation.node.uri) else {
                    continue;
                };
                let Some(op_node) = op_doc.node_at(&operation.node.ptr) else {
                    continue;
                };
                let op_view = OperationView::new(operation, op_node);
                for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
                    apply_fields(project, entry, VisitorKind::Operation, &op_view, op_node, out);
                    dispatch_one(project, entry, out, |rule, cx, state| {
                        rule.check_operation(cx, &op_view, state);
                    });
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return;
    }

    // 4. Components.
    for table in project.index.components.values() {
        for component in table.values().filter(|c| c.node.uri == uri) {
            let Some(node) = doc.node_at(&component.node.ptr) else {
                continue;
            };
            let view = ComponentView { r: component, node };
            for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
                apply_fields(project, entry, VisitorKind::Component, &view, node, out);
                dispatch_one(project, entry, out, |rule, cx, state| {
                    rule.check_component(cx, &view, state);
                });
            }
        }
    }

    if cancel.is_cancelled() {
        return;
    }

    // 5. Schemas, depth-first: a rule observes the parent before its
    // children.
    for root in project.index.schema_roots() {
        if root.node.uri == uri {
            dispatch_schema_tree(project, uri, doc, root, active, out);
        }
    }

    // 6. Remaining entity kinds.
    macro_rules! dispatch_table {
        ($table:expr, $kind:expr, $view:ident, $method:ident) => {
            for atom in $table.values().filter(|a| a.node.uri == uri) {
                let Some(node) = doc.node_at(&atom.node.ptr) else { continue };
                let view = $view { r: atom, node };
                for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
                    apply_fields(project, entry, $kind, &view, node, out);
                    dispatch_one(project, entry, out, |rule, cx, state| {
                        rule.$method(cx, &view, state);
                    });
                }
            }
        };
    }

    dispatch_table!(
        project.index.parameters,
        VisitorKind::Parameter,
        ParameterView,
        check_parameter
    );
    dispatch_table!(
        project.index.responses,
        VisitorKind::Response,
        ResponseView,
        check_response
    );
    dispatch_table!(
        project.index.request_bodies,
        VisitorKind::RequestBody,
        RequestBodyView,
        check_request_body
    );
    dispatch_table!(
        project.index.headers,
        VisitorKind::Header,
        HeaderView,
        check_header
    );
    dispatch_table!(
        project.index.media_types,
        VisitorKind::MediaType,
        MediaTypeView,
        check_media_type
    );
    dispatch_table!(
        project.index.security_requirements,
        VisitorKind::SecurityRequirement,
        SecurityRequirementView,
        check_security_requirement
    );
    dispatch_table!(
        project.index.examples,
        VisitorKind::Example,
        ExampleView,
        check_example
    );
    dispatch_table!(project.index.links, VisitorKind::Link, LinkView, check_link);
    dispatch_table!(
        project.index.callbacks,
        VisitorKind::Callback,
        CallbackView,
        check_callback
    );

    // 7. References.
    dispatch_table!(
        project.index.references,
        VisitorKind::Reference,
        ReferenceView,
        check_reference
    );
}

fn dispatch_schema_tree(
    project: &ProjectContext,
    uri: &str,
    doc: &ParsedDocument,
    schema: &SchemaRef,
    active: &mut [ActiveRule],
    out: &mut RunOutput,
) {
    let Some(node) = doc.node_at(&schema.node.ptr) else {
        return;
    };
    let view = SchemaView::new(schema, node);
    let format = doc.format;
    for entry in active.iter_mut().filter(|e| e.rule.meta().applies_to(format)) {
        apply_fields(project, entry, VisitorKind::Schema, &view, node, out);
        dispatch_one(project, entry, out, |rule, cx, state| {
            rule.check_schema(cx, &view, state);
        });
    }
    for child in project.index.schema_children(&schema.node) {
        dispatch_schema_tree(project, uri, doc, child, active, out);
    }
}

/// Invoke one rule callback behind a panic boundary; a faulting rule
/// logs and the run continues.
fn dispatch_one(
    project: &ProjectContext,
    entry: &mut ActiveRule,
    out: &mut RunOutput,
    call: impl FnOnce(&dyn Rule, &mut RuleContext, &mut RuleState),
) {
    let meta = entry.rule.meta();
    let mut cx = RuleContext::new(project, meta, entry.override_setting.as_ref(), out);
    let rule = entry.rule;
    let state = &mut entry.state;
    let result = catch_unwind(AssertUnwindSafe(|| call(rule, &mut cx, state)));
    if result.is_err() {
        eprintln!(
            "telescope: rule '{}' failed while checking; continuing with remaining rules",
            meta.id
        );
    }
}

/// Declarative field specs for one visitor kind. Absent means a missing
/// key, a string trimming to empty, or an empty array; null is present.
fn apply_fields(
    project: &ProjectContext,
    entry: &mut ActiveRule,
    kind: VisitorKind,
    target: &dyn Locate,
    node: &crate::core::document::IrNode,
    out: &mut RunOutput,
) {
    use crate::core::document::IrKind;

    let specs = entry.rule.fields();
    if specs.is_empty() {
        return;
    }
    let meta = entry.rule.meta();
    for spec in specs.iter().filter(|s| s.visitor == kind) {
        let absent = match node.child(&spec.field) {
            None => true,
            Some(child) => match child.kind {
                IrKind::String => child.as_str().is_none_or(|s| s.trim().is_empty()),
                IrKind::Array => child.children.is_empty(),
                _ => false,
            },
        };
        if absent {
            let mut cx = RuleContext::new(project, meta, entry.override_setting.as_ref(), out);
            cx.report_at(
                target,
                &[&spec.field],
                crate::runner::context::ReportOptions::message(spec.requirement.message())
                    .with_severity(spec.requirement.severity()),
            );
        }
    }
}
