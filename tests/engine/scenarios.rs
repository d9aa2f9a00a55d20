//! The literal end-to-end scenarios.

use pretty_assertions::assert_eq;
use telescope::core::host::MemoryHost;
use telescope::diagnostics::{PatchOp, RangePrecision, Severity};
use telescope::runner::Rule;
use telescope::runner::validators::camel_case_with_fix;
use telescope::rules;

use crate::lint;

/// Scenario 1: missing required `tags` reports at the operation key.
#[test]
fn missing_required_tags() {
    let raw = "\
openapi: 3.0.3
paths:
  /x:
    get:
      responses:
        '200':
          description: ok
";
    let host = MemoryHost::new().with_file("api.yaml", raw);
    let out = lint(
        &host,
        "api.yaml",
        vec![Box::new(rules::TagsRequired::new()) as Box<dyn Rule>],
    );

    assert_eq!(out.diagnostics.len(), 1);
    let diag = &out.diagnostics[0];
    assert_eq!(diag.code, "rule-420-tags-required");
    assert_eq!(diag.severity, Severity::Error);
    assert!(diag.message.contains("at least one tag"));
    assert_eq!(diag.range_precision, RangePrecision::Parent);
    // The range covers the `get:` key.
    assert_eq!(diag.range.start.line, 3);
    assert_eq!(diag.range.start.character, 4);
    assert_eq!(diag.range.end.line, 3);
    assert_eq!(diag.range.end.character, 7);
}

/// Scenario 2: operation-error-responses passes with the full status
/// set and lists what is missing otherwise.
#[test]
fn operation_error_responses() {
    let api = |statuses: &[&str]| {
        let mut raw = String::from("openapi: 3.0.3\npaths:\n  /x:\n    get:\n      responses:\n");
        for status in statuses {
            raw.push_str(&format!("        '{}':\n          description: r\n", status));
        }
        raw
    };

    let complete = api(&["200", "400", "401", "403", "429", "500"]);
    let host = MemoryHost::new().with_file("api.yaml", &complete);
    let out = lint(
        &host,
        "api.yaml",
        vec![Box::new(rules::OperationErrorResponses::new()) as Box<dyn Rule>],
    );
    assert_eq!(out.diagnostics.len(), 0);

    let incomplete = api(&["200", "400", "401", "403"]);
    let host = MemoryHost::new().with_file("api.yaml", &incomplete);
    let out = lint(
        &host,
        "api.yaml",
        vec![Box::new(rules::OperationErrorResponses::new()) as Box<dyn Rule>],
    );
    assert_eq!(out.diagnostics.len(), 1);
    let message = &out.diagnostics[0].message;
    assert!(message.contains("429"), "{}", message);
    assert!(message.contains("500"), "{}", message);
}

/// Scenario 3: numeric-format on integer properties.
#[test]
fn numeric_format() {
    let api = |format_line: &str| {
        format!(
            "openapi: 3.0.3\ncomponents:\n  schemas:\n    Pet:\n      type: object\n      properties:\n        id:\n          type: integer\n{}",
            format_line
        )
    };
    let run = |raw: &str| {
        let host = MemoryHost::new().with_file("api.yaml", raw);
        lint(
            &host,
            "api.yaml",
            vec![Box::new(rules::NumericFormat::new()) as Box<dyn Rule>],
        )
    };

    let out = run(&api(""));
    assert_eq!(out.diagnostics.len(), 1);
    assert!(out.diagnostics[0].message.contains("int32 or int64"));

    let out = run(&api("          format: int32\n"));
    assert_eq!(out.diagnostics.len(), 0);

    let out = run(&api("          format: int16\n"));
    assert_eq!(out.diagnostics.len(), 1);
}

/// Scenario 4: a cross-file `$ref` to a missing file yields exactly one
/// unresolved-ref diagnostic at the `$ref` value's range.
#[test]
fn cross_file_unresolved_ref() {
    let raw = "\
openapi: 3.0.3
paths:
  /pets:
    get:
      responses:
        '200':
          content:
            application/json:
              schema:
                $ref: './schemas/Pet.yaml#/Pet'
";
    let host = MemoryHost::new().with_file("api.yaml", raw);
    let out = lint(
        &host,
        "api.yaml",
        vec![Box::new(rules::UnresolvedRef::new()) as Box<dyn Rule>],
    );

    assert_eq!(out.diagnostics.len(), 1);
    let diag = &out.diagnostics[0];
    assert!(diag.code.contains("unresolved-ref"));
    assert_eq!(diag.uri, "api.yaml");
    // The `$ref` string value on line 9 (0-based).
    assert_eq!(diag.range.start.line, 9);
    assert_eq!(diag.range.start.character, 22);
}

/// Scenario 5: a same-document `$ref` yields an edge whose target is the
/// same URI and whose pointer navigates to the IR node.
#[test]
fn same_document_link() {
    let raw = "\
openapi: 3.0.3
components:
  schemas:
    User:
      type: object
    Users:
      type: array
      items:
        $ref: '#/components/schemas/User'
";
    let host = MemoryHost::new().with_file("api.yaml", raw);
    let lctx = crate::resolve(&host, "api.yaml");
    let project = lctx.context.expect("project context");

    let edges = project.graph.all_edges();
    assert_eq!(edges.len(), 1);
    let edge = &edges[0];
    assert_eq!(edge.to_uri, "api.yaml");
    assert_eq!(edge.to_ptr, "#/components/schemas/User");
    assert!(edge.resolved);

    // Resolution navigates to the IR node behind the pointer.
    let doc = project.documents.get("api.yaml").unwrap();
    let target = doc.node_at(&edge.to_ptr).expect("target node");
    assert_eq!(target.ptr, "#/components/schemas/User");
    assert!(target.child("type").is_some());
}

/// Scenario 6: camelCaseWithFix produces the add patch with the
/// camelCased value.
#[test]
fn auto_fix_camel_case() {
    let result = camel_case_with_fix(
        "ListUsers",
        "api.yaml",
        "#/paths/~1users/get/operationId",
    );
    assert!(!result.valid);
    let fix = result.fix.expect("fix attached");
    assert_eq!(fix.ops.len(), 1);
    match &fix.ops[0] {
        PatchOp::Add { path, value } => {
            assert_eq!(path, "#/paths/~1users/get/operationId");
            assert_eq!(value, &serde_json::json!("listUsers"));
        }
        other => panic!("unexpected op: {:?}", other),
    }
}

/// The recommended preset runs clean on a well-formed document.
#[test]
fn recommended_preset_clean_document() {
    let raw = "\
openapi: 3.0.3
info:
  title: Pets
  version: '1.0'
paths:
  /pets:
    get:
      operationId: listPets
      tags: [pets]
      responses:
        '200':
          description: ok
        '400':
          description: bad request
        '401':
          description: unauthorized
        '403':
          description: forbidden
        '429':
          description: throttled
        '500':
          description: server error
components:
  schemas:
    Pet:
      type: object
      properties:
        id:
          type: integer
          format: int64
        name:
          type: string
";
    let host = MemoryHost::new().with_file("api.yaml", raw);
    let out = lint(&host, "api.yaml", rules::recommended());
    assert_eq!(out.diagnostics, vec![]);
    assert_eq!(out.fixes, vec![]);
}
