//! Invariant and boundary tests over the public API.

use pretty_assertions::assert_eq;
use telescope::core::cache::EngineCaches;
use telescope::core::context::{LintMode, ResolveOptions, resolve_linting_context};
use telescope::core::host::MemoryHost;
use telescope::core::pointer::normalize_pointer;
use telescope::rules;

use crate::lint;

fn root_referencing(reference: &str) -> String {
    format!(
        "openapi: 3.0.3\npaths:\n  /pets:\n    get:\n      responses:\n        '200':\n          content:\n            application/json:\n              schema:\n                $ref: '{}'\n",
        reference
    )
}

/// Pointer lookup through the IR and through the source map agree.
#[test]
fn ir_and_source_map_agree() {
    let raw = "\
openapi: 3.0.3
info:
  title: Pets
paths:
  /x:
    get:
      tags: [a]
      responses:
        '200':
          description: ok
";
    let host = MemoryHost::new().with_file("api.yaml", raw);
    let lctx = crate::resolve(&host, "api.yaml");
    let doc_map = &lctx.context.as_ref().unwrap().documents;
    let doc = doc_map.get("api.yaml").unwrap();
    let ir = doc.ir.as_ref().unwrap();

    let mut pointers = Vec::new();
    ir.walk(&mut |node| pointers.push(node.ptr.clone()));
    for ptr in &pointers {
        let node = ir.find_by_pointer(ptr).expect("IR lookup");
        let via_map = doc.pointer_to_range(ptr).expect("source-map lookup");
        let via_ir = doc.offset_range(node.loc.val_start, node.loc.val_end);
        assert_eq!(via_map, via_ir, "mismatch at {}", ptr);
    }
}

/// Key offsets precede value offsets.
#[test]
fn key_offsets_precede_value_offsets() {
    let raw = "a: 1\nnested:\n  b: [1, 2]\n  c: {x: y}\n";
    let host = MemoryHost::new().with_file("f.yaml", raw);
    let mut caches = EngineCaches::new();
    let (_, doc) = caches.doc_types.get_or_load("f.yaml", &host);
    let doc = doc.unwrap();
    doc.ir.as_ref().unwrap().walk(&mut |node| {
        if let (Some(key_start), Some(key_end)) = (node.loc.key_start, node.loc.key_end) {
            assert!(key_end > key_start, "empty key range at {}", node.ptr);
            assert!(key_end <= node.loc.val_start, "key after value at {}", node.ptr);
            assert!(node.loc.val_start <= node.loc.val_end, "inverted value at {}", node.ptr);
        }
    });
}

/// Pointer normalization is idempotent over every accepted input form.
#[test]
fn normalize_pointer_idempotent() {
    for (input, expected) in [
        ("", "#"),
        ("/x", "#/x"),
        ("x/y", "#/x/y"),
        ("#/x", "#/x"),
    ] {
        assert_eq!(normalize_pointer(input), expected);
        assert_eq!(normalize_pointer(&normalize_pointer(input)), expected);
    }
}

/// A partial referenced by two roots resolves to multi-root mode
/// with the partial injected into both contexts.
#[test]
fn partial_under_two_roots() {
    let host = MemoryHost::new()
        .with_file("a.yaml", root_referencing("./shared.yaml#/Pet"))
        .with_file("b.yaml", root_referencing("./shared.yaml#/Pet"))
        .with_file("shared.yaml", "Pet:\n  type: object\n");
    let lctx = crate::resolve(&host, "shared.yaml");

    assert_eq!(lctx.mode, LintMode::MultiRoot);
    assert_eq!(lctx.multi_root_contexts.len(), 2);
    for entry in &lctx.multi_root_contexts {
        assert!(entry.context.documents.contains_key("shared.yaml"));
    }
}

/// A root with no refs yields a single-document project.
#[test]
fn root_without_refs() {
    let host = MemoryHost::new().with_file("api.yaml", "openapi: 3.0.3\npaths: {}\n");
    let lctx = crate::resolve(&host, "api.yaml");
    assert_eq!(lctx.mode, LintMode::ProjectAware);
    assert_eq!(lctx.context.unwrap().documents.len(), 1);
}

/// Cyclic partials terminate reverse root search.
#[test]
fn cyclic_partials_terminate() {
    let host = MemoryHost::new()
        .with_file("api.yaml", root_referencing("./a.yaml#/A"))
        .with_file(
            "a.yaml",
            "A:\n  type: object\n  properties:\n    b:\n      $ref: './b.yaml#/B'\n",
        )
        .with_file(
            "b.yaml",
            "B:\n  type: object\n  properties:\n    a:\n      $ref: './a.yaml#/A'\n",
        );
    let lctx = crate::resolve(&host, "b.yaml");
    assert_eq!(lctx.mode, LintMode::ProjectAware);
    assert_eq!(lctx.root_uris, vec!["api.yaml"]);
}

/// A `$ref` to a missing file never throws; it surfaces as exactly
/// one unresolved-ref diagnostic.
#[test]
fn missing_ref_target_is_diagnostic_not_panic() {
    let host = MemoryHost::new().with_file("api.yaml", root_referencing("./gone.yaml#/X"));
    let out = lint(
        &host,
        "api.yaml",
        vec![Box::new(rules::UnresolvedRef::new()) as Box<dyn telescope::runner::Rule>],
    );
    let unresolved: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.code.contains("unresolved-ref"))
        .collect();
    assert_eq!(unresolved.len(), 1);
}

/// Running the full preset twice over an unchanged context yields
/// identical diagnostics in identical order.
#[test]
fn repeated_runs_are_identical() {
    let raw = "\
openapi: 3.0.3
paths:
  /x:
    get:
      operationId: Get_X
      responses:
        '200':
          description: ok
components:
  schemas:
    Pet:
      type: object
      properties:
        id:
          type: integer
";
    let host = MemoryHost::new().with_file("api.yaml", raw);
    let first = lint(&host, "api.yaml", rules::recommended());
    let second = lint(&host, "api.yaml", rules::recommended());
    assert_eq!(first.diagnostics, second.diagnostics);
    assert!(!first.diagnostics.is_empty());
}

/// An edited partial is linted in the context of its owning root: a
/// schema fragment referenced from a root still gets schema rules.
#[test]
fn partial_gets_project_context_rules() {
    let host = MemoryHost::new()
        .with_file("api.yaml", root_referencing("./Pet.yaml#/Pet"))
        .with_file(
            "Pet.yaml",
            "Pet:\n  type: object\n  properties:\n    id:\n      type: integer\n",
        );
    let lctx = crate::resolve(&host, "Pet.yaml");
    assert_eq!(lctx.mode, LintMode::ProjectAware);

    let mut caches = EngineCaches::new();
    let lctx = resolve_linting_context("Pet.yaml", &host, &mut caches, &ResolveOptions::default());
    let out = telescope::runner::lint_document(
        &lctx,
        &vec![Box::new(rules::NumericFormat::new()) as Box<dyn telescope::runner::Rule>],
        &Default::default(),
        &telescope::core::cancel::CancelToken::new(),
    );
    // The integer property inside the fragment lacks a format.
    let numeric: Vec<_> = out
        .diagnostics
        .iter()
        .filter(|d| d.code.contains("numeric-format"))
        .collect();
    assert_eq!(numeric.len(), 1);
    assert_eq!(numeric[0].uri, "Pet.yaml");
}
