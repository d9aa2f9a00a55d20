//! End-to-end engine tests.

mod properties;
mod scenarios;

use telescope::core::cache::EngineCaches;
use telescope::core::cancel::CancelToken;
use telescope::core::context::{LintingContext, ResolveOptions, resolve_linting_context};
use telescope::core::host::MemoryHost;
use telescope::runner::{LintOutcome, Rule, lint_document};

/// Resolve and lint one URI against an in-memory workspace.
pub fn lint(host: &MemoryHost, uri: &str, rules: Vec<Box<dyn Rule>>) -> LintOutcome {
    let mut caches = EngineCaches::new();
    let lctx = resolve_linting_context(uri, host, &mut caches, &ResolveOptions::default());
    lint_document(&lctx, &rules, &Default::default(), &CancelToken::new())
}

pub fn resolve(host: &MemoryHost, uri: &str) -> LintingContext {
    let mut caches = EngineCaches::new();
    resolve_linting_context(uri, host, &mut caches, &ResolveOptions::default())
}
