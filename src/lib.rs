//! Telescope - OpenAPI validation engine
//!
//! Telescope is a CLI tool and library for validating OpenAPI (3.0 / 3.1 / 3.2)
//! documents. It parses YAML/JSON into an intermediate representation with
//! byte-accurate source locations, builds a cross-document reference graph,
//! indexes every OpenAPI entity, and runs a library of rules that report
//! diagnostics (and optional auto-fixes) against precise source ranges.
//!
//! ## Module Structure
//!
//! - `cli`: Command-line interface layer (user-facing commands and output)
//! - `config`: Configuration file loading and rule-list materialization
//! - `core`: Core engine (loader, IR, reference graph, context resolver, index)
//! - `diagnostics`: Diagnostic, range, and file-patch types
//! - `rules`: Built-in rule implementations and the recommended preset
//! - `runner`: Rule model, rule context, visitor dispatch, validators
//! - `utils`: Shared utility functions

pub mod cli;
pub mod config;
pub mod core;
pub mod diagnostics;
pub mod rules;
pub mod runner;
pub mod utils;
