//! End-to-end scenario tests (§8), built against full PFA JSON documents
//! parsed the way a real host would, rather than hand-built `Expr` trees.
//!
//! Relocated to this directory following the same per-file test-module
//! convention used elsewhere in the workspace for test suites that outgrow
//! a single inline `mod tests` block.

mod cell_tests;
mod emit_tests;
mod fold_tests;
mod map_tests;
mod path_tests;
mod pool_tests;
mod timeout_tests;

use crate::Engine;

fn build_engine(doc: serde_json::Value) -> Engine {
    let parsed = pfa_parse::parse_document(&doc).expect("document parses");
    Engine::new(parsed.interner, parsed.registry, parsed.config).expect("document type checks")
}
