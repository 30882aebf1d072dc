//! Symbol table, type checker, state store, and tree-walking evaluator for
//! the PFA scoring engine.
//!
//! [`engine::Engine`] owns a type-checked [`pfa_ir::EngineConfig`] plus the
//! shared cell/pool template derived from it; [`engine::Actor`] is one
//! independent execution context (its own PRNG, private cell/pool copies,
//! and — for fold engines — its own tally) driving the `begin`/`action`/
//! `end` lifecycle.

mod engine;
mod ops;
mod scope;
mod state;
mod typecheck;
mod value;

#[cfg(test)]
mod tests;

pub use engine::{ActionOutcome, Actor, Engine};
pub use value::{Value, from_json, to_json};
