//! PFA IR - Intermediate Representation Types
//!
//! This crate contains the core data structures shared by every other
//! `pfa_*` crate:
//!
//! - [`Name`] / [`Interner`] for interned identifiers
//! - [`Type`] / [`TypeRegistry`] for the Avro-style type algebra
//! - [`ast`] for the tagged AST produced from a PFA document
//!
//! # Design Philosophy
//!
//! - **Intern names**: every identifier (cell name, field name, function
//!   name) is interned once via [`Interner`] and compared by `Name`
//!   equality (a `u32`) rather than by string comparison.
//! - **Intern named types**: `record`/`enum`/`fixed` types are interned by
//!   fully-qualified name in a [`TypeRegistry`] and referred to by
//!   [`TypeHandle`], so structural recursion (a record containing a field
//!   of its own type) is representable without unbounded recursion in the
//!   `Type` value itself.

pub mod ast;
mod interner;
mod types;

pub use ast::{
    CastCase, CellDef, EngineConfig, EngineOptions, Expr, FcnDef, Method, PathElement, PoolDef,
    ToValue,
};
pub use interner::{Interner, Name};
pub use types::{Field, NamedTypeDef, Type, TypeHandle, TypeRegistry, TypeRegistryError};
