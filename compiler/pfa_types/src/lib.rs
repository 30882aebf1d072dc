//! Type algebra operations (§4.1) and the wildcard signature resolver
//! (§4.2) that sit on top of `pfa_ir`'s `Type`/`TypeRegistry`.

mod algebra;
mod catalog;
mod signature;

pub use algebra::{accepts, lub};
pub use catalog::{BuiltinCatalog, FunctionCatalog};
pub use signature::{Pattern, Signature, SignatureError, resolve};
