//! Function signature catalog (§2 item 7, §4.7).
//!
//! The full standard function library is an external collaborator (§1,
//! Out of scope): this crate only needs its *interface* — given a
//! function name, return the list of candidate [`Signature`]s to resolve
//! against. [`BuiltinCatalog`] is the representative slice the core
//! actually owns: arithmetic, comparison, boolean, and bitwise operators,
//! polymorphic over `{int, long, float, double}` where the spec declares
//! them so (§4.7).

use rustc_hash::FxHashMap;

use pfa_ir::{Interner, Type};

use crate::signature::{Pattern, Signature};

/// Interface to a named-function signature catalog. The standard function
/// library (external to this core) and the core's own built-in operator
/// catalog both implement this the same way.
pub trait FunctionCatalog {
    fn lookup(&self, name: &str) -> Option<&[Signature]>;
}

/// The core's representative built-in catalog: operators whose semantics
/// (overflow checking, division-by-zero, short-circuiting) are specified
/// directly in §4.7 rather than delegated to the external library.
pub struct BuiltinCatalog {
    signatures: FxHashMap<String, Vec<Signature>>,
}

impl BuiltinCatalog {
    /// Builds the catalog, interning the wildcard type variables it needs
    /// (`A`, `B`) into `interner`.
    pub fn new(interner: &mut Interner) -> Self {
        let a = interner.intern("A");
        let numeric = || Pattern::Bounded(a, vec![Type::Int, Type::Long, Type::Float, Type::Double]);
        let integral = || Pattern::Bounded(a, vec![Type::Int, Type::Long]);

        let mut signatures: FxHashMap<String, Vec<Signature>> = FxHashMap::default();

        for op in ["+", "-", "*"] {
            signatures.insert(
                op.to_string(),
                vec![Signature::new(vec![numeric(), Pattern::Wildcard(a)], Pattern::Wildcard(a))],
            );
        }

        signatures.insert(
            "/".to_string(),
            vec![Signature::concrete(vec![Type::Double, Type::Double], Type::Double)],
        );

        signatures.insert(
            "//".to_string(),
            vec![Signature::new(
                vec![integral(), Pattern::Wildcard(a)],
                Pattern::Wildcard(a),
            )],
        );

        for op in ["%", "%%"] {
            signatures.insert(
                op.to_string(),
                vec![Signature::new(vec![numeric(), Pattern::Wildcard(a)], Pattern::Wildcard(a))],
            );
        }

        signatures.insert(
            "**".to_string(),
            vec![Signature::new(vec![numeric(), Pattern::Wildcard(a)], Pattern::Wildcard(a))],
        );

        for op in ["==", "!=", "<", "<=", ">", ">="] {
            signatures.insert(
                op.to_string(),
                vec![Signature::new(
                    vec![numeric(), Pattern::Wildcard(a)],
                    Pattern::Concrete(Type::Boolean),
                )],
            );
        }

        signatures.insert(
            "cmp".to_string(),
            vec![Signature::new(
                vec![numeric(), Pattern::Wildcard(a)],
                Pattern::Concrete(Type::Int),
            )],
        );

        for op in ["and", "or", "xor"] {
            signatures.insert(
                op.to_string(),
                vec![Signature::concrete(vec![Type::Boolean, Type::Boolean], Type::Boolean)],
            );
        }
        signatures.insert(
            "not".to_string(),
            vec![Signature::concrete(vec![Type::Boolean], Type::Boolean)],
        );

        for op in ["&", "|", "^"] {
            signatures.insert(
                op.to_string(),
                vec![Signature::new(vec![integral(), Pattern::Wildcard(a)], Pattern::Wildcard(a))],
            );
        }
        signatures.insert(
            "~".to_string(),
            vec![Signature::new(vec![integral()], Pattern::Wildcard(a))],
        );
        for op in ["<<", ">>", ">>>"] {
            signatures.insert(
                op.to_string(),
                vec![Signature::new(
                    vec![integral(), Pattern::Concrete(Type::Int)],
                    Pattern::Wildcard(a),
                )],
            );
        }

        for op in ["min", "max"] {
            signatures.insert(
                op.to_string(),
                vec![Signature::new(vec![numeric(), Pattern::Wildcard(a)], Pattern::Wildcard(a))],
            );
        }

        BuiltinCatalog { signatures }
    }
}

impl FunctionCatalog for BuiltinCatalog {
    fn lookup(&self, name: &str) -> Option<&[Signature]> {
        self.signatures.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_resolves_plus_for_each_numeric_type() {
        use pfa_ir::TypeRegistry;

        let mut interner = Interner::new();
        let catalog = BuiltinCatalog::new(&mut interner);
        let registry = TypeRegistry::new();
        let sigs = catalog.lookup("+").expect("+ is in the catalog");
        for ty in [Type::Int, Type::Long, Type::Float, Type::Double] {
            let (ret, _) =
                crate::signature::resolve("+", sigs, &[ty.clone(), ty.clone()], &registry, &interner)
                    .unwrap_or_else(|_| panic!("+ should accept {ty:?}"));
            assert_eq!(ret, ty);
        }
    }

    #[test]
    fn catalog_rejects_unknown_name() {
        let mut interner = Interner::new();
        let catalog = BuiltinCatalog::new(&mut interner);
        assert!(catalog.lookup("frobnicate").is_none());
    }
}
