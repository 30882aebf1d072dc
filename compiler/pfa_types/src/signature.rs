//! Wildcard signature resolution (§4.2, §9).
//!
//! A signature's parameter list is a sequence of [`Pattern`]s: concrete
//! types, free wildcards, or wildcards bounded to a fixed set of candidate
//! types. Resolution is a small left-to-right unifier: a wildcard binds to
//! the first actual type it meets, and every later occurrence of the same
//! wildcard (in a later parameter, or in the return type) must be
//! structurally/nominally equal to that binding.

use rustc_hash::FxHashMap;

use pfa_ir::{Interner, Name, Type, TypeRegistry};

use crate::algebra::accepts;

/// One parameter or return-type slot in a [`Signature`].
#[derive(Clone, Debug)]
pub enum Pattern {
    Concrete(Type),
    /// Unbounded type variable, e.g. PFA's `A`.
    Wildcard(Name),
    /// Type variable restricted to a fixed candidate set, e.g. `A ∈
    /// {int, long, float, double}`.
    Bounded(Name, Vec<Type>),
}

/// One overload of a built-in or user function: a parameter pattern list
/// plus a return pattern. `fcns` resolves the first signature (in
/// declaration order) whose parameters all `accepts`/unify against the
/// actual argument types.
#[derive(Clone, Debug)]
pub struct Signature {
    pub params: Vec<Pattern>,
    pub ret: Pattern,
}

impl Signature {
    pub fn new(params: Vec<Pattern>, ret: Pattern) -> Self {
        Signature { params, ret }
    }

    /// Shorthand for a signature with no wildcards.
    pub fn concrete(params: Vec<Type>, ret: Type) -> Self {
        Signature {
            params: params.into_iter().map(Pattern::Concrete).collect(),
            ret: Pattern::Concrete(ret),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum SignatureError {
    #[error("no applicable signature for `{name}` with argument types ({args})")]
    NoApplicableSignature { name: String, args: String },
}

fn match_pattern(
    pattern: &Pattern,
    actual: &Type,
    bindings: &mut FxHashMap<Name, Type>,
    registry: &TypeRegistry,
) -> bool {
    match pattern {
        Pattern::Concrete(expected) => accepts(expected, actual, registry),
        Pattern::Wildcard(w) => bind_wildcard(*w, actual, bindings, registry),
        Pattern::Bounded(w, candidates) => {
            if let Some(bound) = bindings.get(w) {
                registry.equal(bound, actual)
            } else if candidates.iter().any(|c| registry.equal(c, actual)) {
                bindings.insert(*w, actual.clone());
                true
            } else {
                false
            }
        }
    }
}

fn bind_wildcard(
    w: Name,
    actual: &Type,
    bindings: &mut FxHashMap<Name, Type>,
    registry: &TypeRegistry,
) -> bool {
    match bindings.get(&w) {
        Some(bound) => registry.equal(bound, actual),
        None => {
            bindings.insert(w, actual.clone());
            true
        }
    }
}

fn substitute(pattern: &Pattern, bindings: &FxHashMap<Name, Type>) -> Type {
    match pattern {
        Pattern::Concrete(t) => t.clone(),
        Pattern::Wildcard(w) | Pattern::Bounded(w, _) => bindings
            .get(w)
            .cloned()
            .unwrap_or(Type::Null),
    }
}

/// Resolve `actual_types` against `signatures` in declaration order.
/// Returns the substituted return type and the index of the matched
/// signature (first match wins, and is stable under signature list order
/// — a testable property of this function, §8).
pub fn resolve(
    name: &str,
    signatures: &[Signature],
    actual_types: &[Type],
    registry: &TypeRegistry,
    interner: &Interner,
) -> Result<(Type, usize), SignatureError> {
    for (i, sig) in signatures.iter().enumerate() {
        if sig.params.len() != actual_types.len() {
            continue;
        }
        let mut bindings: FxHashMap<Name, Type> = FxHashMap::default();
        let all_match = sig
            .params
            .iter()
            .zip(actual_types.iter())
            .all(|(p, a)| match_pattern(p, a, &mut bindings, registry));
        if all_match {
            return Ok((substitute(&sig.ret, &bindings), i));
        }
    }
    let args = actual_types
        .iter()
        .map(|t| t.display(registry, interner).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(SignatureError::NoApplicableSignature {
        name: name.to_string(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_interner_with(names: &[&str]) -> (Interner, Vec<Name>) {
        let mut interner = Interner::new();
        let names = names.iter().map(|n| interner.intern(n)).collect();
        (interner, names)
    }

    #[test]
    fn first_match_wins_and_is_stable_under_order() {
        let registry = TypeRegistry::new();
        let (interner, _) = mk_interner_with(&[]);
        let sigs = vec![
            Signature::concrete(vec![Type::Int, Type::Int], Type::Int),
            Signature::concrete(vec![Type::Int, Type::Int], Type::Long),
        ];
        let (ret, idx) = resolve("f", &sigs, &[Type::Int, Type::Int], &registry, &interner)
            .expect("should match");
        assert_eq!(ret, Type::Int);
        assert_eq!(idx, 0);
    }

    #[test]
    fn wildcard_unifies_across_params_and_return() {
        let registry = TypeRegistry::new();
        let (interner, names) = mk_interner_with(&["A"]);
        let a = names[0];
        let sig = Signature::new(
            vec![Pattern::Wildcard(a), Pattern::Wildcard(a)],
            Pattern::Wildcard(a),
        );
        let (ret, _) = resolve("max", &[sig.clone()], &[Type::Int, Type::Int], &registry, &interner)
            .expect("int,int should unify");
        assert_eq!(ret, Type::Int);

        let err = resolve("max", &[sig], &[Type::Int, Type::String], &registry, &interner);
        assert!(err.is_err());
    }

    #[test]
    fn bounded_wildcard_rejects_types_outside_the_set() {
        let registry = TypeRegistry::new();
        let (interner, names) = mk_interner_with(&["A"]);
        let a = names[0];
        let sig = Signature::new(
            vec![
                Pattern::Bounded(a, vec![Type::Int, Type::Long, Type::Float, Type::Double]),
                Pattern::Wildcard(a),
            ],
            Pattern::Wildcard(a),
        );
        assert!(resolve("+", &[sig.clone()], &[Type::Int, Type::Int], &registry, &interner).is_ok());
        assert!(resolve("+", &[sig], &[Type::String, Type::String], &registry, &interner).is_err());
    }

    #[test]
    fn no_applicable_signature_error() {
        let registry = TypeRegistry::new();
        let (interner, _) = mk_interner_with(&[]);
        let sigs = vec![Signature::concrete(vec![Type::Int], Type::Int)];
        let err = resolve("f", &sigs, &[Type::String], &registry, &interner);
        assert!(matches!(
            err,
            Err(SignatureError::NoApplicableSignature { .. })
        ));
    }
}
