//! `accepts` and `lub` (§4.1).

use pfa_ir::{Type, TypeRegistry};

/// Does a value of static type `actual` satisfy an expected type
/// `expected`?
///
/// Unions accept any member (or any sub-union of their members); concrete
/// primitives are invariant (an `int` parameter does NOT accept a `long`
/// actual); named types match by nominal (handle) equality. No implicit
/// numeric widening.
pub fn accepts(expected: &Type, actual: &Type, registry: &TypeRegistry) -> bool {
    if registry.equal(expected, actual) {
        return true;
    }
    match expected {
        Type::Union(branches) => match actual {
            Type::Union(actual_branches) => actual_branches
                .iter()
                .all(|a| branches.iter().any(|b| registry.equal(b, a))),
            _ => branches.iter().any(|b| registry.equal(b, actual)),
        },
        _ => false,
    }
}

/// Least upper bound of a set of branch types, used by `if`/`cond` and
/// `castblock` to compute the node's result type.
///
/// If every branch shares one type, that is the lub. Otherwise a
/// (non-nested, distinct-branch) union of all distinct branch types is
/// synthesized; unions among the inputs are flattened rather than nested.
pub fn lub(types: &[Type], registry: &TypeRegistry) -> Type {
    let mut distinct: Vec<Type> = Vec::new();
    for t in types {
        let flattened: Vec<&Type> = match t {
            Type::Union(branches) => branches.iter().collect(),
            other => vec![other],
        };
        for b in flattened {
            if !distinct.iter().any(|d| registry.equal(d, b)) {
                distinct.push(b.clone());
            }
        }
    }
    match distinct.len() {
        0 => Type::Null,
        1 => distinct
            .into_iter()
            .next()
            .expect("checked len == 1 above"),
        _ => Type::Union(distinct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_does_not_accept_long() {
        let registry = TypeRegistry::new();
        assert!(!accepts(&Type::Int, &Type::Long, &registry));
    }

    #[test]
    fn union_accepts_any_member() {
        let registry = TypeRegistry::new();
        let u = Type::Union(vec![Type::Int, Type::String]);
        assert!(accepts(&u, &Type::Int, &registry));
        assert!(accepts(&u, &Type::String, &registry));
        assert!(!accepts(&u, &Type::Double, &registry));
    }

    #[test]
    fn lub_of_equal_branches_is_that_type() {
        let registry = TypeRegistry::new();
        assert_eq!(lub(&[Type::Int, Type::Int], &registry), Type::Int);
    }

    #[test]
    fn lub_of_distinct_branches_is_union() {
        let registry = TypeRegistry::new();
        let result = lub(&[Type::Int, Type::String], &registry);
        match result {
            Type::Union(branches) => assert_eq!(branches.len(), 2),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn lub_flattens_nested_unions() {
        let registry = TypeRegistry::new();
        let result = lub(
            &[Type::Union(vec![Type::Int, Type::String]), Type::Int],
            &registry,
        );
        match result {
            Type::Union(branches) => assert_eq!(branches.len(), 2),
            other => panic!("expected union, got {other:?}"),
        }
    }
}
