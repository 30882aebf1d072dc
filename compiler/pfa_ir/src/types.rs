//! The Avro-style type algebra (§3 of the type system design): primitives,
//! `array`, `map`, `record`, `union`, `fixed`, `enum`.
//!
//! Named types (`record`, `enum`, `fixed`) are interned in a
//! [`TypeRegistry`] keyed by fully-qualified name and referred to from
//! [`Type`] by a small [`TypeHandle`] index. This is what makes cyclic type
//! graphs representable: a record field of the record's own type is just a
//! `Type::Record(handle)` pointing back at the record being defined, not an
//! infinitely-nested value.

use std::fmt;

use crate::interner::{Interner, Name};

/// Index into a [`TypeRegistry`]'s table of named type definitions.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct TypeHandle(u32);

/// The closed sum of PFA/Avro types.
///
/// Named types (`Record`, `Enum`, `Fixed`) carry only a [`TypeHandle`];
/// look up their structure in the owning [`TypeRegistry`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<Type>),
    Map(Box<Type>),
    Record(TypeHandle),
    Enum(TypeHandle),
    Fixed(TypeHandle),
    /// Branches are kept in declaration order; invariants (distinct,
    /// non-nested) are enforced by [`TypeRegistry::union`].
    Union(Vec<Type>),
}

impl Type {
    pub fn is_union(&self) -> bool {
        matches!(self, Type::Union(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Long | Type::Float | Type::Double)
    }

    /// `true` if this union has `null` as one of its branches (used by
    /// `ifnotnull` and the `Doc`/optional-null interaction).
    pub fn union_contains_null(&self) -> bool {
        match self {
            Type::Union(branches) => branches.iter().any(|b| matches!(b, Type::Null)),
            Type::Null => true,
            _ => false,
        }
    }

    /// The union with `null` removed, used inside `ifnotnull` `then`
    /// branches where the binding is rebound to a narrower type.
    pub fn without_null(&self) -> Type {
        match self {
            Type::Union(branches) => {
                let rest: Vec<Type> = branches
                    .iter()
                    .filter(|b| !matches!(b, Type::Null))
                    .cloned()
                    .collect();
                match rest.len() {
                    0 => Type::Null,
                    1 => rest.into_iter().next().expect("checked len == 1"),
                    _ => Type::Union(rest),
                }
            }
            other => other.clone(),
        }
    }

    pub fn display<'a>(&'a self, registry: &'a TypeRegistry, interner: &'a Interner) -> TypeDisplay<'a> {
        TypeDisplay {
            ty: self,
            registry,
            interner,
        }
    }
}

pub struct TypeDisplay<'a> {
    ty: &'a Type,
    registry: &'a TypeRegistry,
    interner: &'a Interner,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_type(self.ty, self.registry, self.interner, f)
    }
}

fn fmt_type(
    ty: &Type,
    registry: &TypeRegistry,
    interner: &Interner,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match ty {
        Type::Null => write!(f, "null"),
        Type::Boolean => write!(f, "boolean"),
        Type::Int => write!(f, "int"),
        Type::Long => write!(f, "long"),
        Type::Float => write!(f, "float"),
        Type::Double => write!(f, "double"),
        Type::Bytes => write!(f, "bytes"),
        Type::String => write!(f, "string"),
        Type::Array(items) => {
            write!(f, "array<")?;
            fmt_type(items, registry, interner, f)?;
            write!(f, ">")
        }
        Type::Map(values) => {
            write!(f, "map<")?;
            fmt_type(values, registry, interner, f)?;
            write!(f, ">")
        }
        Type::Record(h) | Type::Enum(h) | Type::Fixed(h) => {
            write!(f, "{}", registry.fully_qualified_name(*h, interner))
        }
        Type::Union(branches) => {
            write!(f, "union[")?;
            for (i, b) in branches.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                fmt_type(b, registry, interner, f)?;
            }
            write!(f, "]")
        }
    }
}

/// One field of a `record` type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Field {
    pub name: Name,
    pub ty: Type,
}

/// The structural definition behind a [`TypeHandle`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum NamedTypeDef {
    Record { name: Name, fields: Vec<Field> },
    Enum { name: Name, symbols: Vec<Name> },
    Fixed { name: Name, size: usize },
}

impl NamedTypeDef {
    fn name(&self) -> Name {
        match self {
            NamedTypeDef::Record { name, .. }
            | NamedTypeDef::Enum { name, .. }
            | NamedTypeDef::Fixed { name, .. } => *name,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum TypeRegistryError {
    #[error("duplicate type name `{0}` with conflicting structure")]
    DuplicateTypeName(String),
    #[error("duplicate field name `{0}` in record `{1}`")]
    DuplicateFieldName(String, String),
    #[error("duplicate symbol `{0}` in enum `{1}`")]
    DuplicateEnumSymbol(String, String),
    #[error("union branch types must be distinct and non-nested")]
    InvalidUnion,
    #[error("unresolved forward reference to type `{0}`")]
    UnresolvedForwardRef(String),
}

/// Interns named types (`record`, `enum`, `fixed`) by fully-qualified name.
///
/// Two occurrences of the same name must carry the same structure; a
/// mismatch is reported as [`TypeRegistryError::DuplicateTypeName`] at
/// insertion time, so nominal equality afterward reduces to comparing
/// [`TypeHandle`]s.
#[derive(Default)]
pub struct TypeRegistry {
    defs: Vec<Option<NamedTypeDef>>,
    by_name: rustc_hash::FxHashMap<Name, TypeHandle>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a handle for a named type before its structure is known, to
    /// support self-referential / forward-referenced records. Must be
    /// completed with [`Self::define`] before type checking proceeds.
    pub fn reserve(&mut self, name: Name) -> TypeHandle {
        if let Some(&h) = self.by_name.get(&name) {
            return h;
        }
        let idx = self.defs.len() as u32;
        self.defs.push(None);
        let handle = TypeHandle(idx);
        self.by_name.insert(name, handle);
        handle
    }

    /// Attach (or verify) the structure for a handle obtained from
    /// [`Self::reserve`] or create one fresh via `intern_*`.
    pub fn define(
        &mut self,
        handle: TypeHandle,
        def: NamedTypeDef,
        interner: &Interner,
    ) -> Result<(), TypeRegistryError> {
        validate_def(&def, interner)?;
        let slot = &mut self.defs[handle.0 as usize];
        match slot {
            None => {
                *slot = Some(def);
                Ok(())
            }
            Some(existing) if *existing == def => Ok(()),
            Some(_) => Err(TypeRegistryError::DuplicateTypeName(
                interner.resolve(def.name()).to_string(),
            )),
        }
    }

    pub fn intern_record(
        &mut self,
        name: Name,
        fields: Vec<Field>,
        interner: &Interner,
    ) -> Result<TypeHandle, TypeRegistryError> {
        let handle = self.reserve(name);
        self.define(handle, NamedTypeDef::Record { name, fields }, interner)?;
        Ok(handle)
    }

    pub fn intern_enum(
        &mut self,
        name: Name,
        symbols: Vec<Name>,
        interner: &Interner,
    ) -> Result<TypeHandle, TypeRegistryError> {
        let handle = self.reserve(name);
        self.define(handle, NamedTypeDef::Enum { name, symbols }, interner)?;
        Ok(handle)
    }

    pub fn intern_fixed(
        &mut self,
        name: Name,
        size: usize,
        interner: &Interner,
    ) -> Result<TypeHandle, TypeRegistryError> {
        let handle = self.reserve(name);
        self.define(handle, NamedTypeDef::Fixed { name, size }, interner)?;
        Ok(handle)
    }

    pub fn get(&self, handle: TypeHandle) -> Result<&NamedTypeDef, TypeRegistryError> {
        self.defs[handle.0 as usize]
            .as_ref()
            .ok_or_else(|| TypeRegistryError::UnresolvedForwardRef(format!("{:?}", handle)))
    }

    pub fn fully_qualified_name<'a>(&self, handle: TypeHandle, interner: &'a Interner) -> &'a str {
        match self.defs.get(handle.0 as usize).and_then(Option::as_ref) {
            Some(def) => interner.resolve(def.name()),
            None => "<unresolved>",
        }
    }

    /// Build (and validate) a union type: branches must be distinct and
    /// non-nested (no branch is itself a `Type::Union`).
    pub fn union(&self, branches: Vec<Type>) -> Result<Type, TypeRegistryError> {
        if branches.iter().any(Type::is_union) {
            return Err(TypeRegistryError::InvalidUnion);
        }
        for i in 0..branches.len() {
            for j in (i + 1)..branches.len() {
                if self.equal(&branches[i], &branches[j]) {
                    return Err(TypeRegistryError::InvalidUnion);
                }
            }
        }
        Ok(Type::Union(branches))
    }

    /// Structural equality for unnamed types, nominal (handle) equality for
    /// named types.
    pub fn equal(&self, a: &Type, b: &Type) -> bool {
        match (a, b) {
            (Type::Null, Type::Null)
            | (Type::Boolean, Type::Boolean)
            | (Type::Int, Type::Int)
            | (Type::Long, Type::Long)
            | (Type::Float, Type::Float)
            | (Type::Double, Type::Double)
            | (Type::Bytes, Type::Bytes)
            | (Type::String, Type::String) => true,
            (Type::Array(x), Type::Array(y)) | (Type::Map(x), Type::Map(y)) => self.equal(x, y),
            (Type::Record(x), Type::Record(y))
            | (Type::Enum(x), Type::Enum(y))
            | (Type::Fixed(x), Type::Fixed(y)) => x == y,
            (Type::Union(xs), Type::Union(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .all(|x| ys.iter().any(|y| self.equal(x, y)))
            }
            _ => false,
        }
    }
}

fn validate_def(def: &NamedTypeDef, interner: &Interner) -> Result<(), TypeRegistryError> {
    match def {
        NamedTypeDef::Record { name, fields } => {
            let mut seen = rustc_hash::FxHashSet::default();
            for field in fields {
                if !seen.insert(field.name) {
                    return Err(TypeRegistryError::DuplicateFieldName(
                        interner.resolve(field.name).to_string(),
                        interner.resolve(*name).to_string(),
                    ));
                }
            }
            Ok(())
        }
        NamedTypeDef::Enum { name, symbols } => {
            let mut seen = rustc_hash::FxHashSet::default();
            for sym in symbols {
                if !seen.insert(*sym) {
                    return Err(TypeRegistryError::DuplicateEnumSymbol(
                        interner.resolve(*sym).to_string(),
                        interner.resolve(*name).to_string(),
                    ));
                }
            }
            Ok(())
        }
        NamedTypeDef::Fixed { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_named_types_by_handle() {
        let mut interner = Interner::new();
        let mut registry = TypeRegistry::new();
        let name = interner.intern("Foo");
        let field_name = interner.intern("x");
        let h1 = registry
            .intern_record(
                name,
                vec![Field {
                    name: field_name,
                    ty: Type::Int,
                }],
                &interner,
            )
            .unwrap();
        let h2 = registry
            .intern_record(
                name,
                vec![Field {
                    name: field_name,
                    ty: Type::Int,
                }],
                &interner,
            )
            .unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn rejects_conflicting_redefinition() {
        let mut interner = Interner::new();
        let mut registry = TypeRegistry::new();
        let name = interner.intern("Foo");
        let fx = interner.intern("x");
        let fy = interner.intern("y");
        registry
            .intern_record(
                name,
                vec![Field {
                    name: fx,
                    ty: Type::Int,
                }],
                &interner,
            )
            .unwrap();
        let err = registry.intern_record(
            name,
            vec![Field {
                name: fy,
                ty: Type::String,
            }],
            &interner,
        );
        assert!(matches!(err, Err(TypeRegistryError::DuplicateTypeName(_))));
    }

    #[test]
    fn self_referential_record_via_reserve() {
        let mut interner = Interner::new();
        let mut registry = TypeRegistry::new();
        let name = interner.intern("Node");
        let handle = registry.reserve(name);
        let next_field = interner.intern("next");
        let value_field = interner.intern("value");
        registry
            .define(
                handle,
                NamedTypeDef::Record {
                    name,
                    fields: vec![
                        Field {
                            name: value_field,
                            ty: Type::Int,
                        },
                        Field {
                            name: next_field,
                            ty: Type::Union(vec![Type::Null, Type::Record(handle)]),
                        },
                    ],
                },
                &interner,
            )
            .unwrap();
        let def = registry.get(handle).unwrap();
        assert!(matches!(def, NamedTypeDef::Record { .. }));
    }

    #[test]
    fn union_rejects_nested_union_and_duplicates() {
        let registry = TypeRegistry::new();
        assert!(registry
            .union(vec![Type::Int, Type::Union(vec![Type::String])])
            .is_err());
        assert!(registry.union(vec![Type::Int, Type::Int]).is_err());
        assert!(registry.union(vec![Type::Int, Type::String]).is_ok());
    }
}
