//! Runtime values (§3 data model, value side).
//!
//! Unions are untagged at the value level, matching Avro: a union-typed
//! slot simply holds whichever concrete value it currently has, and
//! [`value_type`] recovers the active branch's static type on demand for
//! `castblock`/`ifnotnull` dispatch and deep-path classification.

use std::collections::HashMap;

use pfa_ir::{Interner, Name, NamedTypeDef, Type, TypeHandle, TypeRegistry};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
    Record(TypeHandle, HashMap<Name, Value>),
    Enum(TypeHandle, Name),
    Fixed(TypeHandle, Vec<u8>),
}

impl Value {
    /// The value's own static type, used where the declared type is a
    /// union and the active branch must be recovered dynamically.
    pub fn value_type(&self, registry: &TypeRegistry) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Boolean(_) => Type::Boolean,
            Value::Int(_) => Type::Int,
            Value::Long(_) => Type::Long,
            Value::Float(_) => Type::Float,
            Value::Double(_) => Type::Double,
            Value::Bytes(_) => Type::Bytes,
            Value::String(_) => Type::String,
            Value::Array(items) => {
                let item_ty = items
                    .first()
                    .map(|v| v.value_type(registry))
                    .unwrap_or(Type::Null);
                Type::Array(Box::new(item_ty))
            }
            Value::Map(m) => {
                let val_ty = m
                    .values()
                    .next()
                    .map(|v| v.value_type(registry))
                    .unwrap_or(Type::Null);
                Type::Map(Box::new(val_ty))
            }
            Value::Record(h, _) => Type::Record(*h),
            Value::Enum(h, _) => Type::Enum(*h),
            Value::Fixed(h, _) => Type::Fixed(*h),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Build the default value for a freshly-declared field/array slot of
/// `ty`, used when a `record`'s field is absent from a JSON literal but
/// the field's own type permits a zero value (only reachable for `null`
/// and union-containing-null, per Avro defaulting rules the engine relies
/// on for `cells`/`pools` `init` expansion). Returns `None` if `ty` has no
/// canonical default.
pub fn default_for(ty: &Type) -> Option<Value> {
    match ty {
        Type::Null => Some(Value::Null),
        Type::Union(branches) if branches.iter().any(|b| matches!(b, Type::Null)) => {
            Some(Value::Null)
        }
        _ => None,
    }
}

/// Convert a `serde_json::Value` into a runtime [`Value`] against a known
/// static `ty`, used to materialize `cells`/`pools` `init` and `zero`
/// literals and `Literal{type,valueJson}` AST nodes.
pub fn from_json(
    json: &serde_json::Value,
    ty: &Type,
    registry: &TypeRegistry,
    interner: &Interner,
) -> Option<Value> {
    match (ty, json) {
        (Type::Null, serde_json::Value::Null) => Some(Value::Null),
        (Type::Boolean, serde_json::Value::Bool(b)) => Some(Value::Boolean(*b)),
        (Type::Int, n) => n.as_i64().and_then(|i| i32::try_from(i).ok()).map(Value::Int),
        (Type::Long, n) => n.as_i64().map(Value::Long),
        (Type::Float, n) => n.as_f64().map(|f| Value::Float(f as f32)),
        (Type::Double, n) => n.as_f64().map(Value::Double),
        (Type::String, serde_json::Value::String(s)) => Some(Value::String(s.clone())),
        (Type::Bytes, serde_json::Value::String(s)) => Some(Value::Bytes(s.clone().into_bytes())),
        (Type::Array(items_ty), serde_json::Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json(item, items_ty, registry, interner)?);
            }
            Some(Value::Array(out))
        }
        (Type::Map(val_ty), serde_json::Value::Object(obj)) => {
            let mut out = HashMap::with_capacity(obj.len());
            for (k, v) in obj {
                out.insert(k.clone(), from_json(v, val_ty, registry, interner)?);
            }
            Some(Value::Map(out))
        }
        (Type::Record(handle), serde_json::Value::Object(obj)) => {
            let def = registry.get(*handle).ok()?;
            let NamedTypeDef::Record { fields, .. } = def else {
                return None;
            };
            let mut out = HashMap::with_capacity(fields.len());
            for field in fields {
                let key = interner.resolve(field.name);
                if let Some(v) = obj.get(key) {
                    out.insert(field.name, from_json(v, &field.ty, registry, interner)?);
                } else {
                    out.insert(field.name, default_for(&field.ty)?);
                }
            }
            Some(Value::Record(*handle, out))
        }
        (Type::Enum(handle), serde_json::Value::String(s)) => {
            let def = registry.get(*handle).ok()?;
            let NamedTypeDef::Enum { symbols, .. } = def else {
                return None;
            };
            symbols
                .iter()
                .find(|sym| interner.resolve(**sym) == s)
                .map(|sym| Value::Enum(*handle, *sym))
        }
        (Type::Fixed(handle), serde_json::Value::String(s)) => {
            Some(Value::Fixed(*handle, s.clone().into_bytes()))
        }
        (Type::Union(branches), json) => {
            branches.iter().find_map(|b| from_json(json, b, registry, interner))
        }
        _ => None,
    }
}

/// Inverse of [`from_json`]: render a runtime [`Value`] back to JSON against
/// its static `ty`, used to print `action()` output/`emitted` records. A
/// union-typed slot is rendered in Avro's tagged form (`{"branch": value}`)
/// except for the `null` branch, which is rendered bare.
pub fn to_json(value: &Value, ty: &Type, registry: &TypeRegistry, interner: &Interner) -> serde_json::Value {
    match (ty, value) {
        (_, Value::Null) => serde_json::Value::Null,
        // Must come before the per-variant wildcards below: a union-typed
        // slot needs the branch tag even though `value`'s own shape would
        // otherwise match one of those arms directly.
        (Type::Union(branches), v) => {
            let actual = v.value_type(registry);
            let branch = branches
                .iter()
                .find(|b| registry.equal(b, &actual))
                .unwrap_or(&actual);
            serde_json::json!({ type_name(branch, registry, interner): to_json(v, branch, registry, interner) })
        }
        (_, Value::Boolean(b)) => serde_json::Value::Bool(*b),
        (_, Value::Int(i)) => serde_json::json!(i),
        (_, Value::Long(l)) => serde_json::json!(l),
        (_, Value::Float(f)) => serde_json::json!(f),
        (_, Value::Double(d)) => serde_json::json!(d),
        (_, Value::Bytes(b)) => serde_json::json!(String::from_utf8_lossy(b)),
        (_, Value::String(s)) => serde_json::json!(s),
        (Type::Array(items_ty), Value::Array(items)) => serde_json::Value::Array(
            items.iter().map(|v| to_json(v, items_ty, registry, interner)).collect(),
        ),
        (_, Value::Array(items)) => serde_json::Value::Array(
            items.iter().map(|v| to_json(v, &v.value_type(registry), registry, interner)).collect(),
        ),
        (Type::Map(val_ty), Value::Map(m)) => serde_json::Value::Object(
            m.iter().map(|(k, v)| (k.clone(), to_json(v, val_ty, registry, interner))).collect(),
        ),
        (_, Value::Map(m)) => serde_json::Value::Object(
            m.iter()
                .map(|(k, v)| (k.clone(), to_json(v, &v.value_type(registry), registry, interner)))
                .collect(),
        ),
        (_, Value::Record(handle, fields)) => {
            let Ok(NamedTypeDef::Record { fields: field_defs, .. }) = registry.get(*handle) else {
                return serde_json::Value::Null;
            };
            serde_json::Value::Object(
                field_defs
                    .iter()
                    .filter_map(|f| {
                        fields.get(&f.name).map(|v| {
                            (interner.resolve(f.name).to_string(), to_json(v, &f.ty, registry, interner))
                        })
                    })
                    .collect(),
            )
        }
        (_, Value::Enum(_, sym)) => serde_json::json!(interner.resolve(*sym)),
        (_, Value::Fixed(_, bytes)) => serde_json::json!(String::from_utf8_lossy(bytes)),
    }
}

fn type_name(ty: &Type, registry: &TypeRegistry, interner: &Interner) -> String {
    match ty {
        Type::Null => "null".to_string(),
        Type::Boolean => "boolean".to_string(),
        Type::Int => "int".to_string(),
        Type::Long => "long".to_string(),
        Type::Float => "float".to_string(),
        Type::Double => "double".to_string(),
        Type::Bytes => "bytes".to_string(),
        Type::String => "string".to_string(),
        Type::Array(_) => "array".to_string(),
        Type::Map(_) => "map".to_string(),
        Type::Record(h) | Type::Enum(h) | Type::Fixed(h) => registry.fully_qualified_name(*h, interner).to_string(),
        Type::Union(_) => "union".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn registry_and_interner() -> (TypeRegistry, Interner) {
        (TypeRegistry::new(), Interner::new())
    }

    #[test]
    fn to_json_tags_a_non_null_union_branch() {
        let (registry, interner) = registry_and_interner();
        let ty = Type::Union(vec![Type::Int, Type::String]);
        let rendered = to_json(&Value::Long(5), &ty, &registry, &interner);
        assert_eq!(rendered, serde_json::json!({"long": 5}));
    }

    #[test]
    fn to_json_renders_the_null_union_branch_bare() {
        let (registry, interner) = registry_and_interner();
        let ty = Type::Union(vec![Type::Null, Type::String]);
        let rendered = to_json(&Value::Null, &ty, &registry, &interner);
        assert_eq!(rendered, serde_json::Value::Null);
    }

    /// `from_json` accepts a union value untagged (the bare JSON number
    /// matches the `long` branch structurally); `to_json` re-encodes it
    /// tagged. This asymmetry is deliberate (more permissive decoding,
    /// unambiguous encoding) — see the Open Questions note in DESIGN.md.
    #[test]
    fn union_decodes_untagged_and_encodes_tagged() {
        let (registry, interner) = registry_and_interner();
        let ty = Type::Union(vec![Type::Long, Type::String]);
        let value = from_json(&serde_json::json!(7), &ty, &registry, &interner).expect("union value parses");
        assert_eq!(value, Value::Long(7));
        assert_eq!(to_json(&value, &ty, &registry, &interner), serde_json::json!({"long": 7}));
    }
}
