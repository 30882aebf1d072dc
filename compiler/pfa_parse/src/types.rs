//! Parses a JSON type spec into a [`pfa_ir::Type`], interning named types
//! (`record`/`enum`/`fixed`) into the [`TypeRegistry`] as it goes.

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{Field, NamedTypeDef, Type};

use crate::ctx::{NamedKind, ParseCtx};

pub fn parse_type(
    value: &serde_json::Value,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Type> {
    match value {
        serde_json::Value::String(s) => parse_named_or_primitive(s, c, loc),
        serde_json::Value::Array(branches) => {
            let mut parsed = Vec::with_capacity(branches.len());
            for (i, b) in branches.iter().enumerate() {
                parsed.push(parse_type(b, c, &loc.push(i.to_string()))?);
            }
            c.registry
                .union(parsed)
                .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))
        }
        serde_json::Value::Object(obj) => {
            let kind = obj
                .get("type")
                .and_then(|v| v.as_str())
                .ok_or_else(|| PFAError::syntax("type object missing `type` key", loc.clone()))?;
            match kind {
                "null" => Ok(Type::Null),
                "boolean" => Ok(Type::Boolean),
                "int" => Ok(Type::Int),
                "long" => Ok(Type::Long),
                "float" => Ok(Type::Float),
                "double" => Ok(Type::Double),
                "bytes" => Ok(Type::Bytes),
                "string" => Ok(Type::String),
                "array" => {
                    let items = obj
                        .get("items")
                        .ok_or_else(|| PFAError::syntax("array type missing `items`", loc.clone()))?;
                    Ok(Type::Array(Box::new(parse_type(
                        items,
                        c,
                        &loc.push("items"),
                    )?)))
                }
                "map" => {
                    let values = obj
                        .get("values")
                        .ok_or_else(|| PFAError::syntax("map type missing `values`", loc.clone()))?;
                    Ok(Type::Map(Box::new(parse_type(
                        values,
                        c,
                        &loc.push("values"),
                    )?)))
                }
                "record" => parse_record(obj, c, loc),
                "enum" => parse_enum(obj, c, loc),
                "fixed" => parse_fixed(obj, c, loc),
                other => Err(PFAError::syntax(format!("unknown type kind `{other}`"), loc.clone())),
            }
        }
        _ => Err(PFAError::syntax("invalid type spec", loc.clone())),
    }
}

fn qualified_name(obj: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    let name = obj.get("name")?.as_str()?;
    match obj.get("namespace").and_then(|v| v.as_str()) {
        Some(ns) if !ns.is_empty() => Some(format!("{ns}.{name}")),
        _ => Some(name.to_string()),
    }
}

fn parse_named_or_primitive(s: &str, c: &mut ParseCtx<'_>, loc: &Location) -> PFAResult<Type> {
    Ok(match s {
        "null" => Type::Null,
        "boolean" => Type::Boolean,
        "int" => Type::Int,
        "long" => Type::Long,
        "float" => Type::Float,
        "double" => Type::Double,
        "bytes" => Type::Bytes,
        "string" => Type::String,
        other => {
            let name = c.interner.intern(other);
            match c.resolve_named(name) {
                Some((handle, NamedKind::Record)) => Type::Record(handle),
                Some((handle, NamedKind::Enum)) => Type::Enum(handle),
                Some((handle, NamedKind::Fixed)) => Type::Fixed(handle),
                None => {
                    return Err(PFAError::semantic(
                        format!("unresolved forward reference to type `{other}`"),
                        loc.clone(),
                    ))
                }
            }
        }
    })
}

fn parse_record(
    obj: &serde_json::Map<String, serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Type> {
    let qname = qualified_name(obj)
        .ok_or_else(|| PFAError::syntax("record type missing `name`", loc.clone()))?;
    let name = c.interner.intern(&qname);
    let handle = c.registry.reserve(name);
    c.begin_named(name, NamedKind::Record, handle);

    let fields_json = obj
        .get("fields")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| PFAError::syntax("record type missing `fields`", loc.clone()))?;

    let mut fields = Vec::with_capacity(fields_json.len());
    for (i, f) in fields_json.iter().enumerate() {
        let floc = loc.push(format!("fields.{i}"));
        let fobj = c.require_object(f, &floc)?;
        let fname = fobj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PFAError::syntax("field missing `name`", floc.clone()))?;
        let ftype = fobj
            .get("type")
            .ok_or_else(|| PFAError::syntax("field missing `type`", floc.clone()))?;
        let ty = parse_type(ftype, c, &floc.push("type"))?;
        fields.push(Field {
            name: c.interner.intern(fname),
            ty,
        });
    }

    c.registry
        .define(handle, NamedTypeDef::Record { name, fields }, c.interner)
        .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))?;
    c.end_named(name, handle, NamedKind::Record);
    Ok(Type::Record(handle))
}

fn parse_enum(
    obj: &serde_json::Map<String, serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Type> {
    let qname = qualified_name(obj)
        .ok_or_else(|| PFAError::syntax("enum type missing `name`", loc.clone()))?;
    let name = c.interner.intern(&qname);
    let handle = c.registry.reserve(name);

    let symbols_json = obj
        .get("symbols")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| PFAError::syntax("enum type missing `symbols`", loc.clone()))?;
    let mut symbols = Vec::with_capacity(symbols_json.len());
    for s in symbols_json {
        let s = s
            .as_str()
            .ok_or_else(|| PFAError::syntax("enum symbol must be a string", loc.clone()))?;
        symbols.push(c.interner.intern(s));
    }

    c.registry
        .define(handle, NamedTypeDef::Enum { name, symbols }, c.interner)
        .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))?;
    c.end_named(name, handle, NamedKind::Enum);
    Ok(Type::Enum(handle))
}

fn parse_fixed(
    obj: &serde_json::Map<String, serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Type> {
    let qname = qualified_name(obj)
        .ok_or_else(|| PFAError::syntax("fixed type missing `name`", loc.clone()))?;
    let name = c.interner.intern(&qname);
    let handle = c.registry.reserve(name);
    let size = obj
        .get("size")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| PFAError::syntax("fixed type missing `size`", loc.clone()))? as usize;

    c.registry
        .define(handle, NamedTypeDef::Fixed { name, size }, c.interner)
        .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))?;
    c.end_named(name, handle, NamedKind::Fixed);
    Ok(Type::Fixed(handle))
}
