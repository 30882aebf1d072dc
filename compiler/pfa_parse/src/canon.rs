//! Canonical JSON serialization (§6 round-trip: `parse(serialize(ast)) ==
//! ast`). Produces the same shapes `parse_expr`/`parse_type` accept, in
//! their canonical (not every-accepted-shorthand) form.

use std::cell::RefCell;
use std::collections::HashSet;

use serde_json::{Value, json};

use pfa_ir::{
    CastCase, CellDef, EngineConfig, Expr, FcnDef, Interner, Name, PathElement, PoolDef,
    ToValue, Type, TypeHandle, TypeRegistry,
};

/// Carries the registry/interner needed to render a [`Type`], plus the set
/// of named-type handles already expanded in full — a second occurrence of
/// a handle (e.g. a record field referring back to its own record) renders
/// as a bare name rather than re-expanding, which would recurse forever on
/// a self-referential type.
struct Ctx<'a> {
    registry: &'a TypeRegistry,
    interner: &'a Interner,
    seen: RefCell<HashSet<TypeHandle>>,
}

impl<'a> Ctx<'a> {
    fn new(registry: &'a TypeRegistry, interner: &'a Interner) -> Self {
        Ctx {
            registry,
            interner,
            seen: RefCell::new(HashSet::new()),
        }
    }
}

pub fn to_canonical_json(config: &EngineConfig, registry: &TypeRegistry, interner: &Interner) -> Value {
    let ctx = Ctx::new(registry, interner);
    let mut map = serde_json::Map::new();
    if let Some(name) = &config.name {
        map.insert("name".into(), json!(name));
    }
    map.insert(
        "method".into(),
        json!(match config.method {
            pfa_ir::Method::Map => "map",
            pfa_ir::Method::Emit => "emit",
            pfa_ir::Method::Fold => "fold",
        }),
    );
    map.insert("input".into(), type_to_json(&config.input_type, &ctx));
    map.insert("output".into(), type_to_json(&config.output_type, &ctx));
    map.insert(
        "begin".into(),
        Value::Array(config.begin.iter().map(|e| expr_to_json(e, &ctx)).collect()),
    );
    map.insert(
        "action".into(),
        Value::Array(config.action.iter().map(|e| expr_to_json(e, &ctx)).collect()),
    );
    map.insert(
        "end".into(),
        Value::Array(config.end.iter().map(|e| expr_to_json(e, &ctx)).collect()),
    );

    if !config.fcns.is_empty() {
        let mut fcns = serde_json::Map::new();
        for (name, def) in &config.fcns {
            fcns.insert(interner.resolve(*name).to_string(), fcndef_to_json(def, &ctx));
        }
        map.insert("fcns".into(), Value::Object(fcns));
    }
    if let Some(zero) = &config.zero {
        map.insert("zero".into(), zero.clone());
    }
    if !config.cells.is_empty() {
        let mut cells = serde_json::Map::new();
        for (name, def) in &config.cells {
            cells.insert(interner.resolve(*name).to_string(), cell_to_json(def, &ctx));
        }
        map.insert("cells".into(), Value::Object(cells));
    }
    if !config.pools.is_empty() {
        let mut pools = serde_json::Map::new();
        for (name, def) in &config.pools {
            pools.insert(interner.resolve(*name).to_string(), pool_to_json(def, &ctx));
        }
        map.insert("pools".into(), Value::Object(pools));
    }
    if let Some(seed) = config.randseed {
        map.insert("randseed".into(), json!(seed));
    }
    if let Some(doc) = &config.doc {
        map.insert("doc".into(), json!(doc));
    }
    if !config.metadata.is_empty() {
        map.insert("metadata".into(), json!(config.metadata));
    }

    let mut options = serde_json::Map::new();
    if let Some(t) = config.options.timeout_ms {
        options.insert("timeout".into(), json!(t));
    }
    if let Some(t) = config.options.timeout_begin_ms {
        options.insert("timeout.begin".into(), json!(t));
    }
    if let Some(t) = config.options.timeout_end_ms {
        options.insert("timeout.end".into(), json!(t));
    }
    for (k, v) in &config.options.lib1 {
        options.insert(k.clone(), v.clone());
    }
    if !options.is_empty() {
        map.insert("options".into(), Value::Object(options));
    }

    Value::Object(map)
}

fn type_to_json(ty: &Type, ctx: &Ctx) -> Value {
    match ty {
        Type::Null => json!("null"),
        Type::Boolean => json!("boolean"),
        Type::Int => json!("int"),
        Type::Long => json!("long"),
        Type::Float => json!("float"),
        Type::Double => json!("double"),
        Type::Bytes => json!("bytes"),
        Type::String => json!("string"),
        Type::Array(items) => json!({"type": "array", "items": type_to_json(items, ctx)}),
        Type::Map(values) => json!({"type": "map", "values": type_to_json(values, ctx)}),
        Type::Record(h) => named_type_json(*h, ctx, |ctx| {
            let pfa_ir::NamedTypeDef::Record { fields, .. } = ctx.registry.get(*h).ok()? else {
                return None;
            };
            Some(json!({
                "type": "record",
                "name": ctx.registry.fully_qualified_name(*h, ctx.interner),
                "fields": fields.iter().map(|f| json!({
                    "name": ctx.interner.resolve(f.name),
                    "type": type_to_json(&f.ty, ctx),
                })).collect::<Vec<_>>(),
            }))
        }),
        Type::Enum(h) => named_type_json(*h, ctx, |ctx| {
            let pfa_ir::NamedTypeDef::Enum { symbols, .. } = ctx.registry.get(*h).ok()? else {
                return None;
            };
            Some(json!({
                "type": "enum",
                "name": ctx.registry.fully_qualified_name(*h, ctx.interner),
                "symbols": symbols.iter().map(|s| ctx.interner.resolve(*s)).collect::<Vec<_>>(),
            }))
        }),
        Type::Fixed(h) => named_type_json(*h, ctx, |ctx| {
            let pfa_ir::NamedTypeDef::Fixed { size, .. } = ctx.registry.get(*h).ok()? else {
                return None;
            };
            Some(json!({
                "type": "fixed",
                "name": ctx.registry.fully_qualified_name(*h, ctx.interner),
                "size": size,
            }))
        }),
        Type::Union(branches) => Value::Array(branches.iter().map(|b| type_to_json(b, ctx)).collect()),
    }
}

/// Render a named type's full definition the first time its handle is seen;
/// a later occurrence (self-reference or reuse elsewhere in the document)
/// renders as a bare name, since the definition is already in scope by the
/// time the parser reaches it again.
fn named_type_json(handle: TypeHandle, ctx: &Ctx, full: impl FnOnce(&Ctx) -> Option<Value>) -> Value {
    let first_occurrence = ctx.seen.borrow_mut().insert(handle);
    if first_occurrence {
        if let Some(v) = full(ctx) {
            return v;
        }
    }
    json!(ctx.registry.fully_qualified_name(handle, ctx.interner))
}

fn name(n: Name, interner: &Interner) -> Value {
    json!(interner.resolve(n))
}

fn expr_to_json(expr: &Expr, ctx: &Ctx) -> Value {
    match expr {
        Expr::LiteralNull => Value::Null,
        Expr::LiteralBoolean(b) => json!(b),
        Expr::LiteralInt(i) => json!({"int": i}),
        Expr::LiteralLong(l) => json!({"long": l}),
        Expr::LiteralFloat(f) => json!({"float": f}),
        Expr::LiteralDouble(d) => json!({"double": d}),
        Expr::LiteralString(s) => json!({"string": s}),
        Expr::LiteralBase64(b) => json!({"base64": encode_base64(b)}),
        Expr::Literal { ty, value_json } => json!({
            "type": type_to_json(ty, ctx),
            "value": value_json,
        }),
        Expr::NewObject { fields, ty } => {
            let mut obj = serde_json::Map::new();
            for (n, e) in fields {
                obj.insert(ctx.interner.resolve(*n).to_string(), expr_to_json(e, ctx));
            }
            json!({"new": obj, "type": type_to_json(ty, ctx)})
        }
        Expr::NewArray { items, ty } => json!({
            "new": items.iter().map(|e| expr_to_json(e, ctx)).collect::<Vec<_>>(),
            "type": type_to_json(ty, ctx),
        }),
        Expr::Do(body) => json!({"do": body_json(body, ctx)}),
        Expr::Let(bindings) => json!({"let": bindings_json(bindings, ctx)}),
        Expr::SetVar(bindings) => json!({"set": bindings_json(bindings, ctx)}),
        Expr::If { cond, then, els } => {
            let mut m = serde_json::Map::new();
            m.insert("if".into(), expr_to_json(cond, ctx));
            m.insert("then".into(), body_json(then, ctx));
            if let Some(els) = els {
                m.insert("else".into(), body_json(els, ctx));
            }
            Value::Object(m)
        }
        Expr::Cond { branches, els } => {
            let branches = branches
                .iter()
                .map(|(cond, then)| {
                    json!({
                        "if": expr_to_json(cond, ctx),
                        "then": body_json(then, ctx),
                    })
                })
                .collect::<Vec<_>>();
            let mut m = serde_json::Map::new();
            m.insert("cond".into(), Value::Array(branches));
            if let Some(els) = els {
                m.insert("else".into(), body_json(els, ctx));
            }
            Value::Object(m)
        }
        Expr::While { cond, body } => json!({
            "while": expr_to_json(cond, ctx),
            "do": body_json(body, ctx),
        }),
        Expr::DoUntil { body, cond } => json!({
            "do": body_json(body, ctx),
            "until": expr_to_json(cond, ctx),
        }),
        Expr::For { init, until, step, body } => json!({
            "for": bindings_json(init, ctx),
            "while": expr_to_json(until, ctx),
            "step": bindings_json(step, ctx),
            "do": body_json(body, ctx),
        }),
        Expr::Foreach { name: n, inexpr, body, seq } => json!({
            "foreach": name(*n, ctx.interner),
            "in": expr_to_json(inexpr, ctx),
            "do": body_json(body, ctx),
            "seq": seq,
        }),
        Expr::Forkeyval { key, val, inexpr, body } => json!({
            "forkey": name(*key, ctx.interner),
            "forval": name(*val, ctx.interner),
            "in": expr_to_json(inexpr, ctx),
            "do": body_json(body, ctx),
        }),
        Expr::CastBlock { expr, cases, partial } => json!({
            "cast": expr_to_json(expr, ctx),
            "cases": cases.iter().map(|c| cast_case_json(c, ctx)).collect::<Vec<_>>(),
            "partial": partial,
        }),
        Expr::IfNotNull { bindings, then, els } => {
            let mut m = serde_json::Map::new();
            m.insert("ifnotnull".into(), bindings_json(bindings, ctx));
            m.insert("then".into(), body_json(then, ctx));
            if let Some(els) = els {
                m.insert("else".into(), body_json(els, ctx));
            }
            Value::Object(m)
        }
        Expr::Upcast { expr, as_type } => json!({
            "upcast": expr_to_json(expr, ctx),
            "as": type_to_json(as_type, ctx),
        }),
        Expr::Ref(n) => name(*n, ctx.interner),
        Expr::AttrGet { expr, path } => json!({
            "attr": expr_to_json(expr, ctx),
            "path": path_json(path, ctx),
        }),
        Expr::AttrTo { expr, path, to } => json!({
            "attr": expr_to_json(expr, ctx),
            "path": path_json(path, ctx),
            "to": to_value_json(to, ctx),
        }),
        Expr::CellGet { name: n, path } => json!({
            "cell": name(*n, ctx.interner),
            "path": path_json(path, ctx),
        }),
        Expr::CellTo { name: n, path, to } => json!({
            "cell": name(*n, ctx.interner),
            "path": path_json(path, ctx),
            "to": to_value_json(to, ctx),
        }),
        Expr::PoolGet { name: n, path } => json!({
            "pool": name(*n, ctx.interner),
            "path": path_json(path, ctx),
        }),
        Expr::PoolTo { name: n, path, to, init } => {
            let mut m = serde_json::Map::new();
            m.insert("pool".into(), name(*n, ctx.interner));
            m.insert("path".into(), path_json(path, ctx));
            m.insert("to".into(), to_value_json(to, ctx));
            if let Some(init) = init {
                m.insert("init".into(), expr_to_json(init, ctx));
            }
            Value::Object(m)
        }
        Expr::Call { fcn_name, args } => {
            let mut m = serde_json::Map::new();
            m.insert(ctx.interner.resolve(*fcn_name).to_string(), body_json(args, ctx));
            Value::Object(m)
        }
        Expr::FcnRef(n) => json!({"fcn": ctx.interner.resolve(*n)}),
        Expr::Doc(text) => json!({"doc": text}),
        Expr::Error { msg, code } => {
            let mut m = serde_json::Map::new();
            m.insert("error".into(), json!(msg));
            if let Some(code) = code {
                m.insert("code".into(), json!(code));
            }
            Value::Object(m)
        }
        Expr::Log { args, namespace } => {
            let mut m = serde_json::Map::new();
            m.insert("log".into(), body_json(args, ctx));
            if let Some(ns) = namespace {
                m.insert("namespace".into(), json!(ns));
            }
            Value::Object(m)
        }
        Expr::Emit(args) => json!({"emit": body_json(args, ctx)}),
    }
}

fn body_json(body: &[Expr], ctx: &Ctx) -> Value {
    Value::Array(body.iter().map(|e| expr_to_json(e, ctx)).collect())
}

fn bindings_json(bindings: &[(Name, Expr)], ctx: &Ctx) -> Value {
    let mut m = serde_json::Map::new();
    for (n, e) in bindings {
        m.insert(ctx.interner.resolve(*n).to_string(), expr_to_json(e, ctx));
    }
    Value::Object(m)
}

fn path_json(path: &[PathElement], ctx: &Ctx) -> Value {
    Value::Array(path.iter().map(|p| expr_to_json(&p.0, ctx)).collect())
}

fn to_value_json(to: &ToValue, ctx: &Ctx) -> Value {
    match to {
        ToValue::Const(e) => expr_to_json(e, ctx),
        ToValue::FcnRef(n) => json!({"fcn": ctx.interner.resolve(*n)}),
        ToValue::FcnDef(def) => fcndef_to_json(def, ctx),
    }
}

fn cast_case_json(case: &CastCase, ctx: &Ctx) -> Value {
    let mut m = serde_json::Map::new();
    m.insert("as".into(), type_to_json(&case.as_type, ctx));
    if let Some(n) = case.named {
        m.insert("named".into(), name(n, ctx.interner));
    }
    m.insert("do".into(), body_json(&case.body, ctx));
    Value::Object(m)
}

fn fcndef_to_json(def: &FcnDef, ctx: &Ctx) -> Value {
    json!({
        "params": def.params.iter().map(|(n, t)| json!({ctx.interner.resolve(*n).to_string(): type_to_json(t, ctx)})).collect::<Vec<_>>(),
        "ret": type_to_json(&def.ret_type, ctx),
        "do": body_json(&def.body, ctx),
    })
}

fn cell_to_json(def: &CellDef, ctx: &Ctx) -> Value {
    json!({
        "type": type_to_json(&def.ty, ctx),
        "init": def.init_json,
        "shared": def.shared,
    })
}

fn pool_to_json(def: &PoolDef, ctx: &Ctx) -> Value {
    json!({
        "type": type_to_json(&def.ty, ctx),
        "init": def.init_map,
        "shared": def.shared,
    })
}

fn encode_base64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::parse_document;

    fn round_trips(doc: serde_json::Value) -> serde_json::Value {
        let first = parse_document(&doc).expect("document parses");
        let canonical = to_canonical_json(&first.config, &first.registry, &first.interner);
        parse_document(&canonical).unwrap_or_else(|e| {
            panic!("canonical form failed to re-parse: {e}\ncanonical: {canonical}")
        });
        canonical
    }

    #[test]
    fn new_record_construction_round_trips() {
        let point_ty = json!({
            "type": "record",
            "name": "Point",
            "fields": [{"name": "x", "type": "int"}, {"name": "y", "type": "int"}],
        });
        let canonical = round_trips(json!({
            "method": "map",
            "input": "null",
            "output": point_ty,
            "action": [
                {"new": {"x": 1, "y": 2}, "type": "Point"}
            ],
        }));
        let action = canonical.get("action").unwrap().as_array().unwrap();
        assert!(action[0].get("new").is_some());
        assert!(action[0].get("type").is_some());
    }

    #[test]
    fn cast_block_round_trips() {
        round_trips(json!({
            "method": "map",
            "input": ["null", "long"],
            "output": "long",
            "action": [
                {"cast": "input", "cases": [{"as": "long", "named": "n", "do": ["n"]}]},
            ],
        }));
    }

    #[test]
    fn typed_inline_to_fcn_round_trips() {
        round_trips(json!({
            "method": "map",
            "input": "string",
            "output": "long",
            "pools": {"counts": {"type": "long", "init": {}}},
            "action": [
                {
                    "pool": "counts",
                    "path": ["input"],
                    "to": {"params": [{"x": "long"}], "ret": "long", "do": [{"+": ["x", {"long": 1}]}]},
                    "init": {"long": 0},
                },
                {"pool": "counts", "path": ["input"]},
            ],
        }));
    }

    /// A record field referring back to its own record (§9 cyclic type
    /// graphs) must canonicalize without recursing forever, and the bare
    /// name it falls back to for the repeat occurrence must still resolve
    /// on re-parse.
    #[test]
    fn self_referential_record_round_trips() {
        let canonical = round_trips(json!({
            "method": "map",
            "input": "null",
            "output": {
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "value", "type": "int"},
                    {"name": "next", "type": ["null", "Node"]},
                ],
            },
            "action": ["input"],
        }));
        let next_ty = &canonical["output"]["fields"][1]["type"];
        assert_eq!(next_ty.as_array().unwrap()[1], json!("Node"));
    }
}
