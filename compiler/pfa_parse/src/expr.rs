//! Parses the JSON encoding of every [`Expr`] form (§3, §6).
//!
//! A bare JSON string is a variable reference (`Ref`); a wrapped
//! `{"string": "..."}` is a string literal. This is how the canonical
//! encoding disambiguates "the identifier `x`" from "the literal text
//! `x`" without a separate quoting convention.

use std::collections::HashMap;

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{CastCase, CellDef, Expr, FcnDef, Name, PathElement, PoolDef, ToValue};

use crate::ctx::ParseCtx;
use crate::types::parse_type;

pub fn parse_block(
    value: Option<&serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Vec<Expr>> {
    match value {
        None => Ok(Vec::new()),
        Some(v) => {
            let items = c.require_array(v, loc)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_expr(item, c, &loc.push(i.to_string())))
                .collect()
        }
    }
}

pub fn parse_expr(value: &serde_json::Value, c: &mut ParseCtx<'_>, loc: &Location) -> PFAResult<Expr> {
    match value {
        serde_json::Value::Null => Ok(Expr::LiteralNull),
        serde_json::Value::Bool(b) => Ok(Expr::LiteralBoolean(*b)),
        serde_json::Value::Number(n) => parse_bare_number(n, loc),
        serde_json::Value::String(s) => Ok(Expr::Ref(c.interner.intern(s))),
        serde_json::Value::Array(items) => parse_wrapped_string_literal(items, loc),
        serde_json::Value::Object(obj) => parse_object_expr(obj, c, loc),
    }
}

fn parse_bare_number(n: &serde_json::Number, loc: &Location) -> PFAResult<Expr> {
    if let Some(i) = n.as_i64() {
        if let Ok(i32_val) = i32::try_from(i) {
            return Ok(Expr::LiteralInt(i32_val));
        }
        return Ok(Expr::LiteralLong(i));
    }
    if let Some(f) = n.as_f64() {
        return Ok(Expr::LiteralDouble(f));
    }
    Err(PFAError::syntax("unrepresentable number literal", loc.clone()))
}

/// `[["text"]]` is a PFA shorthand for a string literal, used where a bare
/// string would otherwise be read as a `Ref`.
fn parse_wrapped_string_literal(
    items: &[serde_json::Value],
    loc: &Location,
) -> PFAResult<Expr> {
    if let [serde_json::Value::Array(inner)] = items {
        if let [serde_json::Value::String(s)] = inner.as_slice() {
            return Ok(Expr::LiteralString(s.clone()));
        }
    }
    Err(PFAError::syntax(
        "bare JSON array is not a valid expression (did you mean `[[\"text\"]]` for a string literal?)",
        loc.clone(),
    ))
}

type JsonObj = serde_json::Map<String, serde_json::Value>;

fn parse_object_expr(obj: &JsonObj, c: &mut ParseCtx<'_>, loc: &Location) -> PFAResult<Expr> {
    if let Some(s) = single_key_str(obj, "string") {
        return Ok(Expr::LiteralString(s.to_string()));
    }
    if let Some(s) = single_key_str(obj, "base64") {
        return Ok(Expr::LiteralBase64(decode_base64(s, loc)?));
    }
    if let Some(v) = obj.get("int") {
        return Ok(Expr::LiteralInt(require_i32(v, loc)?));
    }
    if let Some(v) = obj.get("long") {
        return Ok(Expr::LiteralLong(require_i64(v, loc)?));
    }
    if let Some(v) = obj.get("float") {
        return Ok(Expr::LiteralFloat(require_f64(v, loc)? as f32));
    }
    if let Some(v) = obj.get("double") {
        return Ok(Expr::LiteralDouble(require_f64(v, loc)?));
    }
    if let (Some(ty), Some(value)) = (obj.get("type"), obj.get("value")) {
        if obj.len() == 2 {
            let ty = parse_type(ty, c, &loc.push("type"))?;
            return Ok(Expr::Literal {
                ty,
                value_json: value.clone(),
            });
        }
    }
    if let (Some(new_value), Some(ty_value)) = (obj.get("new"), obj.get("type")) {
        return parse_new(new_value, ty_value, c, loc);
    }
    if obj.contains_key("do") && obj.contains_key("until") {
        let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
        let cond = parse_expr(
            obj.get("until").expect("checked contains_key"),
            c,
            &loc.push("until"),
        )?;
        return Ok(Expr::DoUntil {
            body,
            cond: Box::new(cond),
        });
    }
    if obj.contains_key("do") && obj.len() == 1 {
        let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
        return Ok(Expr::Do(body));
    }
    if let Some(bindings) = obj.get("let") {
        return Ok(Expr::Let(parse_bindings(bindings, c, &loc.push("let"))?));
    }
    if let Some(bindings) = obj.get("set") {
        return Ok(Expr::SetVar(parse_bindings(bindings, c, &loc.push("set"))?));
    }
    if obj.contains_key("if") && obj.contains_key("then") {
        let cond = parse_expr(obj.get("if").expect("checked"), c, &loc.push("if"))?;
        let then = parse_block(obj.get("then"), c, &loc.push("then"))?;
        let els = obj
            .get("else")
            .map(|v| parse_block(Some(v), c, &loc.push("else")))
            .transpose()?;
        return Ok(Expr::If {
            cond: Box::new(cond),
            then,
            els,
        });
    }
    if let Some(branches_json) = obj.get("cond") {
        let arr = c.require_array(branches_json, &loc.push("cond"))?;
        let mut branches = Vec::with_capacity(arr.len());
        for (i, b) in arr.iter().enumerate() {
            let bloc = loc.push(format!("cond.{i}"));
            let bobj = c.require_object(b, &bloc)?;
            let cond = parse_expr(
                bobj.get("if")
                    .ok_or_else(|| PFAError::syntax("cond branch missing `if`", bloc.clone()))?,
                c,
                &bloc.push("if"),
            )?;
            let then = parse_block(bobj.get("then"), c, &bloc.push("then"))?;
            branches.push((cond, then));
        }
        let els = obj
            .get("else")
            .map(|v| parse_block(Some(v), c, &loc.push("else")))
            .transpose()?;
        return Ok(Expr::Cond { branches, els });
    }
    if obj.contains_key("for") {
        let init = parse_bindings(obj.get("for").expect("checked"), c, &loc.push("for"))?;
        let until = parse_expr(
            obj.get("while")
                .ok_or_else(|| PFAError::syntax("`for` missing `while`", loc.clone()))?,
            c,
            &loc.push("while"),
        )?;
        let step = parse_bindings(
            obj.get("step")
                .ok_or_else(|| PFAError::syntax("`for` missing `step`", loc.clone()))?,
            c,
            &loc.push("step"),
        )?;
        let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
        return Ok(Expr::For {
            init,
            until: Box::new(until),
            step,
            body,
        });
    }
    if obj.contains_key("while") && obj.contains_key("do") {
        let cond = parse_expr(obj.get("while").expect("checked"), c, &loc.push("while"))?;
        let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
        return Ok(Expr::While {
            cond: Box::new(cond),
            body,
        });
    }
    if let (Some(name_v), Some(in_v)) = (obj.get("foreach"), obj.get("in")) {
        let name = c.interner.intern(c.require_str(name_v, &loc.push("foreach"))?);
        let inexpr = parse_expr(in_v, c, &loc.push("in"))?;
        let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
        let seq = obj.get("seq").and_then(serde_json::Value::as_bool).unwrap_or(false);
        return Ok(Expr::Foreach {
            name,
            inexpr: Box::new(inexpr),
            body,
            seq,
        });
    }
    if let (Some(key_v), Some(val_v), Some(in_v)) =
        (obj.get("forkey"), obj.get("forval"), obj.get("in"))
    {
        let key = c.interner.intern(c.require_str(key_v, &loc.push("forkey"))?);
        let val = c.interner.intern(c.require_str(val_v, &loc.push("forval"))?);
        let inexpr = parse_expr(in_v, c, &loc.push("in"))?;
        let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
        return Ok(Expr::Forkeyval {
            key,
            val,
            inexpr: Box::new(inexpr),
            body,
        });
    }
    if let (Some(expr_v), Some(cases_v)) = (obj.get("cast"), obj.get("cases")) {
        let expr = parse_expr(expr_v, c, &loc.push("cast"))?;
        let cases_arr = c.require_array(cases_v, &loc.push("cases"))?;
        let mut cases = Vec::with_capacity(cases_arr.len());
        for (i, case) in cases_arr.iter().enumerate() {
            let cloc = loc.push(format!("cases.{i}"));
            let cobj = c.require_object(case, &cloc)?;
            let as_type = parse_type(
                cobj.get("as")
                    .ok_or_else(|| PFAError::syntax("cast case missing `as`", cloc.clone()))?,
                c,
                &cloc.push("as"),
            )?;
            let named = cobj
                .get("named")
                .and_then(|v| v.as_str())
                .map(|s| c.interner.intern(s));
            let body = parse_block(cobj.get("do"), c, &cloc.push("do"))?;
            cases.push(CastCase {
                as_type,
                named,
                body,
            });
        }
        let partial = obj
            .get("partial")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        return Ok(Expr::CastBlock {
            expr: Box::new(expr),
            cases,
            partial,
        });
    }
    if let Some(bindings) = obj.get("ifnotnull") {
        let bindings = parse_bindings(bindings, c, &loc.push("ifnotnull"))?;
        let then = parse_block(obj.get("then"), c, &loc.push("then"))?;
        let els = obj
            .get("else")
            .map(|v| parse_block(Some(v), c, &loc.push("else")))
            .transpose()?;
        return Ok(Expr::IfNotNull {
            bindings,
            then,
            els,
        });
    }
    if let (Some(expr_v), Some(as_v)) = (obj.get("upcast"), obj.get("as")) {
        let expr = parse_expr(expr_v, c, &loc.push("upcast"))?;
        let as_type = parse_type(as_v, c, &loc.push("as"))?;
        return Ok(Expr::Upcast {
            expr: Box::new(expr),
            as_type,
        });
    }
    if let Some(expr_v) = obj.get("attr") {
        let expr = parse_expr(expr_v, c, &loc.push("attr"))?;
        let path = parse_path(obj.get("path"), c, &loc.push("path"))?;
        return if let Some(to_v) = obj.get("to") {
            let to = parse_to(to_v, c, &loc.push("to"))?;
            Ok(Expr::AttrTo {
                expr: Box::new(expr),
                path,
                to: Box::new(to),
            })
        } else {
            Ok(Expr::AttrGet {
                expr: Box::new(expr),
                path,
            })
        };
    }
    if let Some(name_v) = obj.get("cell") {
        let name = c.interner.intern(c.require_str(name_v, &loc.push("cell"))?);
        let path = parse_path(obj.get("path"), c, &loc.push("path"))?;
        return if let Some(to_v) = obj.get("to") {
            let to = parse_to(to_v, c, &loc.push("to"))?;
            Ok(Expr::CellTo {
                name,
                path,
                to: Box::new(to),
            })
        } else {
            Ok(Expr::CellGet { name, path })
        };
    }
    if let Some(name_v) = obj.get("pool") {
        let name = c.interner.intern(c.require_str(name_v, &loc.push("pool"))?);
        let path = parse_path(obj.get("path"), c, &loc.push("path"))?;
        return if let Some(to_v) = obj.get("to") {
            let to = parse_to(to_v, c, &loc.push("to"))?;
            let init = obj
                .get("init")
                .map(|v| parse_expr(v, c, &loc.push("init")))
                .transpose()?
                .map(Box::new);
            Ok(Expr::PoolTo {
                name,
                path,
                to: Box::new(to),
                init,
            })
        } else {
            Ok(Expr::PoolGet { name, path })
        };
    }
    if let Some(name_v) = single_key_str(obj, "fcn") {
        return Ok(Expr::FcnRef(c.interner.intern(name_v)));
    }
    if let Some(text) = single_key_str(obj, "doc") {
        return Ok(Expr::Doc(text.to_string()));
    }
    if let Some(msg) = obj.get("error").and_then(|v| v.as_str()) {
        let code = obj.get("code").and_then(serde_json::Value::as_i64).map(|v| v as i32);
        return Ok(Expr::Error {
            msg: msg.to_string(),
            code,
        });
    }
    if let Some(args_v) = obj.get("log") {
        let args = c
            .require_array(args_v, &loc.push("log"))?
            .iter()
            .enumerate()
            .map(|(i, a)| parse_expr(a, c, &loc.push(format!("log.{i}"))))
            .collect::<PFAResult<Vec<_>>>()?;
        let namespace = obj
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        return Ok(Expr::Log { args, namespace });
    }
    if let Some(args_v) = obj.get("emit") {
        let args = c
            .require_array(args_v, &loc.push("emit"))?
            .iter()
            .enumerate()
            .map(|(i, a)| parse_expr(a, c, &loc.push(format!("emit.{i}"))))
            .collect::<PFAResult<Vec<_>>>()?;
        return Ok(Expr::Emit(args));
    }

    // Fallback: a single-key object `{"<fcnName>": [args...]}` is a call.
    if obj.len() == 1 {
        let (fcn_name, args_v) = obj.iter().next().expect("len == 1");
        let args = c
            .require_array(args_v, loc)?
            .iter()
            .enumerate()
            .map(|(i, a)| parse_expr(a, c, &loc.push(format!("{fcn_name}.{i}"))))
            .collect::<PFAResult<Vec<_>>>()?;
        return Ok(Expr::Call {
            fcn_name: c.interner.intern(fcn_name),
            args,
        });
    }

    Err(PFAError::syntax(
        format!("unrecognized expression form at {loc}"),
        loc.clone(),
    ))
}

fn parse_new(
    new_value: &serde_json::Value,
    ty_value: &serde_json::Value,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Expr> {
    let ty = parse_type(ty_value, c, &loc.push("type"))?;
    match &ty {
        pfa_ir::Type::Record(_) => {
            let obj = c.require_object(new_value, &loc.push("new"))?;
            let fields = obj
                .iter()
                .map(|(k, v)| {
                    let expr = parse_expr(v, c, &loc.push(format!("new.{k}")))?;
                    Ok((c.interner.intern(k), expr))
                })
                .collect::<PFAResult<Vec<_>>>()?;
            Ok(Expr::NewObject { fields, ty })
        }
        pfa_ir::Type::Array(_) => {
            let arr = c.require_array(new_value, &loc.push("new"))?;
            let items = arr
                .iter()
                .enumerate()
                .map(|(i, v)| parse_expr(v, c, &loc.push(format!("new.{i}"))))
                .collect::<PFAResult<Vec<_>>>()?;
            Ok(Expr::NewArray { items, ty })
        }
        other => Err(PFAError::semantic(
            format!("`new` requires a record or array type, found {other:?}"),
            loc.clone(),
        )),
    }
}

fn single_key_str<'a>(obj: &'a JsonObj, key: &str) -> Option<&'a str> {
    if obj.len() == 1 {
        obj.get(key).and_then(|v| v.as_str())
    } else {
        None
    }
}

fn require_i32(v: &serde_json::Value, loc: &Location) -> PFAResult<i32> {
    v.as_i64()
        .and_then(|i| i32::try_from(i).ok())
        .ok_or_else(|| PFAError::syntax("expected an int literal", loc.clone()))
}

fn require_i64(v: &serde_json::Value, loc: &Location) -> PFAResult<i64> {
    v.as_i64()
        .ok_or_else(|| PFAError::syntax("expected a long literal", loc.clone()))
}

fn require_f64(v: &serde_json::Value, loc: &Location) -> PFAResult<f64> {
    v.as_f64()
        .ok_or_else(|| PFAError::syntax("expected a floating point literal", loc.clone()))
}

fn parse_bindings(
    value: &serde_json::Value,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Vec<(Name, Expr)>> {
    let obj = c.require_object(value, loc)?;
    obj.iter()
        .map(|(k, v)| {
            let expr = parse_expr(v, c, &loc.push(k.clone()))?;
            Ok((c.interner.intern(k), expr))
        })
        .collect()
}

fn parse_path(
    value: Option<&serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<Vec<PathElement>> {
    let Some(value) = value else { return Ok(Vec::new()) };
    let arr = c.require_array(value, loc)?;
    arr.iter()
        .enumerate()
        .map(|(i, item)| Ok(PathElement(parse_expr(item, c, &loc.push(i.to_string()))?)))
        .collect()
}

fn parse_to(value: &serde_json::Value, c: &mut ParseCtx<'_>, loc: &Location) -> PFAResult<ToValue> {
    if let Some(obj) = value.as_object() {
        if let Some(name) = single_key_str(obj, "fcn") {
            return Ok(ToValue::FcnRef(c.interner.intern(name)));
        }
        if obj.contains_key("params") && obj.contains_key("ret") {
            return Ok(ToValue::FcnDef(parse_fcndef_obj(obj, c, loc)?));
        }
    }
    Ok(ToValue::Const(parse_expr(value, c, loc)?))
}

fn parse_fcndef_obj(obj: &JsonObj, c: &mut ParseCtx<'_>, loc: &Location) -> PFAResult<FcnDef> {
    let params_v = obj
        .get("params")
        .ok_or_else(|| PFAError::syntax("fcn missing `params`", loc.clone()))?;
    let params_arr = c.require_array(params_v, &loc.push("params"))?;
    let mut params = Vec::with_capacity(params_arr.len());
    for (i, p) in params_arr.iter().enumerate() {
        let pobj = c.require_object(p, &loc.push(format!("params.{i}")))?;
        let (pname, pty) = pobj
            .iter()
            .next()
            .ok_or_else(|| PFAError::syntax("empty param entry", loc.clone()))?;
        let ty = parse_type(pty, c, &loc.push(format!("params.{i}.{pname}")))?;
        params.push((c.interner.intern(pname), ty));
    }
    let ret_type = parse_type(
        obj.get("ret")
            .ok_or_else(|| PFAError::syntax("fcn missing `ret`", loc.clone()))?,
        c,
        &loc.push("ret"),
    )?;
    let body = parse_block(obj.get("do"), c, &loc.push("do"))?;
    Ok(FcnDef {
        params,
        ret_type,
        body,
    })
}

pub fn parse_fcns(
    value: Option<&serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<HashMap<Name, FcnDef>> {
    let Some(value) = value else { return Ok(HashMap::new()) };
    let obj = c.require_object(value, loc)?;
    obj.iter()
        .map(|(k, v)| {
            let fobj = c.require_object(v, &loc.push(k.clone()))?;
            let def = parse_fcndef_obj(fobj, c, &loc.push(k.clone()))?;
            Ok((c.interner.intern(k), def))
        })
        .collect()
}

pub fn parse_cells(
    value: Option<&serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<HashMap<Name, CellDef>> {
    let Some(value) = value else { return Ok(HashMap::new()) };
    let obj = c.require_object(value, loc)?;
    obj.iter()
        .map(|(k, v)| {
            let cloc = loc.push(k.clone());
            let cobj = c.require_object(v, &cloc)?;
            let ty = parse_type(
                cobj.get("type")
                    .ok_or_else(|| PFAError::syntax("cell missing `type`", cloc.clone()))?,
                c,
                &cloc.push("type"),
            )?;
            let init_json = cobj
                .get("init")
                .cloned()
                .ok_or_else(|| PFAError::syntax("cell missing `init`", cloc.clone()))?;
            let shared = cobj
                .get("shared")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            Ok((
                c.interner.intern(k),
                CellDef {
                    ty,
                    init_json,
                    shared,
                },
            ))
        })
        .collect()
}

pub fn parse_pools(
    value: Option<&serde_json::Value>,
    c: &mut ParseCtx<'_>,
    loc: &Location,
) -> PFAResult<HashMap<Name, PoolDef>> {
    let Some(value) = value else { return Ok(HashMap::new()) };
    let obj = c.require_object(value, loc)?;
    obj.iter()
        .map(|(k, v)| {
            let ploc = loc.push(k.clone());
            let pobj = c.require_object(v, &ploc)?;
            let ty = parse_type(
                pobj.get("type")
                    .ok_or_else(|| PFAError::syntax("pool missing `type`", ploc.clone()))?,
                c,
                &ploc.push("type"),
            )?;
            let init_map = pobj
                .get("init")
                .and_then(serde_json::Value::as_object)
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();
            let shared = pobj
                .get("shared")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            Ok((
                c.interner.intern(k),
                PoolDef {
                    ty,
                    init_map,
                    shared,
                },
            ))
        })
        .collect()
}

fn decode_base64(s: &str, loc: &Location) -> PFAResult<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|_| PFAError::syntax("invalid base64 literal", loc.clone()))
}
