//! Builds a typed PFA AST from the generic JSON configuration tree.
//!
//! Configuration ingestion itself (YAML or JSON surface syntax to a
//! generic tree) is out of scope (§1) — the host hands this crate a
//! [`serde_json::Value`] and gets back an [`EngineConfig`] plus the
//! [`Interner`] and [`TypeRegistry`] it was built against. Re-serializing
//! the result with [`canon::to_canonical_json`] reproduces the canonical
//! document shape (§6's round-trip property).

mod canon;
mod ctx;
mod expr;
mod types;

pub use canon::to_canonical_json;

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{EngineConfig, EngineOptions, Interner, TypeRegistry};

/// The parsed document plus the interner/registry it was built against.
/// All three must be kept together and passed to `pfa_eval` as a unit: the
/// `Name`s and `TypeHandle`s inside `config` are only meaningful relative
/// to this particular `interner`/`registry` pair.
pub struct ParsedDocument {
    pub config: EngineConfig,
    pub interner: Interner,
    pub registry: TypeRegistry,
}

/// Parse a full PFA document (the top-level JSON object described in §6)
/// into an [`EngineConfig`].
pub fn parse_document(value: &serde_json::Value) -> PFAResult<ParsedDocument> {
    let mut interner = Interner::new();
    let mut registry = TypeRegistry::new();
    let mut c = ctx::ParseCtx::new(&mut interner, &mut registry);

    let root = c.require_object(value, &Location::root())?;

    let method = match root.get("method").and_then(|v| v.as_str()) {
        Some("map") | None => pfa_ir::Method::Map,
        Some("emit") => pfa_ir::Method::Emit,
        Some("fold") => pfa_ir::Method::Fold,
        Some(other) => {
            return Err(PFAError::syntax(
                format!("unknown method `{other}`"),
                Location::root().push("method"),
            ))
        }
    };

    let input_type = types::parse_type(
        root.get("input")
            .ok_or_else(|| PFAError::syntax("missing `input`", Location::root()))?,
        &mut c,
        &Location::root().push("input"),
    )?;
    let output_type = types::parse_type(
        root.get("output")
            .ok_or_else(|| PFAError::syntax("missing `output`", Location::root()))?,
        &mut c,
        &Location::root().push("output"),
    )?;

    let begin = expr::parse_block(root.get("begin"), &mut c, &Location::root().push("begin"))?;
    let action = expr::parse_block(
        Some(
            root.get("action")
                .ok_or_else(|| PFAError::syntax("missing `action`", Location::root()))?,
        ),
        &mut c,
        &Location::root().push("action"),
    )?;
    let end = expr::parse_block(root.get("end"), &mut c, &Location::root().push("end"))?;

    let fcns = expr::parse_fcns(root.get("fcns"), &mut c, &Location::root().push("fcns"))?;
    let cells = expr::parse_cells(root.get("cells"), &mut c, &Location::root().push("cells"))?;
    let pools = expr::parse_pools(root.get("pools"), &mut c, &Location::root().push("pools"))?;

    let zero = root.get("zero").cloned();
    let randseed = root.get("randseed").and_then(serde_json::Value::as_i64);
    let doc = root
        .get("doc")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let metadata = root
        .get("metadata")
        .and_then(serde_json::Value::as_object)
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let options = parse_options(root.get("options"));

    let name = root
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let config = EngineConfig {
        name,
        method,
        input_type,
        output_type,
        begin,
        action,
        end,
        fcns,
        zero,
        cells,
        pools,
        randseed,
        doc,
        metadata,
        options,
    };

    Ok(ParsedDocument {
        config,
        interner,
        registry,
    })
}

fn parse_options(value: Option<&serde_json::Value>) -> EngineOptions {
    let Some(obj) = value.and_then(serde_json::Value::as_object) else {
        return EngineOptions::default();
    };
    let as_u64 = |k: &str| obj.get(k).and_then(serde_json::Value::as_u64);
    let lib1 = obj
        .iter()
        .filter(|(k, _)| k.starts_with("lib1."))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    EngineOptions {
        timeout_ms: as_u64("timeout"),
        timeout_begin_ms: as_u64("timeout.begin"),
        timeout_end_ms: as_u64("timeout.end"),
        lib1,
    }
}
