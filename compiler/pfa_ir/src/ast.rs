//! Tagged AST for a PFA document (§3: AST nodes).
//!
//! Every expression form from the PFA grammar is a variant of [`Expr`].
//! There is a single recursive sum rather than a class hierarchy; visitors
//! for type-checking and evaluation live outside these types (in
//! `pfa_eval`), not as methods on the variants.

use std::collections::HashMap;

use crate::interner::Name;
use crate::types::Type;

/// The three execution methods (§4.6, Glossary).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Method {
    Map,
    Emit,
    Fold,
}

/// A user-defined function (`fcns` map, or an inline `{params, ret, do}`
/// literal used as the argument to a higher-order built-in or as the `to`
/// of a path update).
#[derive(Clone, Debug)]
pub struct FcnDef {
    pub params: Vec<(Name, Type)>,
    pub ret_type: Type,
    pub body: Vec<Expr>,
}

/// The value bound to a path-update's `to:`.
///
/// `to` may be a plain replacement expression (type-checked directly
/// against the path's static type), or a function — either a reference to
/// a top-level user function or an inline function literal — with
/// signature `T -> T` where `T` is the type of the path being updated; the
/// function receives the current value and its result becomes the new
/// value.
#[derive(Clone, Debug)]
pub enum ToValue {
    Const(Expr),
    FcnRef(Name),
    FcnDef(FcnDef),
}

/// One segment of a deep path (`attr`/`cell`/`pool` `path: [...]`).
///
/// Parsing cannot tell a record field name apart from an array index or
/// map key expression — that choice depends on the *type* of the path head
/// at this point, which is only known once the type checker walks the
/// path (§3: "the static type chooses"). So every path element is parsed
/// as a plain [`Expr`]; the type checker is responsible for requiring a
/// `LiteralString` when the head is a `record` (and resolving it to a
/// field [`Name`] there) and otherwise type-checking it as a dynamic `int`
/// (array) or `string` (map) expression.
#[derive(Clone, Debug)]
pub struct PathElement(pub Expr);

#[derive(Clone, Debug)]
pub struct CastCase {
    pub as_type: Type,
    /// Optional binding name for the narrowed value inside `body`.
    pub named: Option<Name>,
    pub body: Vec<Expr>,
}

/// Every PFA expression form (§3).
#[derive(Clone, Debug)]
pub enum Expr {
    LiteralNull,
    LiteralBoolean(bool),
    LiteralInt(i32),
    LiteralLong(i64),
    LiteralFloat(f32),
    LiteralDouble(f64),
    LiteralString(String),
    LiteralBase64(Vec<u8>),
    /// A fully general `{"type": ..., "value": ...}` literal used for
    /// composite constant values (e.g. a literal record/array/union).
    Literal { ty: Type, value_json: serde_json::Value },

    NewObject { fields: Vec<(Name, Expr)>, ty: Type },
    NewArray { items: Vec<Expr>, ty: Type },

    Do(Vec<Expr>),
    Let(Vec<(Name, Expr)>),
    SetVar(Vec<(Name, Expr)>),
    If {
        cond: Box<Expr>,
        then: Vec<Expr>,
        els: Option<Vec<Expr>>,
    },
    Cond {
        branches: Vec<(Expr, Vec<Expr>)>,
        els: Option<Vec<Expr>>,
    },
    While {
        cond: Box<Expr>,
        body: Vec<Expr>,
    },
    DoUntil {
        body: Vec<Expr>,
        cond: Box<Expr>,
    },
    For {
        init: Vec<(Name, Expr)>,
        until: Box<Expr>,
        step: Vec<(Name, Expr)>,
        body: Vec<Expr>,
    },
    Foreach {
        name: Name,
        inexpr: Box<Expr>,
        body: Vec<Expr>,
        seq: bool,
    },
    Forkeyval {
        key: Name,
        val: Name,
        inexpr: Box<Expr>,
        body: Vec<Expr>,
    },
    CastBlock {
        expr: Box<Expr>,
        cases: Vec<CastCase>,
        partial: bool,
    },
    IfNotNull {
        bindings: Vec<(Name, Expr)>,
        then: Vec<Expr>,
        els: Option<Vec<Expr>>,
    },
    Upcast {
        expr: Box<Expr>,
        as_type: Type,
    },

    Ref(Name),

    AttrGet {
        expr: Box<Expr>,
        path: Vec<PathElement>,
    },
    AttrTo {
        expr: Box<Expr>,
        path: Vec<PathElement>,
        to: Box<ToValue>,
    },
    CellGet {
        name: Name,
        path: Vec<PathElement>,
    },
    CellTo {
        name: Name,
        path: Vec<PathElement>,
        to: Box<ToValue>,
    },
    PoolGet {
        name: Name,
        path: Vec<PathElement>,
    },
    PoolTo {
        name: Name,
        path: Vec<PathElement>,
        to: Box<ToValue>,
        init: Option<Box<Expr>>,
    },

    Call {
        fcn_name: Name,
        args: Vec<Expr>,
    },
    FcnRef(Name),

    Doc(String),
    Error {
        msg: String,
        code: Option<i32>,
    },
    Log {
        args: Vec<Expr>,
        namespace: Option<String>,
    },
    Emit(Vec<Expr>),
}

/// `cell: { name: { type, init, shared } }`.
#[derive(Clone, Debug)]
pub struct CellDef {
    pub ty: Type,
    pub init_json: serde_json::Value,
    pub shared: bool,
}

/// `pool: { name: { type, init, shared } }`. `init` is a map from string key
/// to a JSON value of the pool's value type.
#[derive(Clone, Debug)]
pub struct PoolDef {
    pub ty: Type,
    pub init_map: HashMap<String, serde_json::Value>,
    pub shared: bool,
}

/// Engine-wide options (`options` top-level key, §6).
#[derive(Clone, Debug, Default)]
pub struct EngineOptions {
    pub timeout_ms: Option<u64>,
    pub timeout_begin_ms: Option<u64>,
    pub timeout_end_ms: Option<u64>,
    pub lib1: HashMap<String, serde_json::Value>,
}

/// The root AST node: one parsed-and-type-checkable PFA document.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub name: Option<String>,
    pub method: Method,
    pub input_type: Type,
    pub output_type: Type,
    pub begin: Vec<Expr>,
    pub action: Vec<Expr>,
    pub end: Vec<Expr>,
    pub fcns: HashMap<Name, FcnDef>,
    /// Required and type-checked against `output_type` when `method ==
    /// Fold`; absent otherwise.
    pub zero: Option<serde_json::Value>,
    pub cells: HashMap<Name, CellDef>,
    pub pools: HashMap<Name, PoolDef>,
    pub randseed: Option<i64>,
    pub doc: Option<String>,
    pub metadata: HashMap<String, String>,
    pub options: EngineOptions,
}
