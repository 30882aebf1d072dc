//! Evaluator (§4.6): tree-walking interpreter over a type-checked
//! [`EngineConfig`], driving the `begin`/`action`/`end` lifecycle for the
//! three execution methods.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{
    CastCase, EngineConfig, Expr, FcnDef, Interner, Method, Name, PathElement, ToValue, Type,
    TypeRegistry,
};
use pfa_types::{BuiltinCatalog, FunctionCatalog, resolve};

use crate::ops::call_builtin;
use crate::state::{PathOps, StateStore, StateTemplate};
use crate::typecheck::typecheck;
use crate::value::{default_for, from_json, Value};

/// A deadline a running action must not cross, checked cooperatively at
/// loop back-edges and user-function entry — there is no thread interrupt
/// or suspension point (§5: cooperative cancellation).
struct Deadline {
    limit_ms: u64,
    expires_at: Instant,
}

impl Deadline {
    fn new(limit_ms: u64) -> Self {
        Deadline {
            limit_ms,
            expires_at: Instant::now() + Duration::from_millis(limit_ms),
        }
    }

    fn check(&self) -> PFAResult<()> {
        if Instant::now() >= self.expires_at {
            return Err(PFAError::timeout(self.limit_ms));
        }
        Ok(())
    }
}

/// The compiled, type-checked engine: shared, read-only after
/// construction. One `Engine` can back many independent [`Actor`]s.
pub struct Engine {
    registry: TypeRegistry,
    interner: Interner,
    catalog: BuiltinCatalog,
    config: EngineConfig,
    template: StateTemplate,
    input_name: Name,
    tally_name: Name,
}

impl Engine {
    /// Type-checks `config` and builds the shared cell/pool template.
    /// Semantic errors here abort construction entirely (§7).
    pub fn new(mut interner: Interner, registry: TypeRegistry, config: EngineConfig) -> PFAResult<Self> {
        let catalog = BuiltinCatalog::new(&mut interner);
        typecheck(&config, &registry, &mut interner, &catalog)?;
        let input_name = interner.intern("input");
        let tally_name = interner.intern("tally");

        let mut cell_values = HashMap::with_capacity(config.cells.len());
        for (name, def) in &config.cells {
            let v = from_json(&def.init_json, &def.ty, &registry, &interner).ok_or_else(|| {
                PFAError::semantic(
                    format!("cell `{}` init does not match its declared type", interner.resolve(*name)),
                    Location::root().push("cells"),
                )
            })?;
            cell_values.insert(*name, v);
        }
        let mut pool_values = HashMap::with_capacity(config.pools.len());
        for (name, def) in &config.pools {
            let mut map = HashMap::with_capacity(def.init_map.len());
            for (key, json) in &def.init_map {
                let v = from_json(json, &def.ty, &registry, &interner).ok_or_else(|| {
                    PFAError::semantic(
                        format!("pool `{}` key `{key}` does not match its declared type", interner.resolve(*name)),
                        Location::root().push("pools"),
                    )
                })?;
                map.insert(key.clone(), v);
            }
            pool_values.insert(*name, map);
        }
        let template = StateTemplate::build(&config.cells, &config.pools, cell_values, pool_values);

        Ok(Engine {
            registry,
            interner,
            catalog,
            config,
            template,
            input_name,
            tally_name,
        })
    }

    pub fn method(&self) -> Method {
        self.config.method
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn input_type(&self) -> &Type {
        &self.config.input_type
    }

    pub fn output_type(&self) -> &Type {
        &self.config.output_type
    }

    /// Starts a new independent actor: fresh private cell/pool copies
    /// (shared ones alias the engine's), a fresh PRNG, and the `zero`
    /// tally for fold engines. Runs `begin`.
    pub fn new_actor(&self) -> PFAResult<Actor<'_>> {
        let mut state = self.template.new_actor_state();
        let tally = match self.config.method {
            Method::Fold => {
                let zero_json = self.config.zero.as_ref().expect("typecheck requires zero for fold");
                let v = from_json(zero_json, &self.config.output_type, &self.registry, &self.interner)
                    .ok_or_else(|| PFAError::semantic("`zero` does not match output type", Location::root()))?;
                Some(v)
            }
            Method::Map | Method::Emit => None,
        };

        let mut actor = Actor {
            engine: self,
            state: std::mem::replace(&mut state, self.template.new_actor_state()),
            rng: make_rng(self.config.randseed),
            tally,
        };
        actor.run_begin()?;
        Ok(actor)
    }

    fn deadline(&self, override_ms: Option<u64>) -> Option<Deadline> {
        override_ms.or(self.config.options.timeout_ms).map(Deadline::new)
    }
}

fn make_rng(seed: Option<i64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s as u64),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// One independent execution context: its own private cell/pool copies
/// (shared ones are `Arc`-aliased with every other actor of the same
/// engine), its own PRNG stream, and — for fold engines — its own
/// running tally.
pub struct Actor<'e> {
    engine: &'e Engine,
    state: StateStore,
    rng: ChaCha8Rng,
    tally: Option<Value>,
}

/// What one `action()` call produced: a single mapped/folded output, or
/// zero-or-more explicitly emitted records (§4.6).
#[derive(Debug, Default)]
pub struct ActionOutcome {
    pub output: Option<Value>,
    pub emitted: Vec<Value>,
}

impl<'e> Actor<'e> {
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn tally(&self) -> Option<&Value> {
        self.tally.as_ref()
    }

    fn run_begin(&mut self) -> PFAResult<()> {
        let deadline = self.engine.deadline(self.engine.config.options.timeout_begin_ms);
        let mut env = Env::new();
        let mut ctx = EvalCtx {
            engine: self.engine,
            state: &mut self.state,
            rng: &mut self.rng,
            deadline: deadline.as_ref(),
            in_action: false,
            tally: None,
            emitted: &mut Vec::new(),
        };
        ctx.eval_block(&self.engine.config.begin, &mut env)?;
        Ok(())
    }

    pub fn run_end(&mut self) -> PFAResult<()> {
        let deadline = self.engine.deadline(self.engine.config.options.timeout_end_ms);
        let mut env = Env::new();
        let mut ctx = EvalCtx {
            engine: self.engine,
            state: &mut self.state,
            rng: &mut self.rng,
            deadline: deadline.as_ref(),
            in_action: false,
            tally: None,
            emitted: &mut Vec::new(),
        };
        ctx.eval_block(&self.engine.config.end, &mut env)?;
        Ok(())
    }

    /// Runs `action` once against `input`, implementing the semantics of
    /// whichever [`Method`] the engine declared.
    ///
    /// - `Map`: the block's final value is the single output.
    /// - `Emit`: the block's final value is discarded; zero or more
    ///   values reach `ActionOutcome::emitted` via explicit `emit` nodes.
    /// - `Fold`: the block's final value becomes both the call's output
    ///   and the actor's persisted tally for the next call, mirroring
    ///   Map's action→output relation onto the accumulator.
    pub fn action(&mut self, input: Value) -> PFAResult<ActionOutcome> {
        let deadline = self.engine.deadline(None);
        let mut emitted = Vec::new();
        let tally_name = self.engine.tally_name;
        let input_name = self.engine.input_name;

        let mut env = Env::new();
        env.declare(input_name, input);
        if let Some(t) = &self.tally {
            env.declare(tally_name, t.clone());
        }

        let result = {
            let mut ctx = EvalCtx {
                engine: self.engine,
                state: &mut self.state,
                rng: &mut self.rng,
                deadline: deadline.as_ref(),
                in_action: true,
                tally: Some(tally_name),
                emitted: &mut emitted,
            };
            ctx.eval_block(&self.engine.config.action, &mut env)?
        };

        match self.engine.config.method {
            Method::Map => Ok(ActionOutcome { output: Some(result), emitted }),
            Method::Emit => Ok(ActionOutcome { output: None, emitted }),
            Method::Fold => {
                self.tally = Some(result.clone());
                Ok(ActionOutcome { output: Some(result), emitted })
            }
        }
    }
}

/// The runtime analogue of [`crate::scope::Scope`]: a stack of frames
/// holding actual values rather than static types.
struct Env {
    frames: Vec<FxHashMap<Name, Value>>,
}

impl Env {
    fn new() -> Self {
        Env { frames: vec![FxHashMap::default()] }
    }

    fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    fn pop_frame(&mut self) {
        self.frames.pop();
    }

    fn declare(&mut self, name: Name, value: Value) {
        self.frames.last_mut().expect("at least one frame").insert(name, value);
    }

    fn lookup(&self, name: Name) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.get(&name))
    }

    fn assign(&mut self, name: Name, value: Value) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if frame.contains_key(&name) {
                frame.insert(name, value);
                return true;
            }
        }
        false
    }
}

/// One segment of an already-evaluated path: a record field name, an
/// array index, or a map key, resolved against live [`Value`]s rather
/// than static types.
enum PathStep {
    Field(String),
    Index(i64),
    Key(String),
}

struct EvalPath<'a> {
    steps: Vec<PathStep>,
    interner: &'a Interner,
    loc: Location,
}

impl PathOps for EvalPath<'_> {
    fn len(&self) -> usize {
        self.steps.len()
    }

    fn get_child(&self, value: &Value, index: usize) -> PFAResult<Value> {
        match (&self.steps[index], value) {
            (PathStep::Field(name), Value::Record(_, fields)) => fields
                .iter()
                .find(|(n, _)| self.interner.resolve(**n) == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| PFAError::runtime(format!("unknown field `{name}`"), self.loc.clone())),
            (PathStep::Index(i), Value::Array(items)) => {
                let idx = usize::try_from(*i).ok().filter(|idx| *idx < items.len());
                match idx {
                    Some(idx) => Ok(items[idx].clone()),
                    None => Err(PFAError::runtime(format!("array index {i} out of bounds"), self.loc.clone())),
                }
            }
            (PathStep::Key(k), Value::Map(m)) => m
                .get(k)
                .cloned()
                .ok_or_else(|| PFAError::runtime(format!("map key `{k}` absent"), self.loc.clone())),
            _ => Err(PFAError::runtime("path element does not match value shape", self.loc.clone())),
        }
    }

    fn set_child(&self, value: Value, index: usize, new_child: Value) -> PFAResult<Value> {
        match (&self.steps[index], value) {
            (PathStep::Field(name), Value::Record(handle, mut fields)) => {
                let key = fields
                    .keys()
                    .find(|n| self.interner.resolve(**n) == name)
                    .copied()
                    .ok_or_else(|| PFAError::runtime(format!("unknown field `{name}`"), self.loc.clone()))?;
                fields.insert(key, new_child);
                Ok(Value::Record(handle, fields))
            }
            (PathStep::Index(i), Value::Array(mut items)) => {
                let idx = usize::try_from(*i).ok().filter(|idx| *idx < items.len());
                match idx {
                    Some(idx) => {
                        items[idx] = new_child;
                        Ok(Value::Array(items))
                    }
                    None => Err(PFAError::runtime(format!("array index {i} out of bounds"), self.loc.clone())),
                }
            }
            (PathStep::Key(k), Value::Map(mut m)) => {
                m.insert(k.clone(), new_child);
                Ok(Value::Map(m))
            }
            _ => Err(PFAError::runtime("path element does not match value shape", self.loc.clone())),
        }
    }
}

/// Per-call evaluation context threaded through the tree walk.
struct EvalCtx<'a> {
    engine: &'a Engine,
    state: &'a mut StateStore,
    rng: &'a mut ChaCha8Rng,
    deadline: Option<&'a Deadline>,
    in_action: bool,
    /// `Some(name)` when the interned text `"tally"` should be treated
    /// as the fold accumulator rather than an ordinary binding.
    tally: Option<Name>,
    emitted: &'a mut Vec<Value>,
}

impl EvalCtx<'_> {
    fn check_deadline(&self) -> PFAResult<()> {
        if let Some(d) = self.deadline {
            d.check()?;
        }
        Ok(())
    }

    fn eval_block(&mut self, body: &[Expr], env: &mut Env) -> PFAResult<Value> {
        pfa_stack::ensure_sufficient_stack(|| {
            let mut last = Value::Null;
            for e in body {
                last = self.eval_expr(e, env)?;
            }
            Ok(last)
        })
    }

    fn eval_expr(&mut self, expr: &Expr, env: &mut Env) -> PFAResult<Value> {
        pfa_stack::ensure_sufficient_stack(|| self.eval_expr_inner(expr, env))
    }

    fn eval_expr_inner(&mut self, expr: &Expr, env: &mut Env) -> PFAResult<Value> {
        match expr {
            Expr::LiteralNull => Ok(Value::Null),
            Expr::LiteralBoolean(b) => Ok(Value::Boolean(*b)),
            Expr::LiteralInt(i) => Ok(Value::Int(*i)),
            Expr::LiteralLong(l) => Ok(Value::Long(*l)),
            Expr::LiteralFloat(f) => Ok(Value::Float(*f)),
            Expr::LiteralDouble(d) => Ok(Value::Double(*d)),
            Expr::LiteralString(s) => Ok(Value::String(s.clone())),
            Expr::LiteralBase64(b) => Ok(Value::Bytes(b.clone())),
            Expr::Literal { ty, value_json } => {
                from_json(value_json, ty, &self.engine.registry, &self.engine.interner)
                    .ok_or_else(|| PFAError::runtime("literal does not match its declared type", Location::root()))
            }

            Expr::NewObject { ty, fields } => {
                let Type::Record(handle) = ty else {
                    return Err(PFAError::runtime("`new` target is not a record", Location::root()));
                };
                let mut out = HashMap::with_capacity(fields.len());
                for (name, e) in fields {
                    out.insert(*name, self.eval_expr(e, env)?);
                }
                Ok(Value::Record(*handle, out))
            }
            Expr::NewArray { items, .. } => {
                let mut out = Vec::with_capacity(items.len());
                for e in items {
                    out.push(self.eval_expr(e, env)?);
                }
                Ok(Value::Array(out))
            }

            Expr::Do(body) => {
                env.push_frame();
                let r = self.eval_block(body, env);
                env.pop_frame();
                r
            }
            Expr::Let(bindings) => {
                for (name, e) in bindings {
                    let v = self.eval_expr(e, env)?;
                    env.declare(*name, v);
                }
                Ok(Value::Null)
            }
            Expr::SetVar(bindings) => {
                for (name, e) in bindings {
                    let v = self.eval_expr(e, env)?;
                    if Some(*name) == self.tally {
                        env.assign(*name, v);
                        continue;
                    }
                    if !env.assign(*name, v) {
                        return Err(PFAError::runtime(
                            format!("`set` on unbound name `{}`", self.engine.interner.resolve(*name)),
                            Location::root(),
                        ));
                    }
                }
                Ok(Value::Null)
            }
            Expr::If { cond, then, els } => {
                if self.eval_bool(cond, env)? {
                    env.push_frame();
                    let r = self.eval_block(then, env);
                    env.pop_frame();
                    r
                } else if let Some(els) = els {
                    env.push_frame();
                    let r = self.eval_block(els, env);
                    env.pop_frame();
                    r
                } else {
                    Ok(Value::Null)
                }
            }
            Expr::Cond { branches, els } => {
                for (cond, body) in branches {
                    if self.eval_bool(cond, env)? {
                        env.push_frame();
                        let r = self.eval_block(body, env);
                        env.pop_frame();
                        return r;
                    }
                }
                match els {
                    Some(els) => {
                        env.push_frame();
                        let r = self.eval_block(els, env);
                        env.pop_frame();
                        r
                    }
                    None => Ok(Value::Null),
                }
            }
            Expr::While { cond, body } => {
                env.push_frame();
                let r = (|| {
                    while self.eval_bool(cond, env)? {
                        self.check_deadline()?;
                        self.eval_block(body, env)?;
                    }
                    Ok(Value::Null)
                })();
                env.pop_frame();
                r
            }
            Expr::DoUntil { body, cond } => {
                env.push_frame();
                let r = (|| loop {
                    self.eval_block(body, env)?;
                    if self.eval_bool(cond, env)? {
                        return Ok(Value::Null);
                    }
                    self.check_deadline()?;
                })();
                env.pop_frame();
                r
            }
            Expr::For { init, until, step, body } => {
                env.push_frame();
                let r = (|| {
                    for (name, e) in init {
                        let v = self.eval_expr(e, env)?;
                        env.declare(*name, v);
                    }
                    while self.eval_bool(until, env)? {
                        self.check_deadline()?;
                        self.eval_block(body, env)?;
                        for (name, e) in step {
                            let v = self.eval_expr(e, env)?;
                            env.assign(*name, v);
                        }
                    }
                    Ok(Value::Null)
                })();
                env.pop_frame();
                r
            }
            Expr::Foreach { name, inexpr, body, .. } => {
                let items = match self.eval_expr(inexpr, env)? {
                    Value::Array(items) => items,
                    _ => return Err(PFAError::runtime("`foreach` requires an array", Location::root())),
                };
                env.push_frame();
                let r = (|| {
                    for item in items {
                        self.check_deadline()?;
                        env.declare(*name, item);
                        self.eval_block(body, env)?;
                    }
                    Ok(Value::Null)
                })();
                env.pop_frame();
                r
            }
            Expr::Forkeyval { key, val, inexpr, body } => {
                let map = match self.eval_expr(inexpr, env)? {
                    Value::Map(m) => m,
                    _ => return Err(PFAError::runtime("`forkey`/`forval` requires a map", Location::root())),
                };
                env.push_frame();
                let r = (|| {
                    for (k, v) in map {
                        self.check_deadline()?;
                        env.declare(*key, Value::String(k));
                        env.declare(*val, v);
                        self.eval_block(body, env)?;
                    }
                    Ok(Value::Null)
                })();
                env.pop_frame();
                r
            }
            Expr::CastBlock { expr, cases, partial } => {
                let scrutinee = self.eval_expr(expr, env)?;
                let active = scrutinee.value_type(&self.engine.registry);
                for case in cases {
                    if self.engine.registry.equal(&case.as_type, &active) {
                        return self.eval_cast_case(case, scrutinee, env);
                    }
                }
                if *partial {
                    Ok(Value::Null)
                } else {
                    Err(PFAError::runtime("no `cast` case matched the value's runtime type", Location::root()))
                }
            }
            Expr::IfNotNull { bindings, then, els } => {
                env.push_frame();
                let mut all_non_null = true;
                for (name, e) in bindings {
                    let v = self.eval_expr(e, env)?;
                    if v.is_null() {
                        all_non_null = false;
                        break;
                    }
                    env.declare(*name, v);
                }
                let r = if all_non_null {
                    self.eval_block(then, env)
                } else {
                    match els {
                        Some(els) => self.eval_block(els, env),
                        None => Ok(Value::Null),
                    }
                };
                env.pop_frame();
                r
            }
            Expr::Upcast { expr, .. } => self.eval_expr(expr, env),

            Expr::Ref(name) => {
                if Some(*name) == self.tally {
                    return env
                        .lookup(*name)
                        .cloned()
                        .ok_or_else(|| PFAError::runtime("`tally` read before initialization", Location::root()));
                }
                env.lookup(*name).cloned().ok_or_else(|| {
                    PFAError::runtime(
                        format!("use of unbound name `{}`", self.engine.interner.resolve(*name)),
                        Location::root(),
                    )
                })
            }

            Expr::AttrGet { expr, path } => {
                let head = self.eval_expr(expr, env)?;
                let evaluated = self.eval_path(&head, path, env)?;
                evaluated.get_whole(&head)
            }
            Expr::AttrTo { expr, path, to } => {
                let head = self.eval_expr(expr, env)?;
                let evaluated = self.eval_path(&head, path, env)?;
                let leaf = evaluated.get_whole(&head)?;
                let updated = self.apply_to(to, leaf, env)?;
                evaluated.set_whole(head, updated)
            }
            Expr::CellGet { name, path } => {
                let evaluated = self.eval_path_against_cell(*name, path, env)?;
                self.state.cell_get(*name, &evaluated, &Location::root())
            }
            Expr::CellTo { name, path, to } => {
                let evaluated = self.eval_path_against_cell(*name, path, env)?;
                let leaf = self.state.cell_get(*name, &evaluated, &Location::root())?;
                let updated = self.apply_to(to, leaf, env)?;
                self.state.cell_update(*name, &evaluated, |_old| Ok(updated), &Location::root())
            }
            Expr::PoolGet { name, path } => {
                let (key, rest) = self.eval_pool_path(*name, path, env)?;
                self.state.pool_get(*name, &key, &rest, &Location::root())
            }
            Expr::PoolTo { name, path, to, init } => {
                let (key, rest) = self.eval_pool_path(*name, path, env)?;
                let init_v = match init {
                    Some(e) => Some(self.eval_expr(e, env)?),
                    None => None,
                };
                let leaf = self.state.pool_peek(*name, &key, &rest, init_v.clone(), &Location::root())?;
                let updated = self.apply_to(to, leaf, env)?;
                self.state.pool_update(*name, &key, &rest, |_old| Ok(updated), init_v, &Location::root())
            }

            Expr::Call { fcn_name, args } => {
                // `and`/`or` short-circuit (§4.7): the second operand is
                // not evaluated once the first decides the result, so it
                // cannot be a plain built-in dispatched after eagerly
                // evaluating every argument.
                match (self.engine.interner.resolve(*fcn_name), args.as_slice()) {
                    ("and", [lhs, rhs]) => {
                        if !self.eval_bool(lhs, env)? {
                            return Ok(Value::Boolean(false));
                        }
                        return Ok(Value::Boolean(self.eval_bool(rhs, env)?));
                    }
                    ("or", [lhs, rhs]) => {
                        if self.eval_bool(lhs, env)? {
                            return Ok(Value::Boolean(true));
                        }
                        return Ok(Value::Boolean(self.eval_bool(rhs, env)?));
                    }
                    _ => {}
                }
                let mut arg_values = Vec::with_capacity(args.len());
                for a in args {
                    arg_values.push(self.eval_expr(a, env)?);
                }
                self.call(*fcn_name, arg_values, env)
            }
            Expr::FcnRef(_) => Ok(Value::Null),

            Expr::Doc(_) => Ok(Value::Null),
            Expr::Error { msg, code } => Err(PFAError::user(msg.clone(), *code)),
            Expr::Log { args, namespace } => {
                let mut parts = Vec::with_capacity(args.len());
                for a in args {
                    parts.push(self.eval_expr(a, env)?);
                }
                let rendered: Vec<String> = parts.iter().map(|v| format!("{v:?}")).collect();
                match namespace {
                    Some(ns) => tracing::info!(target: "pfa::log", namespace = %ns, "{}", rendered.join(" ")),
                    None => tracing::info!(target: "pfa::log", "{}", rendered.join(" ")),
                }
                Ok(Value::Null)
            }
            Expr::Emit(args) => {
                for a in args {
                    let v = self.eval_expr(a, env)?;
                    self.emitted.push(v);
                }
                Ok(Value::Null)
            }
        }
    }

    fn eval_bool(&mut self, expr: &Expr, env: &mut Env) -> PFAResult<bool> {
        match self.eval_expr(expr, env)? {
            Value::Boolean(b) => Ok(b),
            _ => Err(PFAError::runtime("condition did not evaluate to boolean", Location::root())),
        }
    }

    fn eval_cast_case(&mut self, case: &CastCase, scrutinee: Value, env: &mut Env) -> PFAResult<Value> {
        env.push_frame();
        if let Some(name) = case.named {
            env.declare(name, scrutinee);
        }
        let r = self.eval_block(&case.body, env);
        env.pop_frame();
        r
    }

    fn apply_to(&mut self, to: &ToValue, leaf: Value, env: &mut Env) -> PFAResult<Value> {
        match to {
            ToValue::Const(e) => self.eval_expr(e, env),
            ToValue::FcnRef(name) => self.call_user_fcn_by_name(*name, vec![leaf]),
            ToValue::FcnDef(def) => self.call_fcndef(def, vec![leaf]),
        }
    }

    fn eval_path(&mut self, _head: &Value, path: &[PathElement], env: &mut Env) -> PFAResult<EvalPath<'_>> {
        let mut steps = Vec::with_capacity(path.len());
        for elem in path {
            steps.push(self.eval_path_step(&elem.0, env)?);
        }
        Ok(EvalPath { steps, interner: &self.engine.interner, loc: Location::root() })
    }

    fn eval_path_against_cell(&mut self, _name: Name, path: &[PathElement], env: &mut Env) -> PFAResult<EvalPath<'_>> {
        self.eval_path(&Value::Null, path, env)
    }

    fn eval_pool_path(&mut self, _name: Name, path: &[PathElement], env: &mut Env) -> PFAResult<(String, EvalPath<'_>)> {
        let Some((key_elem, rest)) = path.split_first() else {
            return Err(PFAError::runtime("pool access requires a key", Location::root()));
        };
        let key = match self.eval_expr(&key_elem.0, env)? {
            Value::String(s) => s,
            _ => return Err(PFAError::runtime("pool key must evaluate to string", Location::root())),
        };
        let mut steps = Vec::with_capacity(rest.len());
        for elem in rest {
            steps.push(self.eval_path_step(&elem.0, env)?);
        }
        Ok((key, EvalPath { steps, interner: &self.engine.interner, loc: Location::root() }))
    }

    fn eval_path_step(&mut self, elem: &Expr, env: &mut Env) -> PFAResult<PathStep> {
        if let Expr::LiteralString(s) = elem {
            // Could be a record field name or a map key; disambiguated by
            // the value shape at `get_child`/`set_child` time, so the
            // same literal text works for both — we just need to know
            // it's a name, never an index.
            return Ok(PathStep::Field(s.clone()));
        }
        match self.eval_expr(elem, env)? {
            Value::Int(i) => Ok(PathStep::Index(i64::from(i))),
            Value::Long(l) => Ok(PathStep::Index(l)),
            Value::String(s) => Ok(PathStep::Key(s)),
            _ => Err(PFAError::runtime("path element must be a string, int, or long", Location::root())),
        }
    }

    fn call(&mut self, fcn_name: Name, args: Vec<Value>, _env: &mut Env) -> PFAResult<Value> {
        let text = self.engine.interner.resolve(fcn_name);
        if let Some(suffix) = text.strip_prefix("u.") {
            return self.call_user_fcn_by_text(suffix, args);
        }
        let signatures = self
            .engine
            .catalog
            .lookup(text)
            .ok_or_else(|| PFAError::runtime(format!("unknown function `{text}`"), Location::root()))?;
        let arg_types: Vec<Type> = args.iter().map(|v| v.value_type(&self.engine.registry)).collect();
        let (_ret, _idx) = resolve(text, signatures, &arg_types, &self.engine.registry, &self.engine.interner)
            .map_err(|e| PFAError::runtime(e.to_string(), Location::root()))?;
        call_builtin(text, &args, &Location::root())
    }

    fn call_user_fcn_by_name(&mut self, name: Name, args: Vec<Value>) -> PFAResult<Value> {
        let text = self.engine.interner.resolve(name);
        let suffix = text.strip_prefix("u.").unwrap_or(text);
        self.call_user_fcn_by_text(suffix, args)
    }

    fn call_user_fcn_by_text(&mut self, suffix: &str, args: Vec<Value>) -> PFAResult<Value> {
        self.check_deadline()?;
        let def = self
            .engine
            .config
            .fcns
            .iter()
            .find(|(n, _)| self.engine.interner.resolve(**n) == suffix)
            .map(|(_, def)| def.clone())
            .ok_or_else(|| PFAError::runtime(format!("unknown function `u.{suffix}`"), Location::root()))?;
        self.call_fcndef(&def, args)
    }

    fn call_fcndef(&mut self, def: &FcnDef, args: Vec<Value>) -> PFAResult<Value> {
        self.check_deadline()?;
        let mut env = Env::new();
        for ((name, _), value) in def.params.iter().zip(args) {
            env.declare(*name, value);
        }
        self.eval_block(&def.body, &mut env)
    }
}

