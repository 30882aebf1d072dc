//! Type checker (§4.4): walks the AST bottom-up, enforcing scope and
//! signature rules. Rather than persisting a decorated copy of the AST,
//! this pass is purely a validator — the evaluator re-derives the same
//! per-node types during its own tree walk, which is cheap for PFA's
//! interpreter-speed target and avoids needing an arena-indexed AST only
//! to hang type annotations off of it.

use std::collections::HashMap;

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{
    CastCase, EngineConfig, Expr, FcnDef, Interner, Method, Name, PathElement, ToValue, Type,
    TypeRegistry,
};
use pfa_types::{FunctionCatalog, accepts, lub, resolve};

use crate::scope::{DeclareError, Scope};

pub struct TypeChecker<'a> {
    registry: &'a TypeRegistry,
    interner: &'a Interner,
    catalog: &'a dyn FunctionCatalog,
    fcns: &'a HashMap<Name, FcnDef>,
    cells: HashMap<Name, Type>,
    pools: HashMap<Name, Type>,
    method: Method,
    output_type: Type,
    tally_name: Name,
}

pub fn typecheck(
    config: &EngineConfig,
    registry: &TypeRegistry,
    interner: &mut Interner,
    catalog: &dyn FunctionCatalog,
) -> PFAResult<()> {
    let tally_name = interner.intern("tally");
    let tc = TypeChecker {
        registry,
        interner,
        catalog,
        fcns: &config.fcns,
        cells: config.cells.iter().map(|(n, c)| (*n, c.ty.clone())).collect(),
        pools: config.pools.iter().map(|(n, p)| (*n, p.ty.clone())).collect(),
        method: config.method,
        output_type: config.output_type.clone(),
        tally_name,
    };

    if config.method == Method::Fold && config.zero.is_none() {
        return Err(PFAError::semantic(
            "fold method requires `zero`",
            Location::root(),
        ));
    }

    let mut begin_scope = Scope::new();
    tc.check_block(&config.begin, &mut begin_scope, false, &Location::root().push("begin"))?;

    let mut action_scope = Scope::new();
    action_scope
        .declare(tally_name, config.output_type.clone(), true)
        .map_err(|_| PFAError::semantic("internal: tally redeclared", Location::root()))?;
    let action_ty = tc.check_block(
        &config.action,
        &mut action_scope,
        true,
        &Location::root().push("action"),
    )?;
    if config.method == Method::Map && !accepts(&config.output_type, &action_ty, registry) {
        return Err(PFAError::type_mismatch(
            &config.output_type,
            &action_ty,
            registry,
            tc.interner,
            Location::root().push("action"),
        ));
    }
    if config.method == Method::Fold && !accepts(&config.output_type, &action_ty, registry) {
        return Err(PFAError::type_mismatch(
            &config.output_type,
            &action_ty,
            registry,
            tc.interner,
            Location::root().push("action"),
        ));
    }

    let mut end_scope = Scope::new();
    tc.check_block(&config.end, &mut end_scope, false, &Location::root().push("end"))?;

    for (name, def) in &config.fcns {
        let fname = tc.interner.resolve(*name).to_string();
        tc.check_fcndef(def, &Location::root().push(format!("fcns.{fname}")))?;
    }

    Ok(())
}

impl<'a> TypeChecker<'a> {
    fn check_block(
        &self,
        body: &[Expr],
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        pfa_stack::ensure_sufficient_stack(|| {
            let mut last = Type::Null;
            for (i, e) in body.iter().enumerate() {
                last = self.check_expr(e, scope, in_action, &loc.push(i.to_string()))?;
            }
            Ok(last)
        })
    }

    fn check_fcndef(&self, def: &FcnDef, loc: &Location) -> PFAResult<()> {
        let mut scope = Scope::new();
        for (name, ty) in &def.params {
            scope
                .declare(*name, ty.clone(), false)
                .map_err(|_| PFAError::semantic("duplicate parameter name", loc.clone()))?;
        }
        let body_ty = self.check_block(&def.body, &mut scope, false, loc)?;
        if !accepts(&def.ret_type, &body_ty, self.registry) {
            return Err(PFAError::type_mismatch(
                &def.ret_type,
                &body_ty,
                self.registry,
                self.interner,
                loc.clone(),
            ));
        }
        Ok(())
    }

    fn check_expr(
        &self,
        expr: &Expr,
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        pfa_stack::ensure_sufficient_stack(|| self.check_expr_inner(expr, scope, in_action, loc))
    }

    fn check_expr_inner(
        &self,
        expr: &Expr,
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        match expr {
            Expr::LiteralNull => Ok(Type::Null),
            Expr::LiteralBoolean(_) => Ok(Type::Boolean),
            Expr::LiteralInt(_) => Ok(Type::Int),
            Expr::LiteralLong(_) => Ok(Type::Long),
            Expr::LiteralFloat(_) => Ok(Type::Float),
            Expr::LiteralDouble(_) => Ok(Type::Double),
            Expr::LiteralString(_) => Ok(Type::String),
            Expr::LiteralBase64(_) => Ok(Type::Bytes),
            Expr::Literal { ty, .. } => Ok(ty.clone()),

            Expr::NewObject { ty, fields } => {
                for (name, e) in fields {
                    let field_ty = self.field_type(ty, *name, loc)?;
                    let actual = self.check_expr(e, scope, in_action, loc)?;
                    if !accepts(&field_ty, &actual, self.registry) {
                        return Err(PFAError::type_mismatch(
                            &field_ty,
                            &actual,
                            self.registry,
                            self.interner,
                            loc.clone(),
                        ));
                    }
                }
                Ok(ty.clone())
            }
            Expr::NewArray { ty, items } => {
                let Type::Array(item_ty) = ty else {
                    return Err(PFAError::semantic("`new` array type is not array<T>", loc.clone()));
                };
                for e in items {
                    let actual = self.check_expr(e, scope, in_action, loc)?;
                    if !accepts(item_ty, &actual, self.registry) {
                        return Err(PFAError::type_mismatch(
                            item_ty,
                            &actual,
                            self.registry,
                            self.interner,
                            loc.clone(),
                        ));
                    }
                }
                Ok(ty.clone())
            }

            Expr::Do(body) => {
                scope.push_frame();
                let r = self.check_block(body, scope, in_action, loc);
                scope.pop_frame();
                r
            }
            Expr::Let(bindings) => {
                for (name, e) in bindings {
                    let ty = self.check_expr(e, scope, in_action, loc)?;
                    scope.declare(*name, ty, true).map_err(|err| match err {
                        DeclareError::AlreadyDeclared => PFAError::semantic(
                            format!("`{}` already declared in this scope", self.interner.resolve(*name)),
                            loc.clone(),
                        ),
                    })?;
                }
                Ok(Type::Null)
            }
            Expr::SetVar(bindings) => {
                for (name, e) in bindings {
                    let actual = self.check_expr(e, scope, in_action, loc)?;
                    if *name == self.tally_name {
                        if !in_action || self.method != Method::Fold {
                            return Err(PFAError::semantic(
                                "`tally` is only settable in `action` of a fold engine",
                                loc.clone(),
                            ));
                        }
                        if !accepts(&self.output_type, &actual, self.registry) {
                            return Err(PFAError::type_mismatch(
                                &self.output_type,
                                &actual,
                                self.registry,
                                self.interner,
                                loc.clone(),
                            ));
                        }
                        continue;
                    }
                    let binding = scope.assign_target(*name).map_err(|_| {
                        PFAError::semantic(
                            format!("`set` on unknown name `{}`", self.interner.resolve(*name)),
                            loc.clone(),
                        )
                    })?;
                    if !binding.mutable {
                        return Err(PFAError::semantic(
                            format!("`{}` is not mutable", self.interner.resolve(*name)),
                            loc.clone(),
                        ));
                    }
                    if !self.registry.equal(&binding.ty, &actual) {
                        return Err(PFAError::type_mismatch(
                            &binding.ty,
                            &actual,
                            self.registry,
                            self.interner,
                            loc.clone(),
                        ));
                    }
                }
                Ok(Type::Null)
            }
            Expr::If { cond, then, els } => {
                self.require_boolean(cond, scope, in_action, loc)?;
                scope.push_frame();
                let then_ty = self.check_block(then, scope, in_action, loc);
                scope.pop_frame();
                let then_ty = then_ty?;
                match els {
                    None => Ok(Type::Null),
                    Some(els) => {
                        scope.push_frame();
                        let els_ty = self.check_block(els, scope, in_action, loc);
                        scope.pop_frame();
                        Ok(lub(&[then_ty, els_ty?], self.registry))
                    }
                }
            }
            Expr::Cond { branches, els } => {
                let mut types = Vec::with_capacity(branches.len() + 1);
                for (cond, body) in branches {
                    self.require_boolean(cond, scope, in_action, loc)?;
                    scope.push_frame();
                    let t = self.check_block(body, scope, in_action, loc);
                    scope.pop_frame();
                    types.push(t?);
                }
                match els {
                    None => Ok(Type::Null),
                    Some(els) => {
                        scope.push_frame();
                        let t = self.check_block(els, scope, in_action, loc);
                        scope.pop_frame();
                        types.push(t?);
                        Ok(lub(&types, self.registry))
                    }
                }
            }
            Expr::While { cond, body } => {
                self.require_boolean(cond, scope, in_action, loc)?;
                scope.push_frame();
                let r = self.check_block(body, scope, in_action, loc);
                scope.pop_frame();
                r?;
                Ok(Type::Null)
            }
            Expr::DoUntil { body, cond } => {
                scope.push_frame();
                let r = self.check_block(body, scope, in_action, loc);
                let cond_r = r.and(self.require_boolean(cond, scope, in_action, loc));
                scope.pop_frame();
                cond_r?;
                Ok(Type::Null)
            }
            Expr::For { init, until, step, body } => {
                scope.push_frame();
                let r = (|| {
                    for (name, e) in init {
                        let ty = self.check_expr(e, scope, in_action, loc)?;
                        scope.declare(*name, ty, true).map_err(|_| {
                            PFAError::semantic("duplicate `for` loop variable", loc.clone())
                        })?;
                    }
                    self.require_boolean(until, scope, in_action, loc)?;
                    self.check_block(body, scope, in_action, loc)?;
                    for (name, e) in step {
                        let actual = self.check_expr(e, scope, in_action, loc)?;
                        let binding = scope.assign_target(*name).map_err(|_| {
                            PFAError::semantic("`for` step assigns unknown name", loc.clone())
                        })?;
                        if !self.registry.equal(&binding.ty, &actual) {
                            return Err(PFAError::type_mismatch(
                                &binding.ty,
                                &actual,
                                self.registry,
                                self.interner,
                                loc.clone(),
                            ));
                        }
                    }
                    Ok(())
                })();
                scope.pop_frame();
                r?;
                Ok(Type::Null)
            }
            Expr::Foreach { name, inexpr, body, .. } => {
                let in_ty = self.check_expr(inexpr, scope, in_action, loc)?;
                let Type::Array(item_ty) = in_ty else {
                    return Err(PFAError::semantic("`foreach` requires an array<T>", loc.clone()));
                };
                scope.push_frame();
                let r = (|| {
                    scope
                        .declare(*name, (*item_ty).clone(), false)
                        .map_err(|_| PFAError::semantic("duplicate `foreach` binding", loc.clone()))?;
                    self.check_block(body, scope, in_action, loc)
                })();
                scope.pop_frame();
                r?;
                Ok(Type::Null)
            }
            Expr::Forkeyval { key, val, inexpr, body } => {
                let in_ty = self.check_expr(inexpr, scope, in_action, loc)?;
                let Type::Map(val_ty) = in_ty else {
                    return Err(PFAError::semantic("`forkey`/`forval` requires a map<V>", loc.clone()));
                };
                scope.push_frame();
                let r = (|| {
                    scope
                        .declare(*key, Type::String, false)
                        .map_err(|_| PFAError::semantic("duplicate `forkey` binding", loc.clone()))?;
                    scope
                        .declare(*val, (*val_ty).clone(), false)
                        .map_err(|_| PFAError::semantic("duplicate `forval` binding", loc.clone()))?;
                    self.check_block(body, scope, in_action, loc)
                })();
                scope.pop_frame();
                r?;
                Ok(Type::Null)
            }
            Expr::CastBlock { expr, cases, partial } => {
                let scrutinee_ty = self.check_expr(expr, scope, in_action, loc)?;
                let Type::Union(branches) = &scrutinee_ty else {
                    return Err(PFAError::semantic("`cast` requires a union-typed expression", loc.clone()));
                };
                let mut covered = Vec::with_capacity(cases.len());
                let mut result_types = Vec::with_capacity(cases.len());
                for case in cases {
                    if !branches.iter().any(|b| self.registry.equal(b, &case.as_type)) {
                        return Err(PFAError::semantic(
                            "cast case type is not a branch of the scrutinee's union",
                            loc.clone(),
                        ));
                    }
                    covered.push(case.as_type.clone());
                    result_types.push(self.check_cast_case(case, scope, in_action, loc)?);
                }
                if !*partial {
                    let exhaustive = branches
                        .iter()
                        .all(|b| covered.iter().any(|c| self.registry.equal(c, b)));
                    if !exhaustive {
                        return Err(PFAError::semantic(
                            "non-exhaustive `cast` (set `partial: true` to allow)",
                            loc.clone(),
                        ));
                    }
                }
                Ok(lub(&result_types, self.registry))
            }
            Expr::IfNotNull { bindings, then, els } => {
                scope.push_frame();
                let r = (|| {
                    for (name, e) in bindings {
                        let ty = self.check_expr(e, scope, in_action, loc)?;
                        if !ty.union_contains_null() {
                            return Err(PFAError::semantic(
                                "`ifnotnull` binding must be a union containing `null`",
                                loc.clone(),
                            ));
                        }
                        scope
                            .declare(*name, ty.without_null(), false)
                            .map_err(|_| PFAError::semantic("duplicate `ifnotnull` binding", loc.clone()))?;
                    }
                    self.check_block(then, scope, in_action, loc)
                })();
                scope.pop_frame();
                let then_ty = r?;
                match els {
                    None => Ok(Type::Null),
                    Some(els) => {
                        scope.push_frame();
                        let els_ty = self.check_block(els, scope, in_action, loc);
                        scope.pop_frame();
                        Ok(lub(&[then_ty, els_ty?], self.registry))
                    }
                }
            }
            Expr::Upcast { expr, as_type } => {
                let actual = self.check_expr(expr, scope, in_action, loc)?;
                if !accepts(as_type, &actual, self.registry) {
                    return Err(PFAError::semantic(
                        "`upcast` target type does not accept the expression's type",
                        loc.clone(),
                    ));
                }
                Ok(as_type.clone())
            }

            Expr::Ref(name) => {
                if *name == self.tally_name {
                    if !in_action || self.method != Method::Fold {
                        return Err(PFAError::semantic(
                            "`tally` is only readable in `action` of a fold engine",
                            loc.clone(),
                        ));
                    }
                    return Ok(self.output_type.clone());
                }
                scope
                    .lookup(*name)
                    .map(|b| b.ty.clone())
                    .ok_or_else(|| {
                        PFAError::semantic(
                            format!("use of undeclared name `{}`", self.interner.resolve(*name)),
                            loc.clone(),
                        )
                    })
            }

            Expr::AttrGet { expr, path } => {
                let head = self.check_expr(expr, scope, in_action, loc)?;
                self.check_path(head, path, scope, in_action, loc)
            }
            Expr::AttrTo { expr, path, to } => {
                let head = self.check_expr(expr, scope, in_action, loc)?;
                let leaf = self.check_path(head, path, scope, in_action, loc)?;
                self.check_to_value(to, &leaf, scope, in_action, loc)?;
                Ok(leaf)
            }
            Expr::CellGet { name, path } => {
                let head = self.cell_type(*name, loc)?;
                self.check_path(head, path, scope, in_action, loc)
            }
            Expr::CellTo { name, path, to } => {
                let head = self.cell_type(*name, loc)?;
                let leaf = self.check_path(head, path, scope, in_action, loc)?;
                self.check_to_value(to, &leaf, scope, in_action, loc)?;
                Ok(leaf)
            }
            Expr::PoolGet { name, path } => {
                let head = self.pool_type(*name, loc)?;
                self.check_pool_path(head, path, scope, in_action, loc)
            }
            Expr::PoolTo { name, path, to, init } => {
                let head = self.pool_type(*name, loc)?;
                let leaf = self.check_pool_path(head, path, scope, in_action, loc)?;
                self.check_to_value(to, &leaf, scope, in_action, loc)?;
                if let Some(init) = init {
                    let init_ty = self.check_expr(init, scope, in_action, loc)?;
                    if !accepts(&leaf, &init_ty, self.registry) {
                        return Err(PFAError::type_mismatch(
                            &leaf,
                            &init_ty,
                            self.registry,
                            self.interner,
                            loc.clone(),
                        ));
                    }
                }
                Ok(leaf)
            }

            Expr::Call { fcn_name, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for a in args {
                    arg_types.push(self.check_expr(a, scope, in_action, loc)?);
                }
                self.resolve_call(*fcn_name, &arg_types, loc)
            }
            Expr::FcnRef(name) => {
                // PFA's type algebra has no function type; a bare `FcnRef`
                // only has a meaningful type as the `to:` of a path
                // update, handled directly in `check_to_value`. Used as an
                // ordinary expression it validates the reference exists
                // and types as `null`.
                self.lookup_user_fcn(*name, loc)?;
                Ok(Type::Null)
            }

            Expr::Doc(_) => Ok(Type::Null),
            Expr::Error { .. } => Ok(Type::Null),
            Expr::Log { args, .. } => {
                for a in args {
                    self.check_expr(a, scope, in_action, loc)?;
                }
                Ok(Type::Null)
            }
            Expr::Emit(args) => {
                for a in args {
                    let actual = self.check_expr(a, scope, in_action, loc)?;
                    if !accepts(&self.output_type, &actual, self.registry) {
                        return Err(PFAError::type_mismatch(
                            &self.output_type,
                            &actual,
                            self.registry,
                            self.interner,
                            loc.clone(),
                        ));
                    }
                }
                Ok(Type::Null)
            }
        }
    }

    fn require_boolean(
        &self,
        expr: &Expr,
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<()> {
        let ty = self.check_expr(expr, scope, in_action, loc)?;
        if !matches!(ty, Type::Boolean) {
            return Err(PFAError::semantic("condition must be `boolean`", loc.clone()));
        }
        Ok(())
    }

    fn check_cast_case(
        &self,
        case: &CastCase,
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        scope.push_frame();
        let r = (|| {
            if let Some(name) = case.named {
                scope
                    .declare(name, case.as_type.clone(), false)
                    .map_err(|_| PFAError::semantic("duplicate cast case binding", loc.clone()))?;
            }
            self.check_block(&case.body, scope, in_action, loc)
        })();
        scope.pop_frame();
        r
    }

    fn check_to_value(
        &self,
        to: &ToValue,
        target: &Type,
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<()> {
        match to {
            ToValue::Const(e) => {
                let actual = self.check_expr(e, scope, in_action, loc)?;
                if !accepts(target, &actual, self.registry) {
                    return Err(PFAError::type_mismatch(
                        target, &actual, self.registry, self.interner, loc.clone(),
                    ));
                }
                Ok(())
            }
            ToValue::FcnRef(name) => {
                let def = self.lookup_user_fcn(*name, loc)?;
                self.check_to_fcn_shape(def, target, loc)
            }
            ToValue::FcnDef(def) => {
                self.check_fcndef(def, loc)?;
                self.check_to_fcn_shape(def, target, loc)
            }
        }
    }

    fn check_to_fcn_shape(&self, def: &FcnDef, target: &Type, loc: &Location) -> PFAResult<()> {
        if def.params.len() != 1
            || !self.registry.equal(&def.params[0].1, target)
            || !self.registry.equal(&def.ret_type, target)
        {
            return Err(PFAError::semantic(
                "path update function must have signature T -> T for the path's type",
                loc.clone(),
            ));
        }
        Ok(())
    }

    fn check_path(
        &self,
        mut head: Type,
        path: &[PathElement],
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        for elem in path {
            head = self.step_path(head, &elem.0, scope, in_action, loc)?;
        }
        Ok(head)
    }

    /// Pools are keyed by string; the first path element is always the
    /// key (never a field/index), remaining elements walk the value type
    /// as an ordinary path.
    fn check_pool_path(
        &self,
        head: Type,
        path: &[PathElement],
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        let Some((key_elem, rest)) = path.split_first() else {
            return Err(PFAError::semantic("pool access requires a key path element", loc.clone()));
        };
        let key_ty = self.check_expr(&key_elem.0, scope, in_action, loc)?;
        if !matches!(key_ty, Type::String) {
            return Err(PFAError::semantic("pool key must be `string`", loc.clone()));
        }
        self.check_path(head, rest, scope, in_action, loc)
    }

    fn step_path(
        &self,
        head: Type,
        elem: &Expr,
        scope: &mut Scope,
        in_action: bool,
        loc: &Location,
    ) -> PFAResult<Type> {
        match &head {
            Type::Record(handle) => {
                let Expr::LiteralString(field_name) = elem else {
                    return Err(PFAError::semantic(
                        "path element into a record must be a string field name",
                        loc.clone(),
                    ));
                };
                let def = self
                    .registry
                    .get(*handle)
                    .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))?;
                let pfa_ir::NamedTypeDef::Record { fields, .. } = def else {
                    return Err(PFAError::semantic("internal: record handle is not a record", loc.clone()));
                };
                fields
                    .iter()
                    .find(|f| self.interner.resolve(f.name) == field_name)
                    .map(|f| f.ty.clone())
                    .ok_or_else(|| {
                        PFAError::semantic(format!("unknown field `{field_name}`"), loc.clone())
                    })
            }
            Type::Array(item_ty) => {
                let idx_ty = self.check_expr(elem, scope, in_action, loc)?;
                if !matches!(idx_ty, Type::Int | Type::Long) {
                    return Err(PFAError::semantic("array path element must be an integer", loc.clone()));
                }
                Ok((**item_ty).clone())
            }
            Type::Map(val_ty) => {
                let key_ty = self.check_expr(elem, scope, in_action, loc)?;
                if !matches!(key_ty, Type::String) {
                    return Err(PFAError::semantic("map path element must be a string", loc.clone()));
                }
                Ok((**val_ty).clone())
            }
            Type::Union(branches) => {
                let candidate = branches
                    .iter()
                    .find(|b| matches!(b, Type::Record(_) | Type::Array(_) | Type::Map(_)))
                    .cloned()
                    .ok_or_else(|| {
                        PFAError::semantic("cannot index into this union without a narrowing cast", loc.clone())
                    })?;
                self.step_path(candidate, elem, scope, in_action, loc)
            }
            other => Err(PFAError::semantic(
                format!("cannot index into type `{}`", other.display(self.registry, self.interner)),
                loc.clone(),
            )),
        }
    }

    fn field_type(&self, record_ty: &Type, field_name: Name, loc: &Location) -> PFAResult<Type> {
        let Type::Record(handle) = record_ty else {
            return Err(PFAError::semantic("`new` requires a record type", loc.clone()));
        };
        let def = self
            .registry
            .get(*handle)
            .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))?;
        let pfa_ir::NamedTypeDef::Record { fields, .. } = def else {
            return Err(PFAError::semantic("internal: record handle is not a record", loc.clone()));
        };
        fields
            .iter()
            .find(|f| f.name == field_name)
            .map(|f| f.ty.clone())
            .ok_or_else(|| {
                PFAError::semantic(
                    format!("unknown field `{}`", self.interner.resolve(field_name)),
                    loc.clone(),
                )
            })
    }

    fn cell_type(&self, name: Name, loc: &Location) -> PFAResult<Type> {
        self.cells.get(&name).cloned().ok_or_else(|| {
            PFAError::semantic(format!("unknown cell `{}`", self.interner.resolve(name)), loc.clone())
        })
    }

    fn pool_type(&self, name: Name, loc: &Location) -> PFAResult<Type> {
        self.pools.get(&name).cloned().ok_or_else(|| {
            PFAError::semantic(format!("unknown pool `{}`", self.interner.resolve(name)), loc.clone())
        })
    }

    /// Resolves a `u.`-prefixed name against user `fcns`; anything else is
    /// looked up in the built-in catalog (§4.2).
    fn resolve_call(&self, fcn_name: Name, arg_types: &[Type], loc: &Location) -> PFAResult<Type> {
        let text = self.interner.resolve(fcn_name);
        if let Some(suffix) = text.strip_prefix("u.") {
            let def = self.find_user_fcn_by_text(suffix, loc)?;
            if def.params.len() != arg_types.len() {
                return Err(PFAError::semantic(
                    format!("`{text}` expects {} argument(s)", def.params.len()),
                    loc.clone(),
                ));
            }
            for ((_, expected), actual) in def.params.iter().zip(arg_types) {
                if !accepts(expected, actual, self.registry) {
                    return Err(PFAError::type_mismatch(
                        expected, actual, self.registry, self.interner, loc.clone(),
                    ));
                }
            }
            return Ok(def.ret_type.clone());
        }
        let signatures = self.catalog.lookup(text).ok_or_else(|| {
            PFAError::semantic(format!("no applicable signature for `{text}`"), loc.clone())
        })?;
        let (ret, _idx) = resolve(text, signatures, arg_types, self.registry, self.interner)
            .map_err(|e| PFAError::semantic(e.to_string(), loc.clone()))?;
        Ok(ret)
    }

    fn lookup_user_fcn(&self, name: Name, loc: &Location) -> PFAResult<&FcnDef> {
        let text = self.interner.resolve(name);
        let suffix = text.strip_prefix("u.").unwrap_or(text);
        self.find_user_fcn_by_text(suffix, loc)
    }

    fn find_user_fcn_by_text(&self, suffix: &str, loc: &Location) -> PFAResult<&FcnDef> {
        self.fcns
            .iter()
            .find(|(n, _)| self.interner.resolve(**n) == suffix)
            .map(|(_, def)| def)
            .ok_or_else(|| PFAError::semantic(format!("unknown function `u.{suffix}`"), loc.clone()))
    }
}
