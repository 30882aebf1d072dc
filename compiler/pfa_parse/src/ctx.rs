//! Parse-time context: the interner/registry being built, plus a small
//! stack tracking named types currently being defined (to support
//! self-referential records, §9 "Cyclic type graphs").

use rustc_hash::FxHashMap;

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{Interner, Name, TypeHandle, TypeRegistry};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NamedKind {
    Record,
    Enum,
    Fixed,
}

pub struct ParseCtx<'a> {
    pub interner: &'a mut Interner,
    pub registry: &'a mut TypeRegistry,
    /// Named types whose structure has fully landed in `registry`.
    completed: FxHashMap<Name, (TypeHandle, NamedKind)>,
    /// Named types currently mid-definition (innermost last), so a field
    /// referencing the enclosing record's own name resolves instead of
    /// erroring as unknown.
    defining: Vec<(Name, TypeHandle, NamedKind)>,
}

impl<'a> ParseCtx<'a> {
    pub fn new(interner: &'a mut Interner, registry: &'a mut TypeRegistry) -> Self {
        ParseCtx {
            interner,
            registry,
            completed: FxHashMap::default(),
            defining: Vec::new(),
        }
    }

    pub fn begin_named(&mut self, name: Name, kind: NamedKind, handle: TypeHandle) {
        self.defining.push((name, handle, kind));
    }

    pub fn end_named(&mut self, name: Name, handle: TypeHandle, kind: NamedKind) {
        self.defining.retain(|(n, _, _)| *n != name);
        self.completed.insert(name, (handle, kind));
    }

    pub fn resolve_named(&self, name: Name) -> Option<(TypeHandle, NamedKind)> {
        self.defining
            .iter()
            .rev()
            .find(|(n, _, _)| *n == name)
            .map(|(_, h, k)| (*h, *k))
            .or_else(|| self.completed.get(&name).copied())
    }

    pub fn require_object<'v>(
        &self,
        value: &'v serde_json::Value,
        loc: &Location,
    ) -> PFAResult<&'v serde_json::Map<String, serde_json::Value>> {
        value
            .as_object()
            .ok_or_else(|| PFAError::syntax(format!("expected a JSON object at {loc}"), loc.clone()))
    }

    pub fn require_array<'v>(
        &self,
        value: &'v serde_json::Value,
        loc: &Location,
    ) -> PFAResult<&'v Vec<serde_json::Value>> {
        value
            .as_array()
            .ok_or_else(|| PFAError::syntax(format!("expected a JSON array at {loc}"), loc.clone()))
    }

    pub fn require_str<'v>(
        &self,
        value: &'v serde_json::Value,
        loc: &Location,
    ) -> PFAResult<&'v str> {
        value
            .as_str()
            .ok_or_else(|| PFAError::syntax(format!("expected a JSON string at {loc}"), loc.clone()))
    }
}
