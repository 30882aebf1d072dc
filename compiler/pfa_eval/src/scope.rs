//! Lexically scoped symbol table (§4.3).
//!
//! A stack of frames, innermost last. `let` inserts into the innermost
//! frame only and rejects redeclaration there; `set` walks outward to the
//! nearest frame holding the name and requires it to be mutable. Lookup
//! walks outward too, so inner frames see outer bindings without copying
//! them.

use rustc_hash::FxHashMap;

use pfa_ir::{Name, Type};

#[derive(Clone, Debug)]
pub struct Binding {
    pub ty: Type,
    pub mutable: bool,
}

#[derive(Debug)]
pub enum AssignError {
    /// No binding with this name is visible from the current scope.
    Undefined,
}

#[derive(Debug)]
pub enum DeclareError {
    /// A binding with this name already exists in the innermost frame.
    AlreadyDeclared,
}

pub struct Scope {
    frames: Vec<FxHashMap<Name, Binding>>,
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            frames: vec![FxHashMap::default()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "popped the root frame");
    }

    /// `let name = ...`: binding lands in the innermost frame only.
    pub fn declare(&mut self, name: Name, ty: Type, mutable: bool) -> Result<(), DeclareError> {
        let frame = self.frames.last_mut().expect("at least one frame");
        if frame.contains_key(&name) {
            return Err(DeclareError::AlreadyDeclared);
        }
        frame.insert(name, Binding { ty, mutable });
        Ok(())
    }

    pub fn lookup(&self, name: Name) -> Option<&Binding> {
        self.frames.iter().rev().find_map(|f| f.get(&name))
    }

    /// `set name = ...`: must find an existing mutable binding in some
    /// enclosing frame; the caller separately checks the assigned type
    /// against `binding.ty` (no widening, per §4.3).
    pub fn assign_target(&self, name: Name) -> Result<&Binding, AssignError> {
        self.lookup(name).ok_or(AssignError::Undefined)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfa_ir::Interner;

    #[test]
    fn redeclaration_in_same_frame_is_rejected() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut scope = Scope::new();
        scope.declare(x, Type::Int, true).expect("first declare");
        let err = scope.declare(x, Type::String, true);
        assert!(matches!(err, Err(DeclareError::AlreadyDeclared)));
    }

    #[test]
    fn inner_frame_sees_outer_binding_but_does_not_leak_back() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut scope = Scope::new();
        scope.declare(x, Type::Int, true).expect("declare outer");
        scope.push_frame();
        assert!(scope.lookup(x).is_some());
        let y = interner.intern("y");
        scope.declare(y, Type::Boolean, true).expect("declare inner");
        scope.pop_frame();
        assert!(scope.lookup(y).is_none());
        assert!(scope.lookup(x).is_some());
    }
}
