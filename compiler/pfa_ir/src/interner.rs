//! Interned string identifier.
//!
//! Simpler than a sharded/incremental interner: the whole AST is built once
//! from a single PFA document and never mutated afterward, so there is no
//! need for concurrent interning or cache invalidation. A plain
//! `Vec<Box<str>>` plus a lookup map is enough.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Interned identifier: a name, field label, function name, or cell/pool
/// name. Two `Name`s are equal iff the underlying strings are equal.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// Owns the interned strings for one PFA document. Shared (via `Arc`)
/// across every actor instantiated from the same `EngineConfig`, since the
/// AST is immutable after type check.
#[derive(Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, Name>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&name) = self.lookup.get(s) {
            return name;
        }
        let idx = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        let name = Name(idx);
        self.lookup.insert(boxed, name);
        name
    }

    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.0 as usize]
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.strings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("x");
        let c = interner.intern("y");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "x");
        assert_eq!(interner.resolve(c), "y");
    }
}
