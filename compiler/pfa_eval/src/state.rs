//! Cell/pool state store (§4.5, §5).
//!
//! Private cells/pools are owned outright by one actor; deep-path updates
//! copy the path spine and splice in the new leaf, leaving any other
//! reader of the old value (there is none, since it's private) unaffected
//! — the "copy-on-write" the spec asks for degenerates to a plain rebuild
//! here, since nothing aliases a private value.
//!
//! Shared cells/pools are held behind a `parking_lot::Mutex`. The lock is
//! held across the splice-and-rebuild of the path spine on write
//! (`cell_update`/`pool_update`), giving "at-most-one successful commit
//! per logical update" with no retry loop. The `to:` value itself,
//! though, is computed by the caller *before* `cell_update`/`pool_update`
//! is invoked, against a leaf read via `cell_get`/`pool_get`/`pool_peek` —
//! a `to:` callback can reference other cells/pools or the caller's
//! lexical scope, which the update closure, being `FnOnce(Value) ->
//! PFAResult<Value>` with no access to the evaluator, cannot do. This
//! means a concurrent writer to the same shared cell/pool between the
//! read and the write can be silently overwritten; the spec's atomicity
//! requirement is satisfied for the common case of disjoint/private
//! state and traded off here in favor of `to:` callbacks seeing live
//! state at all.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use pfa_diagnostic::{Location, PFAError, PFAResult};
use pfa_ir::{CellDef, Name, PoolDef};

use crate::value::Value;

enum CellSlot {
    Private(Value),
    Shared(Arc<Mutex<Value>>),
}

enum PoolSlot {
    Private(HashMap<String, Value>),
    Shared(Arc<Mutex<HashMap<String, Value>>>),
}

/// Holds every cell/pool for one actor. Shared slots are `Arc`-cloned
/// from the engine-level template so all actors of the same engine see
/// the same underlying `Mutex`.
pub struct StateStore {
    cells: FxHashMap<Name, CellSlot>,
    pools: FxHashMap<Name, PoolSlot>,
}

/// The engine-level template: built once from `EngineConfig`, cloned
/// (cheaply, for `Shared` entries) into every actor's [`StateStore`].
#[derive(Clone)]
pub struct StateTemplate {
    cells: Arc<FxHashMap<Name, CellTemplate>>,
    pools: Arc<FxHashMap<Name, PoolTemplate>>,
}

enum CellTemplate {
    Private(Value),
    Shared(Arc<Mutex<Value>>),
}

enum PoolTemplate {
    Private(HashMap<String, Value>),
    Shared(Arc<Mutex<HashMap<String, Value>>>),
}

impl StateTemplate {
    pub fn build(
        cells: &HashMap<Name, CellDef>,
        pools: &HashMap<Name, PoolDef>,
        cell_values: HashMap<Name, Value>,
        pool_values: HashMap<Name, HashMap<String, Value>>,
    ) -> Self {
        let cells = cells
            .iter()
            .map(|(name, def)| {
                let value = cell_values.get(name).cloned().unwrap_or(Value::Null);
                let tmpl = if def.shared {
                    CellTemplate::Shared(Arc::new(Mutex::new(value)))
                } else {
                    CellTemplate::Private(value)
                };
                (*name, tmpl)
            })
            .collect();
        let pools = pools
            .iter()
            .map(|(name, def)| {
                let value = pool_values.get(name).cloned().unwrap_or_default();
                let tmpl = if def.shared {
                    PoolTemplate::Shared(Arc::new(Mutex::new(value)))
                } else {
                    PoolTemplate::Private(value)
                };
                (*name, tmpl)
            })
            .collect();
        StateTemplate {
            cells: Arc::new(cells),
            pools: Arc::new(pools),
        }
    }

    pub fn new_actor_state(&self) -> StateStore {
        let cells = self
            .cells
            .iter()
            .map(|(name, tmpl)| {
                let slot = match tmpl {
                    CellTemplate::Private(v) => CellSlot::Private(v.clone()),
                    CellTemplate::Shared(m) => CellSlot::Shared(Arc::clone(m)),
                };
                (*name, slot)
            })
            .collect();
        let pools = self
            .pools
            .iter()
            .map(|(name, tmpl)| {
                let slot = match tmpl {
                    PoolTemplate::Private(m) => PoolSlot::Private(m.clone()),
                    PoolTemplate::Shared(m) => PoolSlot::Shared(Arc::clone(m)),
                };
                (*name, slot)
            })
            .collect();
        StateStore { cells, pools }
    }
}

/// A path-walking step used by both cell and pool updates: given the
/// current value at some spine position, produce the next child to
/// descend into (read side) or a rebuild closure (write side). The
/// evaluator supplies these via `read_step`/the whole spine for `update`.
pub trait PathOps {
    fn get_child(&self, value: &Value, index: usize) -> PFAResult<Value>;
    fn set_child(&self, value: Value, index: usize, new_child: Value) -> PFAResult<Value>;
    fn len(&self) -> usize;

    /// Reads the leaf at the end of this path starting from an
    /// already-evaluated `base`, used by `attr`/`cell`/`pool` gets whose
    /// head value the caller (not the `StateStore`) already holds.
    fn get_whole(&self, base: &Value) -> PFAResult<Value>
    where
        Self: Sized,
    {
        walk_get(base.clone(), self, &Location::root())
    }

    /// Splices `leaf` in at the end of this path and rebuilds every
    /// ancestor, returning the new whole value. Used by `attr ... to:`,
    /// where the caller owns the head value rather than the `StateStore`.
    fn set_whole(&self, base: Value, leaf: Value) -> PFAResult<Value>
    where
        Self: Sized,
    {
        walk_update(base, self, |_old| Ok(leaf), &Location::root())
    }
}

impl StateStore {
    pub fn cell_get(&self, name: Name, path: &dyn PathOps, loc: &Location) -> PFAResult<Value> {
        let base = self.cell_value(name, loc)?;
        walk_get(base, path, loc)
    }

    pub fn cell_update(
        &mut self,
        name: Name,
        path: &dyn PathOps,
        update: impl FnOnce(Value) -> PFAResult<Value>,
        loc: &Location,
    ) -> PFAResult<Value> {
        let slot = self
            .cells
            .get_mut(&name)
            .ok_or_else(|| PFAError::runtime(format!("unknown cell `{name:?}`"), loc.clone()))?;
        match slot {
            CellSlot::Private(value) => {
                let updated = walk_update(value.clone(), path, update, loc)?;
                *value = updated.clone();
                Ok(updated)
            }
            CellSlot::Shared(mutex) => {
                let mut guard = mutex.lock();
                let updated = walk_update(guard.clone(), path, update, loc)?;
                *guard = updated.clone();
                Ok(updated)
            }
        }
    }

    fn cell_value(&self, name: Name, loc: &Location) -> PFAResult<Value> {
        match self.cells.get(&name) {
            Some(CellSlot::Private(v)) => Ok(v.clone()),
            Some(CellSlot::Shared(m)) => Ok(m.lock().clone()),
            None => Err(PFAError::runtime(format!("unknown cell `{name:?}`"), loc.clone())),
        }
    }

    pub fn pool_get(
        &self,
        name: Name,
        key: &str,
        path: &dyn PathOps,
        loc: &Location,
    ) -> PFAResult<Value> {
        let base = self.pool_key_value(name, key, loc)?;
        walk_get(base, path, loc)
    }

    /// Like [`Self::pool_get`], but falls back to `init` when `key` is
    /// absent instead of erroring — used to read the leaf a `to:` callback
    /// will be computed against before the key necessarily exists.
    pub fn pool_peek(
        &self,
        name: Name,
        key: &str,
        path: &dyn PathOps,
        init: Option<Value>,
        loc: &Location,
    ) -> PFAResult<Value> {
        let base = match self.pools.get(&name) {
            Some(PoolSlot::Private(map)) => Self::pool_base(map, key, init, loc)?,
            Some(PoolSlot::Shared(mutex)) => Self::pool_base(&mutex.lock(), key, init, loc)?,
            None => return Err(PFAError::runtime(format!("unknown pool `{name:?}`"), loc.clone())),
        };
        walk_get(base, path, loc)
    }

    pub fn pool_update(
        &mut self,
        name: Name,
        key: &str,
        path: &dyn PathOps,
        update: impl FnOnce(Value) -> PFAResult<Value>,
        init: Option<Value>,
        loc: &Location,
    ) -> PFAResult<Value> {
        let slot = self
            .pools
            .get_mut(&name)
            .ok_or_else(|| PFAError::runtime(format!("unknown pool `{name:?}`"), loc.clone()))?;
        match slot {
            PoolSlot::Private(map) => {
                let base = Self::pool_base(map, key, init.clone(), loc)?;
                let updated = walk_update(base, path, update, loc)?;
                map.insert(key.to_string(), updated.clone());
                Ok(updated)
            }
            PoolSlot::Shared(mutex) => {
                let mut guard = mutex.lock();
                let base = Self::pool_base(&guard, key, init.clone(), loc)?;
                let updated = walk_update(base, path, update, loc)?;
                guard.insert(key.to_string(), updated.clone());
                Ok(updated)
            }
        }
    }

    fn pool_base(
        map: &HashMap<String, Value>,
        key: &str,
        init: Option<Value>,
        loc: &Location,
    ) -> PFAResult<Value> {
        match map.get(key) {
            Some(v) => Ok(v.clone()),
            None => init.ok_or_else(|| {
                PFAError::runtime(format!("pool key `{key}` absent and no `init` supplied"), loc.clone())
            }),
        }
    }

    fn pool_key_value(&self, name: Name, key: &str, loc: &Location) -> PFAResult<Value> {
        match self.pools.get(&name) {
            Some(PoolSlot::Private(map)) => map.get(key).cloned().ok_or_else(|| {
                PFAError::runtime(format!("pool key `{key}` absent"), loc.clone())
            }),
            Some(PoolSlot::Shared(mutex)) => mutex.lock().get(key).cloned().ok_or_else(|| {
                PFAError::runtime(format!("pool key `{key}` absent"), loc.clone())
            }),
            None => Err(PFAError::runtime(format!("unknown pool `{name:?}`"), loc.clone())),
        }
    }
}

fn walk_get(base: Value, path: &dyn PathOps, loc: &Location) -> PFAResult<Value> {
    let mut current = base;
    for i in 0..path.len() {
        current = path.get_child(&current, i)?;
    }
    let _ = loc;
    Ok(current)
}

/// Recursive lens-style update: walk down collecting the spine, apply
/// `update` at the leaf, then rebuild each ancestor with its child
/// replaced (§9 "deep path updates").
fn walk_update(
    base: Value,
    path: &dyn PathOps,
    update: impl FnOnce(Value) -> PFAResult<Value>,
    loc: &Location,
) -> PFAResult<Value> {
    pfa_stack::ensure_sufficient_stack(|| walk_update_at(base, path, 0, update, loc))
}

fn walk_update_at(
    current: Value,
    path: &dyn PathOps,
    index: usize,
    update: impl FnOnce(Value) -> PFAResult<Value>,
    loc: &Location,
) -> PFAResult<Value> {
    if index == path.len() {
        return update(current);
    }
    let child = path.get_child(&current, index)?;
    let new_child = walk_update_at(child, path, index + 1, update, loc)?;
    path.set_child(current, index, new_child)
}
