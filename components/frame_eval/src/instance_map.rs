//! Map keyed weakly by object instances
//!
//! Keys are object addresses paired with a weak handle. A held weak handle
//! keeps the allocation reserved, so a live object at a stored address is
//! always the object that was inserted. Dead keys never match and are
//! pruned on insertion or on demand.

use std::sync::Arc;

use core_types::{ObjectRef, WeakObjectRef};
use rustc_hash::FxHashMap;

fn address(obj: &ObjectRef) -> usize {
    Arc::as_ptr(obj) as usize
}

#[derive(Debug)]
pub(crate) struct WeakKeyMap<V> {
    entries: FxHashMap<usize, (WeakObjectRef, V)>,
}

impl<V> Default for WeakKeyMap<V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<V> WeakKeyMap<V> {
    pub(crate) fn get(&self, obj: &ObjectRef) -> Option<&V> {
        self.entries
            .get(&address(obj))
            .filter(|(key, _)| key.strong_count() > 0)
            .map(|(_, value)| value)
    }

    pub(crate) fn get_mut(&mut self, obj: &ObjectRef) -> Option<&mut V> {
        self.entries
            .get_mut(&address(obj))
            .filter(|(key, _)| key.strong_count() > 0)
            .map(|(_, value)| value)
    }

    pub(crate) fn get_or_insert_with(&mut self, obj: &ObjectRef, make: impl FnOnce() -> V) -> &mut V {
        let addr = address(obj);
        if !self.entries.contains_key(&addr) {
            self.prune();
        }
        let (_, value) = self
            .entries
            .entry(addr)
            .or_insert_with(|| (Arc::downgrade(obj), make()));
        value
    }

    pub(crate) fn remove(&mut self, obj: &ObjectRef) -> Option<V> {
        self.entries.remove(&address(obj)).map(|(_, value)| value)
    }

    /// Drop entries whose key died; returns how many were dropped
    pub(crate) fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (key, _)| key.strong_count() > 0);
        before - self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
