//! Per-function extra state: cache slot and dynamic state
//!
//! Records live outside the code objects, keyed by [`CodeId`]. Each record
//! holds its code weakly; records whose code was dropped are pruned when a
//! new record is created.

use std::sync::{Arc, Weak};

use bytecode_system::{CodeId, CodeObject};
use core_types::ObjectRef;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::cache::{CacheChain, CacheEntry, EntryId};
use crate::instance_map::WeakKeyMap;
use crate::state::DynamicState;

/// Public view of a function's cache slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Nothing cached yet
    Empty,
    /// Never intercepted until invalidated
    Skip,
    /// One chain shared by every call
    Single,
    /// One chain per stateful receiver plus one for plain calls
    PerInstance,
}

#[derive(Debug, Default)]
enum CacheSlot {
    #[default]
    Empty,
    Skip,
    Single(CacheChain),
    PerInstance {
        unkeyed: CacheChain,
        by_instance: WeakKeyMap<CacheChain>,
    },
}

impl CacheSlot {
    fn kind(&self) -> SlotKind {
        match self {
            CacheSlot::Empty => SlotKind::Empty,
            CacheSlot::Skip => SlotKind::Skip,
            CacheSlot::Single(_) => SlotKind::Single,
            CacheSlot::PerInstance { .. } => SlotKind::PerInstance,
        }
    }

    /// Chain applying to a call with this receiver, if any
    fn chain(&self, instance: Option<&ObjectRef>) -> Option<&CacheChain> {
        match (self, instance) {
            (CacheSlot::Single(chain), None) => Some(chain),
            (CacheSlot::PerInstance { unkeyed, .. }, None) => Some(unkeyed),
            (CacheSlot::PerInstance { by_instance, .. }, Some(obj)) => by_instance.get(obj),
            _ => None,
        }
    }

    fn chain_mut(&mut self, instance: Option<&ObjectRef>) -> Option<&mut CacheChain> {
        match (self, instance) {
            (CacheSlot::Single(chain), None) => Some(chain),
            (CacheSlot::PerInstance { unkeyed, .. }, None) => Some(unkeyed),
            (CacheSlot::PerInstance { by_instance, .. }, Some(obj)) => by_instance.get_mut(obj),
            _ => None,
        }
    }

    /// Add an entry at the head of the applicable chain
    ///
    /// The first receiver-keyed write turns a single chain into the unkeyed
    /// partition of a per-instance slot.
    fn prepend(&mut self, instance: Option<&ObjectRef>, entry: CacheEntry) -> bool {
        if matches!(self, CacheSlot::Skip) {
            return false;
        }
        *self = match (std::mem::take(self), instance) {
            (CacheSlot::Skip, _) => CacheSlot::Skip,
            (CacheSlot::Empty, None) => CacheSlot::Single(CacheChain::with_entry(entry)),
            (CacheSlot::Single(mut chain), None) => {
                chain.push_front(entry);
                CacheSlot::Single(chain)
            }
            (CacheSlot::Empty, Some(obj)) => per_instance(CacheChain::default(), obj, entry),
            (CacheSlot::Single(chain), Some(obj)) => per_instance(chain, obj, entry),
            (
                CacheSlot::PerInstance {
                    mut unkeyed,
                    mut by_instance,
                },
                instance,
            ) => {
                match instance {
                    Some(obj) => by_instance
                        .get_or_insert_with(obj, CacheChain::default)
                        .push_front(entry),
                    None => unkeyed.push_front(entry),
                }
                CacheSlot::PerInstance {
                    unkeyed,
                    by_instance,
                }
            }
        };
        true
    }
}

fn per_instance(unkeyed: CacheChain, obj: &ObjectRef, entry: CacheEntry) -> CacheSlot {
    let mut by_instance = WeakKeyMap::default();
    by_instance.get_or_insert_with(obj, || CacheChain::with_entry(entry));
    CacheSlot::PerInstance {
        unkeyed,
        by_instance,
    }
}

#[derive(Debug, Default)]
struct StateSlot {
    shared: Option<DynamicState>,
    by_instance: WeakKeyMap<DynamicState>,
}

#[derive(Debug)]
struct FunctionExtra {
    code: Weak<CodeObject>,
    cache: CacheSlot,
    state: StateSlot,
}

/// Extra-state records for every function seen by the hook
#[derive(Debug, Default)]
pub(crate) struct ExtraStore {
    records: FxHashMap<CodeId, FunctionExtra>,
}

impl ExtraStore {
    fn record_mut(&mut self, code: &Arc<CodeObject>) -> &mut FunctionExtra {
        let id = code.id();
        if !self.records.contains_key(&id) {
            self.prune_dead_code();
            trace!(code = %id, name = code.name(), "creating extra-state record");
        }
        self.records.entry(id).or_insert_with(|| FunctionExtra {
            code: Arc::downgrade(code),
            cache: CacheSlot::default(),
            state: StateSlot::default(),
        })
    }

    fn prune_dead_code(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.code.strong_count() > 0);
        before - self.records.len()
    }

    pub(crate) fn slot_kind(&self, code: CodeId) -> SlotKind {
        self.records
            .get(&code)
            .map_or(SlotKind::Empty, |record| record.cache.kind())
    }

    /// Entries of the chain applying to a call with this receiver
    pub(crate) fn entries(&self, code: CodeId, instance: Option<&ObjectRef>) -> Vec<CacheEntry> {
        self.records
            .get(&code)
            .and_then(|record| record.cache.chain(instance))
            .map(CacheChain::to_vec)
            .unwrap_or_default()
    }

    /// Move a hit entry to the head of its chain
    pub(crate) fn promote(&mut self, code: CodeId, instance: Option<&ObjectRef>, entry: EntryId) {
        if let Some(chain) = self
            .records
            .get_mut(&code)
            .and_then(|record| record.cache.chain_mut(instance))
        {
            chain.promote(entry);
        }
    }

    /// Prepend a freshly accepted entry; refused while the slot is skipped
    pub(crate) fn prepend(
        &mut self,
        code: &Arc<CodeObject>,
        instance: Option<&ObjectRef>,
        entry: CacheEntry,
    ) -> bool {
        self.record_mut(code).cache.prepend(instance, entry)
    }

    pub(crate) fn mark_skip(&mut self, code: &Arc<CodeObject>) {
        self.record_mut(code).cache = CacheSlot::Skip;
    }

    /// Drop the whole cache and dynamic state of a function
    pub(crate) fn invalidate(&mut self, code: CodeId) -> bool {
        self.records.remove(&code).is_some()
    }

    /// Drop one receiver's chain and dynamic state
    pub(crate) fn invalidate_instance(&mut self, code: CodeId, instance: &ObjectRef) -> bool {
        let Some(record) = self.records.get_mut(&code) else {
            return false;
        };
        let had_chain = match &mut record.cache {
            CacheSlot::PerInstance { by_instance, .. } => by_instance.remove(instance).is_some(),
            _ => false,
        };
        let had_state = record.state.by_instance.remove(instance).is_some();
        had_chain || had_state
    }

    /// Dynamic state for a call, created on first use
    pub(crate) fn state_or_create(
        &mut self,
        code: &Arc<CodeObject>,
        instance: Option<&ObjectRef>,
    ) -> DynamicState {
        let state = &mut self.record_mut(code).state;
        match instance {
            Some(obj) => state
                .by_instance
                .get_or_insert_with(obj, DynamicState::new)
                .clone(),
            None => state.shared.get_or_insert_with(DynamicState::new).clone(),
        }
    }

    pub(crate) fn state(&self, code: CodeId, instance: Option<&ObjectRef>) -> Option<DynamicState> {
        let state = &self.records.get(&code)?.state;
        match instance {
            Some(obj) => state.by_instance.get(obj).cloned(),
            None => state.shared.clone(),
        }
    }

    /// Reclaim chains and state of dropped receivers and dropped code
    pub(crate) fn prune(&mut self) -> usize {
        let mut pruned = self.prune_dead_code();
        for record in self.records.values_mut() {
            if let CacheSlot::PerInstance { by_instance, .. } = &mut record.cache {
                pruned += by_instance.prune();
            }
            pruned += record.state.by_instance.prune();
        }
        pruned
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }
}
