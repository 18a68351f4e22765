//! Guarded code cache entries and chains
//!
//! A chain is the ordered list of replacements compiled for one function
//! (or one function and receiver). Lookup walks it front to back; new
//! entries go to the front and a hit further back is promoted to the front.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytecode_system::CodeObject;
use core_types::RuntimeError;
use interpreter::FrameLocals;

/// Predicate certifying that a replacement is valid for a set of locals
pub trait Guard: Send + Sync {
    /// Whether the replacement may run with these locals
    fn check(&self, locals: &FrameLocals) -> Result<bool, RuntimeError>;
}

impl<F> Guard for F
where
    F: Fn(&FrameLocals) -> Result<bool, RuntimeError> + Send + Sync,
{
    fn check(&self, locals: &FrameLocals) -> Result<bool, RuntimeError> {
        self(locals)
    }
}

/// Shared handle to a guard
pub type GuardRef = Arc<dyn Guard>;

/// Wrap a closure as a guard
pub fn guard<F>(check: F) -> GuardRef
where
    F: Fn(&FrameLocals) -> Result<bool, RuntimeError> + Send + Sync + 'static,
{
    Arc::new(check)
}

/// A replacement code object and the guard protecting it
#[derive(Clone)]
pub struct GuardedCode {
    /// Predicate over the frame's locals
    pub guard: GuardRef,
    /// Code to run when the guard holds
    pub code: Arc<CodeObject>,
}

impl GuardedCode {
    /// Pair a guard with replacement code
    pub fn new(guard: GuardRef, code: Arc<CodeObject>) -> Self {
        Self { guard, code }
    }
}

impl fmt::Debug for GuardedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedCode")
            .field("code", &self.code.id())
            .finish_non_exhaustive()
    }
}

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    fn next() -> Self {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One accepted replacement in a chain
///
/// Cloning shares the guard and code, so an entry that is running stays
/// alive if its chain is invalidated meanwhile.
#[derive(Clone)]
pub struct CacheEntry {
    id: EntryId,
    guard: GuardRef,
    code: Arc<CodeObject>,
}

impl CacheEntry {
    pub(crate) fn new(compiled: GuardedCode) -> Self {
        Self {
            id: EntryId::next(),
            guard: compiled.guard,
            code: compiled.code,
        }
    }

    /// Unique entry identity
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The entry's guard
    pub fn guard(&self) -> &GuardRef {
        &self.guard
    }

    /// The replacement code
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("id", &self.id)
            .field("code", &self.code.id())
            .finish()
    }
}

/// Ordered list of cache entries, most recently useful first
#[derive(Debug, Clone, Default)]
pub(crate) struct CacheChain {
    entries: VecDeque<CacheEntry>,
}

impl CacheChain {
    pub(crate) fn with_entry(entry: CacheEntry) -> Self {
        let mut chain = Self::default();
        chain.push_front(entry);
        chain
    }

    pub(crate) fn push_front(&mut self, entry: CacheEntry) {
        debug_assert!(self.entries.iter().all(|e| e.id != entry.id));
        self.entries.push_front(entry);
    }

    /// Move an entry to the front, keeping the others in order
    pub(crate) fn promote(&mut self, id: EntryId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        if pos > 0 {
            if let Some(entry) = self.entries.remove(pos) {
                self.entries.push_front(entry);
            }
        }
        true
    }

    pub(crate) fn to_vec(&self) -> Vec<CacheEntry> {
        self.entries.iter().cloned().collect()
    }
}
