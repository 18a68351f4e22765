//! Per-thread dispatch mode
//!
//! Each thread has a configured [`DispatchMode`] and a suspension depth.
//! While suspended the effective mode is `Disabled`, so guards and the
//! compiler callback can call back into the runtime without being
//! intercepted themselves.
//!
//! Entries remember their thread through a thread-local liveness token, so
//! entries left behind by exited threads can be found and pruned.

use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::callback::{CallbackDebug, CallbackRef};

/// What the frame hook does on the current thread
#[derive(Clone, Default)]
pub enum DispatchMode {
    /// Every frame runs through the default evaluator
    #[default]
    Disabled,
    /// Cached replacements are used, nothing new is compiled
    RunOnly,
    /// Cached replacements are used and misses go to the callback
    Active(CallbackRef),
}

impl DispatchMode {
    /// Whether interception is off
    pub fn is_disabled(&self) -> bool {
        matches!(self, DispatchMode::Disabled)
    }

    /// The compiler callback, in active mode
    pub fn callback(&self) -> Option<&CallbackRef> {
        match self {
            DispatchMode::Active(callback) => Some(callback),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DispatchMode::Disabled => "disabled",
            DispatchMode::RunOnly => "run-only",
            DispatchMode::Active(_) => "active",
        }
    }
}

impl PartialEq for DispatchMode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DispatchMode::Disabled, DispatchMode::Disabled) => true,
            (DispatchMode::RunOnly, DispatchMode::RunOnly) => true,
            (DispatchMode::Active(a), DispatchMode::Active(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Active(callback) => {
                f.debug_tuple("Active").field(&CallbackDebug(callback)).finish()
            }
            other => f.write_str(match other {
                DispatchMode::RunOnly => "RunOnly",
                _ => "Disabled",
            }),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

thread_local! {
    static ALIVE: Arc<()> = Arc::new(());
}

struct ThreadMode {
    setting: DispatchMode,
    suspended: u32,
    alive: Weak<()>,
}

impl ThreadMode {
    fn current() -> Self {
        Self {
            setting: DispatchMode::Disabled,
            suspended: 0,
            alive: ALIVE.with(Arc::downgrade),
        }
    }

    fn has_exited(&self) -> bool {
        self.alive.strong_count() == 0
    }

    fn is_idle(&self) -> bool {
        self.setting.is_disabled() && self.suspended == 0
    }
}

/// Modes of every thread that has one set
#[derive(Default)]
pub(crate) struct ModeTable {
    threads: Mutex<FxHashMap<ThreadId, ThreadMode>>,
}

impl ModeTable {
    /// Configured mode of the calling thread
    pub(crate) fn setting(&self) -> DispatchMode {
        self.threads
            .lock()
            .get(&thread::current().id())
            .map(|t| t.setting.clone())
            .unwrap_or_default()
    }

    /// Mode the frame hook obeys on the calling thread
    pub(crate) fn effective(&self) -> DispatchMode {
        match self.threads.lock().get(&thread::current().id()) {
            Some(t) if t.suspended == 0 => t.setting.clone(),
            _ => DispatchMode::Disabled,
        }
    }

    /// Set the calling thread's mode, returning the previous setting
    pub(crate) fn replace(&self, mode: DispatchMode) -> DispatchMode {
        let id = thread::current().id();
        let mut threads = self.threads.lock();
        let entry = threads.entry(id).or_insert_with(ThreadMode::current);
        let prior = std::mem::replace(&mut entry.setting, mode);
        if entry.is_idle() {
            threads.remove(&id);
        }
        prior
    }

    /// Force the calling thread's effective mode to `Disabled` until the
    /// guard drops
    pub(crate) fn suspend(&self) -> SuspendGuard<'_> {
        let id = thread::current().id();
        self.threads
            .lock()
            .entry(id)
            .or_insert_with(ThreadMode::current)
            .suspended += 1;
        SuspendGuard { table: self, id }
    }

    /// Drop entries of threads that have exited
    ///
    /// Returns how many of them had a mode other than `Disabled`.
    pub(crate) fn prune_exited(&self) -> usize {
        let mut released = 0;
        self.threads.lock().retain(|_, entry| {
            if !entry.has_exited() {
                return true;
            }
            if !entry.setting.is_disabled() {
                released += 1;
            }
            false
        });
        released
    }

    #[cfg(test)]
    fn tracked_threads(&self) -> usize {
        self.threads.lock().len()
    }
}

impl fmt::Debug for ModeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeTable")
            .field("threads", &self.threads.lock().len())
            .finish()
    }
}

/// Lifts one level of suspension on drop
pub(crate) struct SuspendGuard<'a> {
    table: &'a ModeTable,
    id: ThreadId,
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        let mut threads = self.table.threads.lock();
        if let Some(entry) = threads.get_mut(&self.id) {
            entry.suspended = entry.suspended.saturating_sub(1);
            if entry.is_idle() {
                threads.remove(&self.id);
            }
        }
    }
}
