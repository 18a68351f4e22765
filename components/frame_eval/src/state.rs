//! Compiler-owned dynamic state
//!
//! Each function (and each stateful receiver of a method) gets one bag of
//! named values that survives recompilation. The layer never reads it; it
//! only hands it to the compiler callback.

use std::fmt;
use std::sync::Arc;

use core_types::Value;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Shared key/value bag; clones refer to the same bag
#[derive(Clone, Default)]
pub struct DynamicState {
    values: Arc<Mutex<FxHashMap<String, Value>>>,
}

impl DynamicState {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    /// Store a value, returning the previous one
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.lock().insert(key.into(), value)
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.lock().remove(key)
    }

    /// Whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether the bag is empty
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Whether two handles refer to the same bag
    pub fn ptr_eq(&self, other: &DynamicState) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

impl fmt::Debug for DynamicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.values.lock().iter()).finish()
    }
}
