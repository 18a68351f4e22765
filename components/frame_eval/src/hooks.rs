//! Observer hooks around cache lookup

use std::fmt;
use std::sync::Arc;

use bytecode_system::CodeObject;
use core_types::{RuntimeError, Value};
use interpreter::FrameLocals;
use tracing::warn;

use crate::cache::GuardRef;

/// A guard that rejected or failed during lookup
pub struct GuardFailure<'a> {
    /// The guard that was evaluated
    pub guard: &'a GuardRef,
    /// Replacement the guard protects
    pub code: &'a Arc<CodeObject>,
    /// Locals the guard was evaluated against
    pub locals: &'a FrameLocals,
    /// Position of the entry in its chain
    pub index: usize,
    /// Whether this was the chain's last entry
    pub is_last: bool,
}

impl fmt::Debug for GuardFailure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardFailure")
            .field("code", &self.code.id())
            .field("index", &self.index)
            .field("is_last", &self.is_last)
            .finish()
    }
}

type GuardHookFn = dyn Fn(&GuardFailure<'_>) -> Result<(), RuntimeError> + Send + Sync;

/// Hook called for guard rejections or guard errors
pub type GuardHook = Arc<GuardHookFn>;

/// Wrap a closure as a guard hook
pub fn guard_hook<F>(hook: F) -> GuardHook
where
    F: Fn(&GuardFailure<'_>) -> Result<(), RuntimeError> + Send + Sync + 'static,
{
    Arc::new(hook)
}

type SpanStartFn = dyn Fn(&str) -> Result<Value, RuntimeError> + Send + Sync;
type SpanEndFn = dyn Fn(Value) -> Result<(), RuntimeError> + Send + Sync;

/// Start/end callbacks bracketing each cache lookup
///
/// The value returned by `start` is handed back to `end`.
#[derive(Clone)]
pub struct SpanHooks {
    start: Arc<SpanStartFn>,
    end: Arc<SpanEndFn>,
}

impl SpanHooks {
    /// Pair a start and an end callback
    pub fn new<S, E>(start: S, end: E) -> Self
    where
        S: Fn(&str) -> Result<Value, RuntimeError> + Send + Sync + 'static,
        E: Fn(Value) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        Self {
            start: Arc::new(start),
            end: Arc::new(end),
        }
    }

    /// Run `body` inside a span
    ///
    /// Hook failures are logged and never affect `body` or its result.
    pub(crate) fn bracket<T>(&self, name: &str, body: impl FnOnce() -> T) -> T {
        let record = match (self.start)(name) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(span = name, %error, "lookup span start hook failed");
                None
            }
        };
        let out = body();
        if let Some(record) = record {
            if let Err(error) = (self.end)(record) {
                warn!(span = name, %error, "lookup span end hook failed");
            }
        }
        out
    }
}

impl fmt::Debug for SpanHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SpanHooks")
    }
}

/// Hooks consulted by every lookup
#[derive(Clone, Default)]
pub(crate) struct LookupHooks {
    pub(crate) fail: Option<GuardHook>,
    pub(crate) error: Option<GuardHook>,
    pub(crate) span: Option<SpanHooks>,
}
