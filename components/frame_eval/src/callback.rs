//! Compiler callback contract
//!
//! On a cache miss in active mode the layer asks the callback for a
//! replacement. The callback either declines, which marks the function
//! skipped, or returns guarded replacement code to prepend to the chain.

use std::fmt;
use std::sync::Arc;

use bytecode_system::CodeObject;
use core_types::{ObjectRef, RuntimeError};
use interpreter::FrameLocals;

use crate::cache::GuardedCode;
use crate::state::DynamicState;

/// Everything the compiler is told about a missed call
#[derive(Debug)]
pub struct CompileRequest<'a> {
    /// Code of the function being called
    pub code: &'a Arc<CodeObject>,
    /// Snapshot of the frame's bound locals
    pub locals: &'a FrameLocals,
    /// Stateful receiver when the call is a method call
    pub instance: Option<&'a ObjectRef>,
    /// Number of entries already in the applicable chain
    pub cache_size: usize,
    /// Dynamic state for this function (or receiver)
    pub state: &'a DynamicState,
}

/// The compiler's answer
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// Never try to compile this function again
    Skip,
    /// Use this replacement whenever its guard holds
    Compiled(GuardedCode),
}

/// Decides what replacement, if any, to produce for a call
///
/// Errors are integration failures: they propagate to the caller and stop
/// interception on the calling thread.
pub trait CompilerCallback: Send + Sync {
    /// Produce a replacement for the requested call
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutcome, RuntimeError>;
}

impl<F> CompilerCallback for F
where
    F: Fn(&CompileRequest<'_>) -> Result<CompileOutcome, RuntimeError> + Send + Sync,
{
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutcome, RuntimeError> {
        self(request)
    }
}

/// Shared handle to a compiler callback
pub type CallbackRef = Arc<dyn CompilerCallback>;

/// Wrap a closure as a compiler callback
pub fn compiler<F>(compile: F) -> CallbackRef
where
    F: Fn(&CompileRequest<'_>) -> Result<CompileOutcome, RuntimeError> + Send + Sync + 'static,
{
    Arc::new(compile)
}

pub(crate) struct CallbackDebug<'a>(pub(crate) &'a CallbackRef);

impl fmt::Debug for CallbackDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<compiler callback at {:p}>", Arc::as_ptr(self.0) as *const ())
    }
}
