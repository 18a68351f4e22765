//! Runtime: execution lock, globals and the frame-evaluation slot
//!
//! Every frame the runtime runs goes through [`Runtime::eval_frame`], which
//! consults the process-wide evaluator slot. An empty slot means the built-in
//! stack machine ([`Runtime::eval_frame_default`]) runs the frame.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_types::{ErrorKind, EvalResult, RuntimeError, StackFrame, Value};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::frame::Frame;

/// Default limit on nested frame evaluations
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// A replacement for the default frame evaluator
///
/// Installed with [`Runtime::set_eval_frame_func`]. `throw_flag` is set when
/// the frame is being resumed only to propagate its pending exception.
pub trait FrameEvaluator: Send + Sync {
    /// Evaluate the frame to completion
    fn eval_frame(&self, runtime: &Runtime, frame: &mut Frame, throw_flag: bool) -> EvalResult;
}

/// Shared handle to an installed evaluator
pub type EvaluatorRef = Arc<dyn FrameEvaluator>;

/// Whether two evaluator handles point at the same evaluator
pub fn same_evaluator(a: &EvaluatorRef, b: &EvaluatorRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Runtime limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of nested default-path frame evaluations
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// The host runtime
///
/// Holds the execution lock that serializes all evaluation, the global
/// namespace, and the evaluator slot.
///
/// # Example
///
/// ```
/// use bytecode_system::{CodeBuilder, Opcode};
/// use core_types::{Function, Value};
/// use interpreter::Runtime;
///
/// let mut builder = CodeBuilder::new("add", &["a", "b"]);
/// builder.load_local("a").load_local("b");
/// builder.emit(Opcode::Add).emit(Opcode::Return);
/// let add = Value::Function(Function::new(builder.build()));
///
/// let runtime = Runtime::new();
/// let result = runtime.call(&add, vec![Value::Int(2), Value::Int(3)]).unwrap();
/// assert_eq!(result, Value::Int(5));
/// ```
pub struct Runtime {
    config: RuntimeConfig,
    lock: ReentrantMutex<()>,
    evaluator: RwLock<Option<EvaluatorRef>>,
    globals: RwLock<FxHashMap<String, Value>>,
    depth: AtomicUsize,
}

impl Runtime {
    /// Create a runtime with default limits
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given limits
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            lock: ReentrantMutex::new(()),
            evaluator: RwLock::new(None),
            globals: RwLock::new(FxHashMap::default()),
            depth: AtomicUsize::new(0),
        }
    }

    /// Runtime limits
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Acquire the execution lock
    ///
    /// The lock is reentrant: code already running under it may call back
    /// into the runtime freely.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Call a function value with positional arguments
    ///
    /// # Arguments
    ///
    /// * `callee` - An interpreted or native function
    /// * `args` - Positional arguments
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The function's return value
    /// * `Err(RuntimeError)` - If the callee is not callable or raised
    pub fn call(&self, callee: &Value, args: Vec<Value>) -> EvalResult {
        let _guard = self.lock();
        match callee {
            Value::Function(func) => {
                let mut frame = Frame::with_args(func.code().clone(), args)?;
                self.eval_frame(&mut frame, false)
            }
            Value::Native(func) => func.call(&args),
            other => Err(RuntimeError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Evaluate a frame through the installed evaluator
    pub fn eval_frame(&self, frame: &mut Frame, throw_flag: bool) -> EvalResult {
        let _guard = self.lock();
        // Clone out of the slot so the evaluator may replace itself.
        let evaluator = self.evaluator.read().clone();
        match evaluator {
            Some(evaluator) => evaluator.eval_frame(self, frame, throw_flag),
            None => self.eval_frame_default(frame, throw_flag),
        }
    }

    /// Evaluate a frame with the built-in stack machine
    ///
    /// With `throw_flag` set, the frame's pending exception is raised
    /// immediately without running any instruction.
    pub fn eval_frame_default(&self, frame: &mut Frame, throw_flag: bool) -> EvalResult {
        let _guard = self.lock();
        if throw_flag {
            let mut error = frame
                .take_pending()
                .unwrap_or_else(|| RuntimeError::system("frame resumed to throw without an exception"));
            error.push_frame(StackFrame::new(frame.code().name(), 0));
            return Err(error);
        }

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let result = if depth > self.config.max_call_depth {
            Err(RuntimeError::new(
                ErrorKind::RecursionError,
                "maximum recursion depth exceeded",
            ))
        } else {
            Dispatcher::new(self).run(frame)
        };
        self.depth.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Raise an exception into a frame
    ///
    /// The error becomes the frame's pending exception and the frame is
    /// evaluated with `throw_flag` set.
    pub fn throw_into(&self, frame: &mut Frame, error: RuntimeError) -> EvalResult {
        frame.set_pending(error);
        self.eval_frame(frame, true)
    }

    /// The currently installed evaluator, `None` for the default
    pub fn eval_frame_func(&self) -> Option<EvaluatorRef> {
        self.evaluator.read().clone()
    }

    /// Install an evaluator, returning the one it replaces
    ///
    /// `None` restores the default evaluator.
    pub fn set_eval_frame_func(&self, evaluator: Option<EvaluatorRef>) -> Option<EvaluatorRef> {
        let _guard = self.lock();
        debug!(custom = evaluator.is_some(), "installing frame evaluator");
        std::mem::replace(&mut *self.evaluator.write(), evaluator)
    }

    /// Read a global variable
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.read().get(name).cloned()
    }

    /// Write a global variable
    pub fn set_global(&self, name: impl Into<String>, value: Value) {
        self.globals.write().insert(name.into(), value);
    }

    /// Number of default-path frames currently executing
    pub fn call_depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("custom_evaluator", &self.evaluator.read().is_some())
            .field("globals", &self.globals.read().len())
            .field("depth", &self.call_depth())
            .finish()
    }
}
