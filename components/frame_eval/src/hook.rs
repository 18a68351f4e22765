//! The interception layer and its control surface

use std::fmt;
use std::sync::{Arc, Weak};

use bytecode_system::CodeObject;
use core_types::{ObjectRef, RuntimeError, Value};
use interpreter::{EvaluatorRef, Runtime};
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::cache::CacheEntry;
use crate::callback::CallbackRef;
use crate::config::FrameEvalConfig;
use crate::extra::{ExtraStore, SlotKind};
use crate::hooks::{GuardHook, LookupHooks, SpanHooks};
use crate::install::HookInstaller;
use crate::mode::{DispatchMode, ModeTable};
use crate::state::DynamicState;

/// Frame-evaluation interception layer
///
/// Installed into a [`Runtime`]'s evaluator slot while any thread has a
/// mode other than [`DispatchMode::Disabled`]. For each intercepted call it
/// looks for a cached replacement whose guard accepts the frame's locals,
/// asks the compiler callback for one on a miss, and otherwise falls back
/// to the evaluator that was installed before it.
///
/// # Example
///
/// ```
/// use bytecode_system::{CodeBuilder, Opcode};
/// use core_types::{Function, Value};
/// use frame_eval::{compiler, CompileOutcome, FrameEval, SlotKind};
/// use interpreter::Runtime;
///
/// let mut builder = CodeBuilder::new("double", &["x"]);
/// builder.load_local("x").load_local("x").emit(Opcode::Add).emit(Opcode::Return);
/// let code = builder.build();
/// let double = Value::Function(Function::new(code.clone()));
///
/// let runtime = Runtime::new();
/// let layer = FrameEval::new();
/// layer.enable(&runtime, compiler(|_| Ok(CompileOutcome::Skip)));
///
/// assert_eq!(runtime.call(&double, vec![Value::Int(4)]).unwrap(), Value::Int(8));
/// assert_eq!(layer.slot_kind(&code), SlotKind::Skip);
/// layer.disable(&runtime);
/// ```
pub struct FrameEval {
    me: Weak<FrameEval>,
    pub(crate) config: FrameEvalConfig,
    pub(crate) modes: ModeTable,
    pub(crate) installer: HookInstaller,
    pub(crate) store: Mutex<ExtraStore>,
    pub(crate) hooks: RwLock<LookupHooks>,
}

impl FrameEval {
    /// Create a layer with default configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(FrameEvalConfig::default())
    }

    /// Create a layer with the given configuration
    pub fn with_config(config: FrameEvalConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            modes: ModeTable::default(),
            installer: HookInstaller::default(),
            store: Mutex::new(ExtraStore::default()),
            hooks: RwLock::new(LookupHooks::default()),
        })
    }

    /// Layer configuration
    pub fn config(&self) -> &FrameEvalConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Mode control
    // ------------------------------------------------------------------

    /// Set the calling thread's mode, returning the previous one
    ///
    /// Leaving `Disabled` installs the hook if no other thread has;
    /// returning to `Disabled` uninstalls it once no thread needs it.
    pub fn set_mode(&self, runtime: &Runtime, mode: DispatchMode) -> DispatchMode {
        let _lock = runtime.lock();
        let now_disabled = mode.is_disabled();
        let label = mode.to_string();
        let prior = self.modes.replace(mode);
        match (prior.is_disabled(), now_disabled) {
            (true, false) => {
                if let Some(hook) = self.as_evaluator() {
                    self.installer.increment(runtime, hook);
                }
            }
            (false, true) => self.installer.decrement(runtime),
            _ => {}
        }
        debug!(from = %prior, to = %label, "dispatch mode changed");
        prior
    }

    /// Intercept and compile on the calling thread
    pub fn enable(&self, runtime: &Runtime, callback: CallbackRef) -> DispatchMode {
        self.set_mode(runtime, DispatchMode::Active(callback))
    }

    /// Intercept using cached replacements only
    pub fn run_only(&self, runtime: &Runtime) -> DispatchMode {
        self.set_mode(runtime, DispatchMode::RunOnly)
    }

    /// Stop intercepting on the calling thread
    pub fn disable(&self, runtime: &Runtime) -> DispatchMode {
        self.set_mode(runtime, DispatchMode::Disabled)
    }

    /// The calling thread's configured mode
    pub fn mode(&self) -> DispatchMode {
        self.modes.setting()
    }

    /// Whether the calling thread intercepts calls
    pub fn is_active(&self) -> bool {
        !self.modes.setting().is_disabled()
    }

    /// Number of threads with a mode other than `Disabled`
    pub fn active_threads(&self) -> usize {
        self.installer.active_threads()
    }

    fn as_evaluator(&self) -> Option<EvaluatorRef> {
        let me: Arc<FrameEval> = self.me.upgrade()?;
        Some(me)
    }

    // ------------------------------------------------------------------
    // Cache control
    // ------------------------------------------------------------------

    /// Drop every cached replacement and the dynamic state of a function
    ///
    /// Idempotent. Anything but a function value is a `TypeError`.
    pub fn invalidate(&self, target: &Value) -> Result<(), RuntimeError> {
        let code = function_code(target)?;
        self.invalidate_code(code);
        Ok(())
    }

    /// [`invalidate`](Self::invalidate) addressed by code object
    pub fn invalidate_code(&self, code: &CodeObject) {
        if self.store.lock().invalidate(code.id()) {
            debug!(code = %code.id(), name = code.name(), "cache invalidated");
        }
    }

    /// Drop one receiver's replacements and dynamic state for a method
    pub fn invalidate_instance(&self, target: &Value, instance: &ObjectRef) -> Result<(), RuntimeError> {
        let code = function_code(target)?;
        if self.store.lock().invalidate_instance(code.id(), instance) {
            debug!(code = %code.id(), name = code.name(), "instance cache invalidated");
        }
        Ok(())
    }

    /// Never intercept a function again until it is invalidated
    pub fn force_skip(&self, target: &Value) -> Result<(), RuntimeError> {
        let code = function_code(target)?;
        self.force_skip_code(code);
        Ok(())
    }

    /// [`force_skip`](Self::force_skip) addressed by code object
    pub fn force_skip_code(&self, code: &Arc<CodeObject>) {
        self.store.lock().mark_skip(code);
        debug!(code = %code.id(), name = code.name(), "function marked skip");
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Hook called for every guard that rejects a frame; returns the old one
    pub fn set_guard_fail_hook(&self, hook: Option<GuardHook>) -> Option<GuardHook> {
        std::mem::replace(&mut self.hooks.write().fail, hook)
    }

    /// Hook called for a guard that raised; returns the old one
    pub fn set_guard_error_hook(&self, hook: Option<GuardHook>) -> Option<GuardHook> {
        std::mem::replace(&mut self.hooks.write().error, hook)
    }

    /// Bracket every cache lookup with `start` and `end`
    ///
    /// `start` receives the configured span name and its result is passed
    /// to `end`. Failures of either are logged, never raised.
    pub fn set_span_hooks<S, E>(&self, start: S, end: E)
    where
        S: Fn(&str) -> Result<Value, RuntimeError> + Send + Sync + 'static,
        E: Fn(Value) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        self.hooks.write().span = Some(SpanHooks::new(start, end));
    }

    /// Remove the lookup span hooks
    pub fn clear_span_hooks(&self) {
        self.hooks.write().span = None;
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// State of a function's cache slot
    pub fn slot_kind(&self, code: &CodeObject) -> SlotKind {
        self.store.lock().slot_kind(code.id())
    }

    /// Entries of the chain used for calls with this receiver, head first
    pub fn cache_entries(&self, code: &CodeObject, instance: Option<&ObjectRef>) -> Vec<CacheEntry> {
        self.store.lock().entries(code.id(), instance)
    }

    /// Dynamic state handed to the compiler, if created yet
    pub fn dynamic_state(&self, code: &CodeObject, instance: Option<&ObjectRef>) -> Option<DynamicState> {
        self.store.lock().state(code.id(), instance)
    }

    /// Reclaim chains and state of dropped receivers and dropped code
    ///
    /// Returns the number of records removed.
    pub fn prune_dead_instances(&self) -> usize {
        self.store.lock().prune()
    }

    /// Forget threads that exited without returning to `Disabled`
    ///
    /// Each such thread gives up its share of the installation, so the hook
    /// is uninstalled once no live thread needs it. Returns the number of
    /// threads released.
    pub fn prune_exited_threads(&self, runtime: &Runtime) -> usize {
        let _lock = runtime.lock();
        let released = self.modes.prune_exited();
        for _ in 0..released {
            self.installer.decrement(runtime);
        }
        if released > 0 {
            debug!(released, "released exited threads");
        }
        released
    }
}

fn function_code(target: &Value) -> Result<&Arc<CodeObject>, RuntimeError> {
    match target {
        Value::Function(func) => Ok(func.code()),
        other => Err(RuntimeError::type_error(format!(
            "expected a function, got '{}'",
            other.type_name()
        ))),
    }
}

impl fmt::Debug for FrameEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameEval")
            .field("config", &self.config)
            .field("active_threads", &self.active_threads())
            .field("functions", &self.store.lock().len())
            .finish()
    }
}
