//! Contract tests for the frame-evaluation layer API
//!
//! These tests pin down the public surface compilers integrate against.

use std::sync::Arc;

use bytecode_system::CodeBuilder;
use core_types::{RuntimeError, Value};
use frame_eval::{
    compiler, guard, guard_hook, CacheEntry, CallbackRef, CompileOutcome, CompileRequest, CompilerCallback,
    DispatchMode, DynamicState, FrameEval, FrameEvalConfig, Guard, GuardFailure, GuardHook,
    GuardRef, GuardedCode, SlotKind, SpanHooks,
};
use interpreter::{FrameEvaluator, FrameLocals, Runtime};

fn assert_send_sync<T: Send + Sync>() {}

/// Everything shared with other threads is `Send + Sync`
#[test]
fn test_thread_safety_contract() {
    assert_send_sync::<FrameEval>();
    assert_send_sync::<CacheEntry>();
    assert_send_sync::<DynamicState>();
    assert_send_sync::<DispatchMode>();
    assert_send_sync::<GuardHook>();
    assert_send_sync::<SpanHooks>();
}

/// The layer plugs into the runtime's evaluator slot
#[test]
fn test_frame_eval_is_evaluator_contract() {
    fn takes_evaluator(_: Arc<dyn FrameEvaluator>) {}
    takes_evaluator(FrameEval::new());
}

/// Closures satisfy the guard and compiler traits
#[test]
fn test_closure_traits_contract() {
    struct Never;
    impl Guard for Never {
        fn check(&self, _: &FrameLocals) -> Result<bool, RuntimeError> {
            Ok(false)
        }
    }
    struct Decline;
    impl CompilerCallback for Decline {
        fn compile(&self, _: &CompileRequest<'_>) -> Result<CompileOutcome, RuntimeError> {
            Ok(CompileOutcome::Skip)
        }
    }

    let explicit: GuardRef = Arc::new(Never);
    let closure: GuardRef = guard(|_| Ok(true));
    assert_eq!(explicit.check(&FrameLocals::default()), Ok(false));
    assert_eq!(closure.check(&FrameLocals::default()), Ok(true));

    let _explicit: CallbackRef = Arc::new(Decline);
    let _closure: CallbackRef = compiler(|_| Ok(CompileOutcome::Skip));
}

/// A fresh layer is disabled with empty slots
#[test]
fn test_initial_state_contract() {
    let layer = FrameEval::new();
    let code = CodeBuilder::new("f", &[]).build();
    assert_eq!(layer.mode(), DispatchMode::Disabled);
    assert!(!layer.is_active());
    assert_eq!(layer.active_threads(), 0);
    assert_eq!(layer.slot_kind(&code), SlotKind::Empty);
    assert!(layer.cache_entries(&code, None).is_empty());
    assert!(layer.dynamic_state(&code, None).is_none());
    assert_eq!(layer.prune_dead_instances(), 0);
    assert_eq!(layer.prune_exited_threads(&Runtime::new()), 0);
    assert_eq!(layer.config(), &FrameEvalConfig::default());
}

/// Mode changes install and uninstall the hook
#[test]
fn test_install_contract() {
    let runtime = Runtime::new();
    let layer = FrameEval::new();

    assert_eq!(layer.run_only(&runtime), DispatchMode::Disabled);
    assert!(runtime.eval_frame_func().is_some());
    // re-setting a non-disabled mode does not count twice
    assert_eq!(layer.run_only(&runtime), DispatchMode::RunOnly);
    assert_eq!(layer.active_threads(), 1);

    assert_eq!(layer.disable(&runtime), DispatchMode::RunOnly);
    assert!(runtime.eval_frame_func().is_none());
    // disabling twice is harmless
    assert_eq!(layer.disable(&runtime), DispatchMode::Disabled);
    assert_eq!(layer.active_threads(), 0);
}

/// Hook setters hand back what they replaced
#[test]
fn test_hook_setters_contract() {
    let layer = FrameEval::new();
    let hook: GuardHook = guard_hook(|failure: &GuardFailure<'_>| {
        assert!(failure.index <= 1);
        Ok(())
    });
    assert!(layer.set_guard_fail_hook(Some(hook.clone())).is_none());
    assert!(layer.set_guard_fail_hook(None).is_some());
    assert!(layer.set_guard_error_hook(Some(hook)).is_none());
    assert!(layer.set_guard_error_hook(None).is_some());

    layer.set_span_hooks(|_| Ok(Value::None), |_| Ok(()));
    layer.clear_span_hooks();
}

/// Compiled outcomes keep the code they were given
#[test]
fn test_guarded_code_contract() {
    let code = CodeBuilder::new("f_fast", &[]).build();
    let compiled = GuardedCode::new(guard(|_| Ok(true)), code.clone());
    assert!(Arc::ptr_eq(&compiled.code, &code));
    match CompileOutcome::Compiled(compiled) {
        CompileOutcome::Compiled(inner) => assert!(Arc::ptr_eq(&inner.code, &code)),
        CompileOutcome::Skip => unreachable!(),
    }
}
