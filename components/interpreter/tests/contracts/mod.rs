//! Contract tests for interpreter API
//!
//! These tests pin down the public surface other components rely on.

use std::sync::Arc;
use std::thread;

use bytecode_system::{CodeBuilder, Opcode};
use core_types::{EvalResult, Function, Value};
use interpreter::{
    same_evaluator, EvaluatorRef, Frame, FrameEvaluator, FrameLocals, Runtime, RuntimeConfig,
    DEFAULT_MAX_CALL_DEPTH,
};

struct PassThrough;

impl FrameEvaluator for PassThrough {
    fn eval_frame(&self, runtime: &Runtime, frame: &mut Frame, throw_flag: bool) -> EvalResult {
        runtime.eval_frame_default(frame, throw_flag)
    }
}

fn assert_send_sync<T: Send + Sync>() {}

/// Runtime and evaluators are shareable across threads
#[test]
fn test_thread_safety_contract() {
    assert_send_sync::<Runtime>();
    assert_send_sync::<EvaluatorRef>();
    assert_send_sync::<FrameLocals>();
}

/// Default configuration uses the documented depth limit
#[test]
fn test_runtime_config_default_contract() {
    assert_eq!(RuntimeConfig::default().max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    assert_eq!(Runtime::new().config(), &RuntimeConfig::default());
}

/// The evaluator slot starts empty and reports what it replaced
#[test]
fn test_eval_frame_func_contract() {
    let runtime = Runtime::new();
    assert!(runtime.eval_frame_func().is_none());

    let hook: EvaluatorRef = Arc::new(PassThrough);
    assert!(runtime.set_eval_frame_func(Some(hook.clone())).is_none());
    let current = runtime.eval_frame_func().unwrap();
    assert!(same_evaluator(&current, &hook));

    let replaced = runtime.set_eval_frame_func(None).unwrap();
    assert!(same_evaluator(&replaced, &hook));
    assert!(runtime.eval_frame_func().is_none());
}

/// Distinct evaluators are never confused
#[test]
fn test_same_evaluator_contract() {
    let a: EvaluatorRef = Arc::new(PassThrough);
    let b: EvaluatorRef = Arc::new(PassThrough);
    assert!(same_evaluator(&a, &a.clone()));
    assert!(!same_evaluator(&a, &b));
}

/// Calls from several threads are serialized by the execution lock
#[test]
fn test_runtime_shared_between_threads_contract() {
    let runtime = Arc::new(Runtime::new());
    let mut builder = CodeBuilder::new("square", &["x"]);
    builder
        .load_local("x")
        .load_local("x")
        .emit(Opcode::Mul)
        .emit(Opcode::Return);
    let square = Value::Function(Function::new(builder.build()));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let runtime = runtime.clone();
            let square = square.clone();
            thread::spawn(move || runtime.call(&square, vec![Value::Int(i)]))
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let i = i as i64;
        assert_eq!(handle.join().unwrap(), Ok(Value::Int(i * i)));
    }
}

/// The execution lock is reentrant
#[test]
fn test_lock_reentrant_contract() {
    let runtime = Runtime::new();
    let _outer = runtime.lock();
    let _inner = runtime.lock();
    let answer = {
        let mut builder = CodeBuilder::new("answer", &[]);
        builder.load_constant(42).emit(Opcode::Return);
        Value::Function(Function::new(builder.build()))
    };
    assert_eq!(runtime.call(&answer, vec![]), Ok(Value::Int(42)));
}
