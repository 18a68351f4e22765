//! Unit tests for interpreter components

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytecode_system::{CodeBuilder, Opcode};
use core_types::{Class, ErrorKind, EvalResult, Function, NativeFunction, Object, Value};
use interpreter::{Frame, FrameEvaluator, Runtime};

fn function(builder: CodeBuilder) -> Value {
    Value::Function(Function::new(builder.build()))
}

// ============================================================================
// Runtime Tests
// ============================================================================

#[test]
fn test_runtime_global_overwrite() {
    let runtime = Runtime::new();

    runtime.set_global("x", Value::Int(10));
    runtime.set_global("x", Value::Int(20));

    assert_eq!(runtime.get_global("x"), Some(Value::Int(20)));
}

#[test]
fn test_runtime_store_and_load_global() {
    let runtime = Runtime::new();
    let mut builder = CodeBuilder::new("publish", &["v"]);
    builder
        .load_local("v")
        .emit(Opcode::StoreGlobal("published".to_string()))
        .emit(Opcode::LoadGlobal("published".to_string()))
        .emit(Opcode::Return);

    let result = runtime.call(&function(builder), vec![Value::Int(9)]);
    assert_eq!(result, Ok(Value::Int(9)));
    assert_eq!(runtime.get_global("published"), Some(Value::Int(9)));
}

#[test]
fn test_runtime_calls_native() {
    let runtime = Runtime::new();
    let double = NativeFunction::new("double", |args: &[Value]| match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err(core_types::RuntimeError::type_error("double expects an int")),
    });
    runtime.set_global("double", Value::Native(double));

    let mut builder = CodeBuilder::new("f", &["x"]);
    builder
        .emit(Opcode::LoadGlobal("double".to_string()))
        .load_local("x")
        .emit(Opcode::Call(1))
        .emit(Opcode::Return);

    assert_eq!(runtime.call(&function(builder), vec![Value::Int(21)]), Ok(Value::Int(42)));
}

#[test]
fn test_runtime_call_wrong_arity() {
    let runtime = Runtime::new();
    let callee = function(CodeBuilder::new("two", &["a", "b"]));
    let err = runtime.call(&callee, vec![Value::Int(1)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
}

// ============================================================================
// Object and Method Tests
// ============================================================================

fn counter_class() -> Arc<Class> {
    // def bump(self, by): self.n = self.n + by; return self.n
    let mut bump = CodeBuilder::new("bump", &["self", "by"]);
    bump.load_local("self")
        .load_local("self")
        .emit(Opcode::LoadAttr("n".to_string()))
        .load_local("by")
        .emit(Opcode::Add)
        .emit(Opcode::StoreAttr("n".to_string()))
        .load_local("self")
        .emit(Opcode::LoadAttr("n".to_string()))
        .emit(Opcode::Return);
    Class::new("Counter")
        .stateful(true)
        .with_method("bump", function(bump))
        .build()
}

#[test]
fn test_call_method_passes_receiver() {
    let runtime = Runtime::new();
    let counter = Object::new(counter_class());
    counter.set_attr("n", Value::Int(1));

    let mut builder = CodeBuilder::new("driver", &["c"]);
    builder
        .load_local("c")
        .load_constant(5)
        .emit(Opcode::CallMethod("bump".to_string(), 1))
        .emit(Opcode::Return);

    let result = runtime.call(&function(builder), vec![Value::Object(counter.clone())]);
    assert_eq!(result, Ok(Value::Int(6)));
    assert_eq!(counter.get_attr("n"), Some(Value::Int(6)));
}

#[test]
fn test_call_missing_method() {
    let runtime = Runtime::new();
    let counter = Object::new(counter_class());

    let mut builder = CodeBuilder::new("driver", &["c"]);
    builder
        .load_local("c")
        .emit(Opcode::CallMethod("reset".to_string(), 0))
        .emit(Opcode::Return);

    let err = runtime
        .call(&function(builder), vec![Value::Object(counter)])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AttributeError);
}

#[test]
fn test_load_attr_on_int() {
    let runtime = Runtime::new();
    let mut builder = CodeBuilder::new("f", &[]);
    builder
        .load_constant(1)
        .emit(Opcode::LoadAttr("real".to_string()))
        .emit(Opcode::Return);
    let err = runtime.call(&function(builder), vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::AttributeError);
    assert!(err.message.contains("'int'"));
}

// ============================================================================
// Traceback Tests
// ============================================================================

#[test]
fn test_traceback_records_each_frame() {
    let runtime = Runtime::new();
    let mut inner = CodeBuilder::new("inner", &[]);
    inner.load_constant("fail").emit(Opcode::Raise);
    runtime.set_global("inner", function(inner));

    let mut outer = CodeBuilder::new("outer", &[]);
    outer
        .emit(Opcode::LoadGlobal("inner".to_string()))
        .emit(Opcode::Call(0))
        .emit(Opcode::Return);

    let err = runtime.call(&function(outer), vec![]).unwrap_err();
    let names: Vec<_> = err.traceback.iter().map(|f| f.function_name.as_str()).collect();
    assert_eq!(names, vec!["inner", "outer"]);
}

// ============================================================================
// Evaluator Slot Tests
// ============================================================================

struct Counting {
    calls: AtomicUsize,
}

impl FrameEvaluator for Counting {
    fn eval_frame(&self, runtime: &Runtime, frame: &mut Frame, throw_flag: bool) -> EvalResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        runtime.eval_frame_default(frame, throw_flag)
    }
}

#[test]
fn test_custom_evaluator_sees_every_frame() {
    let runtime = Runtime::new();
    let counting = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    runtime.set_eval_frame_func(Some(counting.clone()));

    let mut inner = CodeBuilder::new("inner", &[]);
    inner.load_constant(1).emit(Opcode::Return);
    runtime.set_global("inner", function(inner));

    let mut outer = CodeBuilder::new("outer", &[]);
    outer
        .emit(Opcode::LoadGlobal("inner".to_string()))
        .emit(Opcode::Call(0))
        .emit(Opcode::Return);

    assert_eq!(runtime.call(&function(outer), vec![]), Ok(Value::Int(1)));
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_throw_into_reaches_custom_evaluator() {
    let runtime = Runtime::new();
    let counting = Arc::new(Counting {
        calls: AtomicUsize::new(0),
    });
    runtime.set_eval_frame_func(Some(counting.clone()));

    let mut frame = Frame::new(CodeBuilder::new("gen", &[]).build());
    let err = runtime
        .throw_into(&mut frame, core_types::RuntimeError::exception("closing"))
        .unwrap_err();
    assert_eq!(err.message, "closing");
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_frame_locals_snapshot_order() {
    let mut builder = CodeBuilder::new("f", &["b", "a"]);
    builder.add_local("c");
    let frame = Frame::with_args(builder.build(), vec![Value::Int(1), Value::Int(2)]).unwrap();

    let names: Vec<_> = frame.locals_snapshot().iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(names, vec!["b", "a"]);
}
