//! Bytecode to Interpreter Integration Tests
//!
//! Tests the integration between bytecode_system, core_types and the
//! interpreter's default evaluator.

use bytecode_system::{CodeBuilder, Opcode};
use core_types::{Class, ErrorKind, NativeFunction, Object, RuntimeError, Value};
use integration_tests::{function, poly};
use interpreter::Runtime;

/// Test: Execute a pure function
#[test]
fn test_execute_poly() {
    let runtime = Runtime::new();
    let result = runtime.call(&function(&poly()), vec![Value::Int(3), Value::Int(4)]);
    assert_eq!(result, Ok(Value::Int(13)));
}

/// Test: Mixed int/float arithmetic
#[test]
fn test_execute_mixed_arithmetic() {
    let runtime = Runtime::new();
    let result = runtime.call(&function(&poly()), vec![Value::Float(0.5), Value::Int(1)]);
    assert_eq!(result, Ok(Value::Float(1.25)));
}

/// Test: Loop with a counter local
#[test]
fn test_execute_loop() {
    // def count(n): i = 0; while i < n: i = i + 1; return i
    let mut builder = CodeBuilder::new("count", &["n"]);
    builder.load_constant(0).store_local("i");
    let head = builder.next_offset();
    builder.load_local("i").load_local("n").emit(Opcode::LessThan);
    let exit = builder.next_offset();
    builder.emit(Opcode::JumpIfFalse(0));
    builder
        .load_local("i")
        .load_constant(1)
        .emit(Opcode::Add)
        .store_local("i")
        .emit(Opcode::Jump(head));
    let end = builder.next_offset();
    builder.patch_jump(exit, end);
    builder.load_local("i").emit(Opcode::Return);

    let runtime = Runtime::new();
    let result = runtime.call(&function(&builder.build()), vec![Value::Int(5)]);
    assert_eq!(result, Ok(Value::Int(5)));
}

/// Test: Native functions receive evaluated arguments
#[test]
fn test_native_callback_from_bytecode() {
    let runtime = Runtime::new();
    let max = NativeFunction::new("max", |args: &[Value]| match args {
        [Value::Int(a), Value::Int(b)] => Ok(Value::Int(*a.max(b))),
        _ => Err(RuntimeError::type_error("max expects two ints")),
    });
    runtime.set_global("max", Value::Native(max));

    let mut builder = CodeBuilder::new("clamp_low", &["x"]);
    builder
        .emit(Opcode::LoadGlobal("max".to_string()))
        .load_local("x")
        .load_constant(0)
        .emit(Opcode::Call(2))
        .emit(Opcode::Return);
    let clamp = function(&builder.build());

    assert_eq!(runtime.call(&clamp, vec![Value::Int(-4)]), Ok(Value::Int(0)));
    assert_eq!(runtime.call(&clamp, vec![Value::Int(9)]), Ok(Value::Int(9)));
}

/// Test: Method dispatch mutates receiver state
#[test]
fn test_method_call_updates_instance() {
    // def step(self): self.count = self.count + 1
    let mut step = CodeBuilder::new("step", &["self"]);
    step.load_local("self")
        .load_local("self")
        .emit(Opcode::LoadAttr("count".to_string()))
        .load_constant(1)
        .emit(Opcode::Add)
        .emit(Opcode::StoreAttr("count".to_string()))
        .emit(Opcode::LoadNone)
        .emit(Opcode::Return);
    let class = Class::new("Stepper")
        .with_method("step", function(&step.build()))
        .build();
    let stepper = Object::new(class);
    stepper.set_attr("count", Value::Int(0));

    let mut driver = CodeBuilder::new("drive", &["s"]);
    for _ in 0..3 {
        driver
            .load_local("s")
            .emit(Opcode::CallMethod("step".to_string(), 0))
            .emit(Opcode::Pop);
    }
    driver.emit(Opcode::LoadNone).emit(Opcode::Return);

    let runtime = Runtime::new();
    runtime
        .call(&function(&driver.build()), vec![Value::Object(stepper.clone())])
        .unwrap();
    assert_eq!(stepper.get_attr("count"), Some(Value::Int(3)));
}

/// Test: Errors carry a traceback through nested calls
#[test]
fn test_error_propagation() {
    let runtime = Runtime::new();
    let mut fail = CodeBuilder::new("fail", &[]);
    fail.load_constant("no").emit(Opcode::Raise);
    runtime.set_global("fail", function(&fail.build()));

    let mut outer = CodeBuilder::new("outer", &[]);
    outer
        .emit(Opcode::LoadGlobal("fail".to_string()))
        .emit(Opcode::Call(0))
        .emit(Opcode::Return);

    let err = runtime.call(&function(&outer.build()), vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Exception);
    assert_eq!(err.to_string(), "Exception: no");
    assert_eq!(err.traceback.len(), 2);
}
