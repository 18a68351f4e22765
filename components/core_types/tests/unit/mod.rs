//! Unit tests for core_types

use bytecode_system::{CodeBuilder, Constant};
use core_types::{
    Class, ErrorKind, Function, NativeFunction, Object, RuntimeError, StackFrame, Value,
};
use std::sync::Arc;

// ============================================================================
// Value Tests
// ============================================================================

#[test]
fn test_value_truthiness() {
    assert!(Value::Int(1).is_truthy());
    assert!(!Value::Int(0).is_truthy());
    assert!(Value::str("x").is_truthy());
    assert!(!Value::Bool(false).is_truthy());
}

#[test]
fn test_value_type_names() {
    let class = Class::new("Module").build();
    assert_eq!(Value::None.type_name(), "NoneType");
    assert_eq!(Value::Float(1.0).type_name(), "float");
    assert_eq!(Value::Object(Object::new(class)).type_name(), "Module");
}

#[test]
fn test_callables() {
    let code = CodeBuilder::new("f", &[]).build();
    let func = Value::Function(Function::new(code));
    let native = Value::Native(NativeFunction::new("n", |_| Ok(Value::None)));
    assert!(func.is_callable());
    assert!(native.is_callable());
    assert!(!Value::Int(3).is_callable());
}

#[test]
fn test_function_value_identity() {
    let code = CodeBuilder::new("f", &[]).build();
    let a = Function::new(code.clone());
    let b = Function::new(code);
    assert_eq!(Value::Function(a.clone()), Value::Function(a));
    assert_ne!(
        Value::Function(b),
        Value::Function(Function::new(CodeBuilder::new("f", &[]).build()))
    );
}

#[test]
fn test_constant_conversion() {
    assert_eq!(Value::from(&Constant::Float(0.5)), Value::Float(0.5));
    assert_eq!(Value::from(&Constant::Bool(true)), Value::Bool(true));
}

// ============================================================================
// Object Tests
// ============================================================================

#[test]
fn test_object_weak_reference_expires() {
    let class = Class::new("C").stateful(true).build();
    let obj = Object::new(class);
    let weak = Arc::downgrade(&obj);
    assert!(weak.upgrade().is_some());
    drop(obj);
    assert!(weak.upgrade().is_none());
}

#[test]
fn test_object_class_flags() {
    let plain = Object::new(Class::new("Plain").build());
    let stateful = Object::new(Class::new("Layer").stateful(true).build());
    assert!(!plain.class().is_stateful());
    assert!(stateful.class().is_stateful());
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_error_display_and_traceback() {
    let mut error = RuntimeError::new(ErrorKind::RecursionError, "maximum depth exceeded");
    error.push_frame(StackFrame::new("inner", 2));
    error.push_frame(StackFrame::new("outer", 7));
    assert_eq!(error.to_string(), "RecursionError: maximum depth exceeded");
    assert_eq!(error.traceback.len(), 2);
    assert_eq!(error.traceback[0].function_name, "inner");
}
