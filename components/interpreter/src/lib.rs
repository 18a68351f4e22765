//! Bytecode interpreter and host runtime
//!
//! This crate provides the runtime that executes [`CodeObject`]s:
//! - A stack-based default frame evaluator
//! - A replaceable frame-evaluation slot ([`FrameEvaluator`])
//! - A reentrant execution lock serializing all evaluation
//! - Frame local snapshots for code that inspects running frames
//!
//! # Example
//!
//! ```
//! use bytecode_system::{CodeBuilder, Opcode};
//! use core_types::{Function, Value};
//! use interpreter::Runtime;
//!
//! let mut builder = CodeBuilder::new("answer", &[]);
//! builder.load_constant(42).emit(Opcode::Return);
//! let answer = Value::Function(Function::new(builder.build()));
//!
//! let runtime = Runtime::new();
//! assert_eq!(runtime.call(&answer, vec![]).unwrap(), Value::Int(42));
//! ```
//!
//! [`CodeObject`]: bytecode_system::CodeObject

#![warn(missing_docs)]
#![warn(clippy::all)]

mod dispatch;
pub mod frame;
pub mod runtime;

// Re-export main types at crate root
pub use frame::{Frame, FrameLocals};
pub use runtime::{
    same_evaluator, EvaluatorRef, FrameEvaluator, Runtime, RuntimeConfig, DEFAULT_MAX_CALL_DEPTH,
};
