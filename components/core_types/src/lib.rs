//! Core runtime value types and error handling.
//!
//! This crate provides the foundational types shared by the interpreter and
//! the frame evaluation layer: value representation, the object model, and
//! runtime errors.
//!
//! # Overview
//!
//! - [`Value`] - Tagged representation of runtime values
//! - [`Class`], [`Object`], [`Function`], [`NativeFunction`] - Heap values
//! - [`RuntimeError`] - Errors with tracebacks
//! - [`ErrorKind`] - Types of runtime errors
//!
//! # Examples
//!
//! ```
//! use core_types::{Class, ErrorKind, Object, RuntimeError, Value};
//!
//! let class = Class::new("Counter").stateful(true).build();
//! let counter = Object::new(class);
//! counter.set_attr("n", Value::Int(0));
//! assert_eq!(counter.get_attr("n"), Some(Value::Int(0)));
//!
//! let error = RuntimeError::new(ErrorKind::NameError, "name 'x' is not defined");
//! assert_eq!(error.kind, ErrorKind::NameError);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod object;
mod source;
mod value;

pub use error::{ErrorKind, EvalResult, RuntimeError};
pub use object::{
    Class, ClassRef, Function, FunctionRef, NativeFunction, NativeRef, Object, ObjectRef,
    WeakObjectRef,
};
pub use source::StackFrame;
pub use value::Value;
