//! Runtime error types and error handling.
//!
//! Every evaluation path returns `Result<Value, RuntimeError>`. Errors raised
//! by user code, guards, compiler callbacks and the runtime itself all share
//! this type so they can propagate unchanged to the caller of a function.

use std::fmt;

use thiserror::Error;

use crate::source::StackFrame;

/// The kind of runtime error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation applied to a value of the wrong type
    TypeError,
    /// Reference to an undefined global
    NameError,
    /// Read of a local slot that holds no value
    UnboundLocalError,
    /// Missing attribute or method
    AttributeError,
    /// Call depth limit exceeded
    RecursionError,
    /// Exception raised explicitly by user code
    Exception,
    /// Internal engine error
    SystemError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::NameError => "NameError",
            ErrorKind::UnboundLocalError => "UnboundLocalError",
            ErrorKind::AttributeError => "AttributeError",
            ErrorKind::RecursionError => "RecursionError",
            ErrorKind::Exception => "Exception",
            ErrorKind::SystemError => "SystemError",
        };
        f.write_str(name)
    }
}

/// A runtime error with message and traceback.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, RuntimeError};
///
/// let error = RuntimeError::type_error("expected a code object");
/// assert_eq!(error.kind, ErrorKind::TypeError);
/// assert_eq!(error.to_string(), "TypeError: expected a code object");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Frames the error propagated through, innermost first
    pub traceback: Vec<StackFrame>,
}

impl RuntimeError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            traceback: Vec::new(),
        }
    }

    /// Create a `TypeError`
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Create a user-level `Exception`
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Exception, message)
    }

    /// Create a `SystemError`
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SystemError, message)
    }

    /// Record a frame the error is propagating through
    pub fn push_frame(&mut self, frame: StackFrame) {
        self.traceback.push(frame);
    }

    /// Same kind and message, ignoring the traceback
    pub fn same_error(&self, other: &RuntimeError) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

/// Result of evaluating code
pub type EvalResult<T = crate::Value> = Result<T, RuntimeError>;
