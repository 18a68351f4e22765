//! Runtime value representation.
//!
//! Primitive values are stored inline; heap values are shared handles whose
//! equality is identity.

use std::fmt;
use std::sync::Arc;

use bytecode_system::Constant;

use crate::object::{FunctionRef, NativeRef, ObjectRef};

/// Represents any runtime value.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let none = Value::None;
/// let number = Value::Int(42);
///
/// assert!(!none.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(number.type_name(), "int");
/// ```
#[derive(Clone)]
pub enum Value {
    /// The none value
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// IEEE 754 double-precision floating point
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Class instance
    Object(ObjectRef),
    /// Interpreted function
    Function(FunctionRef),
    /// Native function
    Native(NativeRef),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Float(n) => f.debug_tuple("Float").field(n).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Object(obj) => write!(f, "{:?}", obj),
            Value::Function(func) => write!(f, "<function {}>", func.name()),
            Value::Native(func) => write!(f, "{:?}", func),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Create a string value
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Returns whether this value is truthy.
    ///
    /// `None`, `false`, zero and the empty string are falsy; every heap
    /// value is truthy.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert!(!Value::None.is_truthy());
    /// assert!(!Value::Int(0).is_truthy());
    /// assert!(!Value::str("").is_truthy());
    /// assert!(Value::Float(0.5).is_truthy());
    /// ```
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => !n.is_nan() && *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    /// Name of the value's type, used in error messages
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Object(obj) => obj.class().name(),
            Value::Function(_) => "function",
            Value::Native(_) => "builtin_function",
        }
    }

    /// Whether the value can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// The instance handle, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The integer payload, if this is an int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&Constant> for Value {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::None => Value::None,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(n) => Value::Int(*n),
            Constant::Float(n) => Value::Float(*n),
            Constant::Str(s) => Value::str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<FunctionRef> for Value {
    fn from(func: FunctionRef) -> Self {
        Value::Function(func)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            other => write!(f, "{:?}", other),
        }
    }
}
