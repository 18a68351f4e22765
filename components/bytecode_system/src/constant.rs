//! Constant pool entries
//!
//! The bytecode crate sits below `core_types`, so literals are stored in
//! their own representation and converted to runtime values on load.

/// Literal value stored in a code object's constant pool
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// The none value
    None,
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// String literal
    Str(String),
}

impl From<i64> for Constant {
    fn from(n: i64) -> Self {
        Constant::Int(n)
    }
}

impl From<i32> for Constant {
    fn from(n: i32) -> Self {
        Constant::Int(i64::from(n))
    }
}

impl From<f64> for Constant {
    fn from(n: f64) -> Self {
        Constant::Float(n)
    }
}

impl From<bool> for Constant {
    fn from(b: bool) -> Self {
        Constant::Bool(b)
    }
}

impl From<&str> for Constant {
    fn from(s: &str) -> Self {
        Constant::Str(s.to_string())
    }
}
