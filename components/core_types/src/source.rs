//! Stack frame records for error tracebacks.

use std::fmt;

/// Represents a single frame in an error traceback.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame::new("forward", 4);
/// assert_eq!(frame.function_name, "forward");
/// assert_eq!(frame.to_string(), "forward@4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Name of the function
    pub function_name: String,
    /// Instruction offset at which the error left the frame
    pub offset: usize,
}

impl StackFrame {
    /// Create a new traceback frame
    pub fn new(function_name: impl Into<String>, offset: usize) -> Self {
        Self {
            function_name: function_name.into(),
            offset,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.function_name, self.offset)
    }
}
