//! Bytecode opcodes for the stack-based evaluator
//!
//! Locals are addressed by slot index into the owning code object's
//! `varnames` table, so a frame's layout is fully described by its code.

/// Local variable slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalSlot(pub u32);

/// Bytecode opcodes
#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // Literals
    /// Load constant from constant pool at given index
    LoadConstant(usize),
    /// Load the none value
    LoadNone,

    // Variables
    /// Load local variable from slot (raises if unbound)
    LoadLocal(LocalSlot),
    /// Store to local variable slot
    StoreLocal(LocalSlot),
    /// Unbind a local variable slot
    DeleteLocal(LocalSlot),
    /// Load global variable by name
    LoadGlobal(String),
    /// Store to global variable by name
    StoreGlobal(String),

    // Attributes
    /// Load attribute from the object on top of stack
    LoadAttr(String),
    /// Store attribute: object is second-top, value is top
    StoreAttr(String),

    // Arithmetic operations
    /// Add top two stack values
    Add,
    /// Subtract top from second-top
    Sub,
    /// Multiply top two stack values
    Mul,
    /// Logical NOT (invert truthiness)
    Not,

    // Comparison operations
    /// Equality (==)
    Equal,
    /// Less than (<)
    LessThan,

    // Control flow
    /// Unconditional jump to offset
    Jump(usize),
    /// Jump to offset if top of stack is falsy (pops the condition)
    JumpIfFalse(usize),
    /// Return from current function
    Return,

    // Calls
    /// Call function with given number of arguments
    Call(u8),
    /// Call a method looked up on the receiver's class; receiver is passed
    /// as the first argument
    CallMethod(String, u8),

    // Exceptions
    /// Pop value from stack and raise it as an exception
    Raise,

    // Stack
    /// Pop value from stack
    Pop,
    /// Duplicate top value on stack
    Dup,
}
