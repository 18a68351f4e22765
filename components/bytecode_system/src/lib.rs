//! Bytecode system for the runtime
//!
//! This crate provides the instruction set, constant pool representation and
//! code objects executed by the interpreter.
//!
//! # Features
//!
//! - Stack-based bytecode with named local slots
//! - Process-unique code identity tokens
//! - A builder for assembling code objects by hand or from a code generator
//!
//! # Example
//!
//! ```
//! use bytecode_system::{CodeBuilder, Opcode};
//!
//! let mut builder = CodeBuilder::new("add", &["x", "y"]);
//! builder.load_local("x").load_local("y");
//! builder.emit(Opcode::Add).emit(Opcode::Return);
//!
//! let code = builder.build();
//! assert_eq!(code.varnames(), &["x", "y"]);
//! assert_eq!(code.instructions().len(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod code;
pub mod constant;
pub mod opcode;

// Re-export main types at crate root
pub use code::{CodeBuilder, CodeId, CodeObject};
pub use constant::Constant;
pub use opcode::{LocalSlot, Opcode};
