//! Code objects - compiled function bodies
//!
//! A code object carries its instructions, constants and the names of its
//! local slots. Every code object gets a process-unique [`CodeId`] that
//! serves as its identity token for out-of-band per-function state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::constant::Constant;
use crate::opcode::{LocalSlot, Opcode};

/// Stable identity token for a code object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeId(u64);

impl CodeId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        CodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code#{}", self.0)
    }
}

/// A compiled function body
///
/// Immutable once built; shared as `Arc<CodeObject>`.
#[derive(Debug, PartialEq)]
pub struct CodeObject {
    id: CodeId,
    name: String,
    arg_count: usize,
    varnames: Vec<String>,
    constants: Vec<Constant>,
    instructions: Vec<Opcode>,
}

impl CodeObject {
    /// Identity token of this code object
    pub fn id(&self) -> CodeId {
        self.id
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of positional parameters (the first `arg_count` varnames)
    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    /// Names of all local slots, parameters first
    pub fn varnames(&self) -> &[String] {
        &self.varnames
    }

    /// Number of local slots
    pub fn local_count(&self) -> usize {
        self.varnames.len()
    }

    /// Slot index of the local with the given name
    pub fn local_index(&self, name: &str) -> Option<usize> {
        self.varnames.iter().position(|v| v == name)
    }

    /// Constant pool
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Instruction stream
    pub fn instructions(&self) -> &[Opcode] {
        &self.instructions
    }

    /// Whether the name follows the `__name__` lifecycle convention
    pub fn is_dunder(&self) -> bool {
        self.name.starts_with("__")
    }

    /// Start a builder pre-populated with this code object's name and slots
    ///
    /// Instructions and constants are not copied; the result is a new code
    /// object with its own identity.
    pub fn derive(&self) -> CodeBuilder {
        CodeBuilder {
            name: self.name.clone(),
            arg_count: self.arg_count,
            varnames: self.varnames.clone(),
            constants: Vec::new(),
            instructions: Vec::new(),
        }
    }
}

/// Incremental builder for [`CodeObject`]
#[derive(Debug, Clone)]
pub struct CodeBuilder {
    name: String,
    arg_count: usize,
    varnames: Vec<String>,
    constants: Vec<Constant>,
    instructions: Vec<Opcode>,
}

impl CodeBuilder {
    /// Create a builder for a function taking the given parameters
    pub fn new(name: impl Into<String>, params: &[&str]) -> Self {
        let mut builder = Self {
            name: name.into(),
            arg_count: 0,
            varnames: Vec::with_capacity(params.len()),
            constants: Vec::new(),
            instructions: Vec::new(),
        };
        for param in params {
            builder.add_local(param);
        }
        builder.arg_count = builder.varnames.len();
        builder
    }

    /// Add a local slot and return its index
    ///
    /// Names are interned: adding an existing name returns its slot.
    pub fn add_local(&mut self, name: &str) -> LocalSlot {
        if let Some(idx) = self.varnames.iter().position(|v| v == name) {
            return LocalSlot(idx as u32);
        }
        self.varnames.push(name.to_string());
        LocalSlot((self.varnames.len() - 1) as u32)
    }

    /// Move a local to the front of the non-parameter slots
    ///
    /// Used by code generators that place temporaries ahead of user locals,
    /// typically straight after [`CodeObject::derive`].
    ///
    /// # Panics
    ///
    /// If instructions were already emitted: shifting the existing locals
    /// would leave their slot operands pointing at the wrong variable.
    pub fn insert_local_front(&mut self, name: &str) -> LocalSlot {
        if let Some(idx) = self.varnames.iter().position(|v| v == name) {
            return LocalSlot(idx as u32);
        }
        assert!(
            self.instructions.is_empty(),
            "cannot insert local '{}' into '{}' after instructions were emitted",
            name,
            self.name
        );
        self.varnames.insert(self.arg_count, name.to_string());
        LocalSlot(self.arg_count as u32)
    }

    /// Slot index of an already-declared local
    pub fn slot(&self, name: &str) -> Option<LocalSlot> {
        self.varnames
            .iter()
            .position(|v| v == name)
            .map(|idx| LocalSlot(idx as u32))
    }

    /// Add a constant to the constant pool and return its index
    pub fn add_constant(&mut self, value: impl Into<Constant>) -> usize {
        self.constants.push(value.into());
        self.constants.len() - 1
    }

    /// Emit an instruction
    pub fn emit(&mut self, opcode: Opcode) -> &mut Self {
        self.instructions.push(opcode);
        self
    }

    /// Offset of the next emitted instruction
    pub fn next_offset(&self) -> usize {
        self.instructions.len()
    }

    /// Rewrite the jump target of a previously emitted jump
    pub fn patch_jump(&mut self, at: usize, target: usize) {
        match self.instructions.get_mut(at) {
            Some(Opcode::Jump(t)) | Some(Opcode::JumpIfFalse(t)) => *t = target,
            _ => {}
        }
    }

    /// Emit `LoadConstant` for a fresh constant
    pub fn load_constant(&mut self, value: impl Into<Constant>) -> &mut Self {
        let idx = self.add_constant(value);
        self.emit(Opcode::LoadConstant(idx))
    }

    /// Emit `LoadLocal` for a named local, declaring it if needed
    pub fn load_local(&mut self, name: &str) -> &mut Self {
        let slot = self.add_local(name);
        self.emit(Opcode::LoadLocal(slot))
    }

    /// Emit `StoreLocal` for a named local, declaring it if needed
    pub fn store_local(&mut self, name: &str) -> &mut Self {
        let slot = self.add_local(name);
        self.emit(Opcode::StoreLocal(slot))
    }

    /// Finish the code object
    pub fn build(self) -> Arc<CodeObject> {
        Arc::new(CodeObject {
            id: CodeId::next(),
            name: self.name,
            arg_count: self.arg_count,
            varnames: self.varnames,
            constants: self.constants,
            instructions: self.instructions,
        })
    }
}
