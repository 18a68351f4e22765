//! Execution frames and local-variable snapshots

use std::sync::Arc;

use bytecode_system::CodeObject;
use core_types::{ErrorKind, RuntimeError, Value};
use indexmap::IndexMap;

/// One in-progress call: the code being run and its local slots
///
/// Slots follow the code object's `varnames` layout; `None` means the
/// local is unbound.
#[derive(Debug, Clone)]
pub struct Frame {
    code: Arc<CodeObject>,
    locals: Vec<Option<Value>>,
    pending: Option<RuntimeError>,
}

impl Frame {
    /// Create a frame with every local unbound
    pub fn new(code: Arc<CodeObject>) -> Self {
        let slots = code.local_count();
        Self {
            code,
            locals: vec![None; slots],
            pending: None,
        }
    }

    /// Create a frame binding positional arguments to parameters
    pub fn with_args(code: Arc<CodeObject>, args: Vec<Value>) -> Result<Self, RuntimeError> {
        if args.len() != code.arg_count() {
            return Err(RuntimeError::new(
                ErrorKind::TypeError,
                format!(
                    "{}() takes {} positional arguments but {} were given",
                    code.name(),
                    code.arg_count(),
                    args.len()
                ),
            ));
        }
        let mut frame = Self::new(code);
        for (slot, arg) in frame.locals.iter_mut().zip(args) {
            *slot = Some(arg);
        }
        Ok(frame)
    }

    /// The code this frame executes
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }

    /// All local slots in layout order
    pub fn locals(&self) -> &[Option<Value>] {
        &self.locals
    }

    /// Value bound in a slot
    pub fn local(&self, slot: usize) -> Option<&Value> {
        self.locals.get(slot).and_then(Option::as_ref)
    }

    /// Value bound to a local name
    pub fn local_by_name(&self, name: &str) -> Option<&Value> {
        self.code.local_index(name).and_then(|slot| self.local(slot))
    }

    /// Bind or unbind a slot
    ///
    /// # Errors
    ///
    /// `SystemError` if the slot lies beyond the code's layout.
    pub fn set_local(&mut self, slot: usize, value: Option<Value>) -> Result<(), RuntimeError> {
        let Some(target) = self.locals.get_mut(slot) else {
            return Err(RuntimeError::system(format!(
                "local slot {} out of range in '{}'",
                slot,
                self.code.name()
            )));
        };
        *target = value;
        Ok(())
    }

    /// Materialize the bound locals as a name-keyed snapshot
    pub fn locals_snapshot(&self) -> FrameLocals {
        let mut map = IndexMap::with_capacity(self.locals.len());
        for (name, value) in self.code.varnames().iter().zip(&self.locals) {
            if let Some(value) = value {
                map.insert(name.clone(), value.clone());
            }
        }
        FrameLocals(map)
    }

    /// Attach the exception being propagated through this frame
    pub fn set_pending(&mut self, error: RuntimeError) {
        self.pending = Some(error);
    }

    /// Take the exception being propagated through this frame
    pub fn take_pending(&mut self) -> Option<RuntimeError> {
        self.pending.take()
    }
}

/// Name-keyed snapshot of a frame's bound locals, in slot order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLocals(IndexMap<String, Value>);

impl FrameLocals {
    /// Value bound to a name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Whether the name is bound
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of bound locals
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no locals are bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over (name, value) pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for FrameLocals {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        FrameLocals(iter.into_iter().collect())
    }
}
