//! Heap object model: classes, instances and callables.
//!
//! All heap values are shared through `Arc` so they can cross threads; the
//! runtime's execution lock serializes mutation of instance attributes, the
//! per-object mutex only keeps the types `Sync`.

use std::fmt;
use std::sync::{Arc, Weak};

use bytecode_system::CodeObject;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::RuntimeError;
use crate::value::Value;

/// Shared handle to an instance
pub type ObjectRef = Arc<Object>;
/// Weak handle to an instance
pub type WeakObjectRef = Weak<Object>;
/// Shared handle to a class
pub type ClassRef = Arc<Class>;
/// Shared handle to an interpreted function
pub type FunctionRef = Arc<Function>;
/// Shared handle to a native function
pub type NativeRef = Arc<NativeFunction>;

/// A class: a name, a method table and a statefulness flag
///
/// Instances of stateful classes carry per-instance state that compiled code
/// may specialize on, so cached code for their methods is kept per instance.
#[derive(Debug)]
pub struct Class {
    name: String,
    stateful: bool,
    methods: FxHashMap<String, Value>,
}

impl Class {
    /// Create a plain class without methods
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stateful: false,
            methods: FxHashMap::default(),
        }
    }

    /// Mark the class as stateful
    pub fn stateful(mut self, stateful: bool) -> Self {
        self.stateful = stateful;
        self
    }

    /// Add a method
    pub fn with_method(mut self, name: impl Into<String>, method: Value) -> Self {
        self.methods.insert(name.into(), method);
        self
    }

    /// Finish the class
    pub fn build(self) -> ClassRef {
        Arc::new(self)
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instances hold specializable state
    pub fn is_stateful(&self) -> bool {
        self.stateful
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&Value> {
        self.methods.get(name)
    }
}

/// An instance of a class
pub struct Object {
    class: ClassRef,
    attrs: Mutex<FxHashMap<String, Value>>,
}

impl Object {
    /// Allocate a new instance of the class
    pub fn new(class: ClassRef) -> ObjectRef {
        Arc::new(Self {
            class,
            attrs: Mutex::new(FxHashMap::default()),
        })
    }

    /// The instance's class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Read an attribute, falling back to the class's methods
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.attrs.lock().get(name) {
            return Some(value.clone());
        }
        self.class.method(name).cloned()
    }

    /// Write an instance attribute
    pub fn set_attr(&self, name: impl Into<String>, value: Value) {
        self.attrs.lock().insert(name.into(), value);
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object at {:p}>", self.class.name, self)
    }
}

/// An interpreted function: a name bound to a code object
#[derive(Debug)]
pub struct Function {
    name: String,
    code: Arc<CodeObject>,
}

impl Function {
    /// Create a function for the given code
    pub fn new(code: Arc<CodeObject>) -> FunctionRef {
        Arc::new(Self {
            name: code.name().to_string(),
            code,
        })
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The code executed when the function is called
    pub fn code(&self) -> &Arc<CodeObject> {
        &self.code
    }
}

type NativeFn = dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync;

/// A function implemented in Rust
pub struct NativeFunction {
    name: String,
    func: Box<NativeFn>,
}

impl NativeFunction {
    /// Wrap a Rust closure as a callable value
    pub fn new<F>(name: impl Into<String>, func: F) -> NativeRef
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            name: name.into(),
            func: Box::new(func),
        })
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native function {}>", self.name)
    }
}
