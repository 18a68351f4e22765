//! Frame-evaluation interception layer
//!
//! This crate sits in a [`Runtime`](interpreter::Runtime)'s evaluator slot
//! and lets a compiler substitute guarded replacement code for function
//! bodies:
//! - Per-thread dispatch modes ([`DispatchMode`])
//! - Refcounted hook installation that chains to any previous evaluator
//! - Guarded code chains per function, optionally per stateful receiver
//! - Guard evaluation with most-recently-matched promotion
//! - Shadow frames re-running replacement code on remapped locals
//! - Compiler-owned dynamic state that survives recompilation
//!
//! # Example
//!
//! ```
//! use bytecode_system::{CodeBuilder, Opcode};
//! use core_types::{Function, Value};
//! use frame_eval::{compiler, guard, CompileOutcome, FrameEval, GuardedCode};
//! use interpreter::Runtime;
//!
//! // def square(x): return x * x
//! let mut builder = CodeBuilder::new("square", &["x"]);
//! builder.load_local("x").load_local("x").emit(Opcode::Mul).emit(Opcode::Return);
//! let code = builder.build();
//! let square = Value::Function(Function::new(code.clone()));
//!
//! let runtime = Runtime::new();
//! let layer = FrameEval::new();
//! layer.enable(
//!     &runtime,
//!     compiler(|request| {
//!         // Specialize on small ints: return the constant 0 for x == 0.
//!         let mut fast = request.code.derive();
//!         fast.load_constant(0).emit(Opcode::Return);
//!         let zero = guard(|locals| Ok(locals.get("x") == Some(&Value::Int(0))));
//!         Ok(CompileOutcome::Compiled(GuardedCode::new(zero, fast.build())))
//!     }),
//! );
//!
//! assert_eq!(runtime.call(&square, vec![Value::Int(0)]).unwrap(), Value::Int(0));
//! assert_eq!(layer.cache_entries(&code, None).len(), 1);
//! layer.disable(&runtime);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod callback;
pub mod config;
mod eval;
mod extra;
mod hook;
pub mod hooks;
mod install;
mod instance_map;
mod lookup;
pub mod mode;
mod receiver;
mod shadow;
pub mod state;

// Re-export main types at crate root
pub use cache::{guard, CacheEntry, EntryId, Guard, GuardRef, GuardedCode};
pub use callback::{compiler, CallbackRef, CompileOutcome, CompileRequest, CompilerCallback};
pub use config::FrameEvalConfig;
pub use extra::SlotKind;
pub use hook::FrameEval;
pub use hooks::{guard_hook, GuardFailure, GuardHook, SpanHooks};
pub use mode::DispatchMode;
pub use state::DynamicState;
