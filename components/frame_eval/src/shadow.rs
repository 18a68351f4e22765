//! Shadow frames: running replacement code against an existing frame
//!
//! Replacement code may reorder locals or add new ones, but must keep every
//! local of the code it replaces. Values are carried over by name.

use std::sync::Arc;

use bytecode_system::CodeObject;
use core_types::{EvalResult, RuntimeError};
use interpreter::{EvaluatorRef, Frame, Runtime};
use rustc_hash::FxHashMap;

/// Check that `replacement` has a slot for every local of `original`
pub(crate) fn check_layout(original: &CodeObject, replacement: &CodeObject) -> Result<(), RuntimeError> {
    match original
        .varnames()
        .iter()
        .find(|name| replacement.local_index(name).is_none())
    {
        Some(name) => Err(RuntimeError::system(format!(
            "replacement for '{}' has no slot for local '{}'",
            original.name(),
            name
        ))),
        None => Ok(()),
    }
}

/// Build a frame for `replacement` holding the original frame's locals
///
/// # Panics
///
/// If `replacement` lacks a local of the original code. Layouts are checked
/// with [`check_layout`] before an entry is accepted.
pub(crate) fn build(original: &Frame, replacement: &Arc<CodeObject>) -> Result<Frame, RuntimeError> {
    let slots: FxHashMap<&str, usize> = replacement
        .varnames()
        .iter()
        .enumerate()
        .map(|(slot, name)| (name.as_str(), slot))
        .collect();
    let mut shadow = Frame::new(replacement.clone());
    for (name, value) in original.code().varnames().iter().zip(original.locals()) {
        let Some(&slot) = slots.get(name.as_str()) else {
            panic!(
                "replacement code '{}' lost local '{}' of '{}'",
                replacement.name(),
                name,
                original.code().name()
            );
        };
        shadow.set_local(slot, value.clone())?;
    }
    Ok(shadow)
}

/// Run replacement code through the default evaluation path
pub(crate) fn run(
    runtime: &Runtime,
    fallback: Option<EvaluatorRef>,
    original: &Frame,
    replacement: &Arc<CodeObject>,
) -> EvalResult {
    let mut shadow = build(original, replacement)?;
    match fallback {
        Some(evaluator) => evaluator.eval_frame(runtime, &mut shadow, false),
        None => runtime.eval_frame_default(&mut shadow, false),
    }
}
