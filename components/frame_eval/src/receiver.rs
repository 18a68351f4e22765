//! Detection of method calls on stateful receivers

use core_types::ObjectRef;
use interpreter::Frame;

/// The stateful receiver of a method call, if this frame is one
///
/// Looks for the first local called `receiver`. Dunder functions are never
/// treated as methods since their receiver may be half-initialized.
pub(crate) fn detect_instance(frame: &Frame, receiver: &str) -> Option<ObjectRef> {
    let code = frame.code();
    if code.is_dunder() {
        return None;
    }
    let slot = code.varnames().iter().position(|name| name == receiver)?;
    let obj = frame.local(slot)?.as_object()?;
    obj.class().is_stateful().then(|| obj.clone())
}
