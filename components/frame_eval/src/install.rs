//! Installation of the frame hook into a runtime's evaluator slot
//!
//! The hook is installed while at least one thread has a mode other than
//! `Disabled`. Whatever evaluator occupied the slot before is saved, used as
//! the hook's fallback, and put back when the last thread disables.

use interpreter::{same_evaluator, EvaluatorRef, Runtime};
use parking_lot::Mutex;
use tracing::debug;

#[derive(Default)]
struct InstallState {
    active_threads: usize,
    previous: Option<EvaluatorRef>,
}

#[derive(Default)]
pub(crate) struct HookInstaller {
    state: Mutex<InstallState>,
}

impl HookInstaller {
    /// A thread left `Disabled`
    pub(crate) fn increment(&self, runtime: &Runtime, hook: EvaluatorRef) {
        let mut state = self.state.lock();
        if state.active_threads == 0 {
            let current = runtime.eval_frame_func();
            let installed = current.as_ref().is_some_and(|c| same_evaluator(c, &hook));
            if !installed {
                state.previous = runtime.set_eval_frame_func(Some(hook));
                debug!(chained = state.previous.is_some(), "frame hook installed");
            }
        }
        state.active_threads += 1;
    }

    /// A thread returned to `Disabled`
    pub(crate) fn decrement(&self, runtime: &Runtime) {
        let mut state = self.state.lock();
        if state.active_threads == 0 {
            return;
        }
        state.active_threads -= 1;
        if state.active_threads == 0 {
            let previous = state.previous.take();
            debug!(chained = previous.is_some(), "frame hook uninstalled");
            runtime.set_eval_frame_func(previous);
        }
    }

    /// Evaluator that was in the slot before the hook
    pub(crate) fn previous(&self) -> Option<EvaluatorRef> {
        self.state.lock().previous.clone()
    }

    pub(crate) fn active_threads(&self) -> usize {
        self.state.lock().active_threads
    }
}
