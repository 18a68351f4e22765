//! Per-call flow of the frame hook

use core_types::{EvalResult, RuntimeError};
use interpreter::{Frame, FrameEvaluator, Runtime};
use tracing::{trace, warn};

use crate::cache::CacheEntry;
use crate::callback::{CompileOutcome, CompileRequest};
use crate::extra::SlotKind;
use crate::hook::FrameEval;
use crate::lookup::{lookup, LookupOutcome};
use crate::mode::DispatchMode;
use crate::{receiver, shadow};

impl FrameEvaluator for FrameEval {
    fn eval_frame(&self, runtime: &Runtime, frame: &mut Frame, throw_flag: bool) -> EvalResult {
        let mode = self.modes.effective();
        // Unwinding re-entry only propagates the pending exception.
        if mode.is_disabled() || throw_flag {
            return self.eval_default(runtime, frame, throw_flag);
        }

        let code = frame.code().clone();
        let run_only = mode.callback().is_none();
        // The store lock must be released before any evaluation re-enters.
        let kind = self.store.lock().slot_kind(code.id());
        match kind {
            SlotKind::Skip => {
                trace!(name = code.name(), "skipped function");
                return self.eval_default(runtime, frame, false);
            }
            SlotKind::Empty if run_only => return self.eval_default(runtime, frame, false),
            _ => {}
        }

        let locals = frame.locals_snapshot();
        let instance = if self.config.instance_partitioning {
            receiver::detect_instance(frame, &self.config.receiver_name)
        } else {
            None
        };
        let entries = self.store.lock().entries(code.id(), instance.as_ref());
        if entries.is_empty() && run_only {
            return self.eval_default(runtime, frame, false);
        }

        let suspended = self.modes.suspend();
        let hooks = self.hooks.read().clone();
        let walk = || lookup(&entries, &locals, &hooks);
        let outcome = match &hooks.span {
            Some(span) => span.bracket(&self.config.lookup_span_name, walk),
            None => walk(),
        }?;

        if let LookupOutcome::Hit { index, entry } = outcome {
            if index > 0 {
                self.store
                    .lock()
                    .promote(code.id(), instance.as_ref(), entry.id());
            }
            drop(suspended);
            trace!(name = code.name(), index, "cache hit");
            return self.run_replacement(runtime, frame, &entry);
        }

        let callback = match &mode {
            DispatchMode::Active(callback) => callback,
            _ => {
                drop(suspended);
                trace!(name = code.name(), "cache miss in run-only mode");
                return self.eval_default(runtime, frame, false);
            }
        };

        trace!(name = code.name(), cache_size = entries.len(), "cache miss, compiling");
        let state = self.store.lock().state_or_create(&code, instance.as_ref());
        let request = CompileRequest {
            code: &code,
            locals: &locals,
            instance: instance.as_ref(),
            cache_size: entries.len(),
            state: &state,
        };
        let result = callback.compile(&request);
        drop(suspended);

        match result {
            Err(error) => {
                self.fail_stop(runtime, &error);
                Err(error)
            }
            Ok(CompileOutcome::Skip) => {
                trace!(name = code.name(), "compiler declined");
                self.store.lock().mark_skip(&code);
                self.eval_default(runtime, frame, false)
            }
            Ok(CompileOutcome::Compiled(compiled)) => {
                if let Err(error) = shadow::check_layout(&code, &compiled.code) {
                    self.fail_stop(runtime, &error);
                    return Err(error);
                }
                let entry = CacheEntry::new(compiled);
                self.store
                    .lock()
                    .prepend(&code, instance.as_ref(), entry.clone());
                trace!(name = code.name(), "replacement cached");
                self.run_replacement(runtime, frame, &entry)
            }
        }
    }
}

impl FrameEval {
    /// Run the frame on whatever evaluator preceded the hook
    fn eval_default(&self, runtime: &Runtime, frame: &mut Frame, throw_flag: bool) -> EvalResult {
        match self.installer.previous() {
            Some(previous) => previous.eval_frame(runtime, frame, throw_flag),
            None => runtime.eval_frame_default(frame, throw_flag),
        }
    }

    fn run_replacement(&self, runtime: &Runtime, frame: &Frame, entry: &CacheEntry) -> EvalResult {
        shadow::run(runtime, self.installer.previous(), frame, entry.code())
    }

    /// Turn interception off for the calling thread after a compiler failure
    fn fail_stop(&self, runtime: &Runtime, error: &RuntimeError) {
        warn!(%error, "compiler callback failed, disabling frame interception on this thread");
        let prior = self.modes.replace(DispatchMode::Disabled);
        if !prior.is_disabled() {
            self.installer.decrement(runtime);
        }
    }
}
