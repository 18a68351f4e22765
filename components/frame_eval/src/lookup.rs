//! Guard evaluation over a cache chain

use core_types::EvalResult;
use interpreter::FrameLocals;

use crate::cache::CacheEntry;
use crate::hooks::{GuardFailure, LookupHooks};

/// Result of walking a chain
#[derive(Debug)]
pub(crate) enum LookupOutcome {
    /// First entry whose guard held, and its position
    Hit { index: usize, entry: CacheEntry },
    /// No guard held
    Miss,
}

/// Evaluate guards in chain order
///
/// A rejection is reported to the fail hook and the walk continues; a guard
/// error is reported to the error hook and ends the walk. A hook's own error
/// replaces whatever the walk would have returned.
pub(crate) fn lookup(
    entries: &[CacheEntry],
    locals: &FrameLocals,
    hooks: &LookupHooks,
) -> EvalResult<LookupOutcome> {
    let last = entries.len().saturating_sub(1);
    for (index, entry) in entries.iter().enumerate() {
        let failure = || GuardFailure {
            guard: entry.guard(),
            code: entry.code(),
            locals,
            index,
            is_last: index == last,
        };
        match entry.guard().check(locals) {
            Ok(true) => {
                return Ok(LookupOutcome::Hit {
                    index,
                    entry: entry.clone(),
                })
            }
            Ok(false) => {
                if let Some(hook) = &hooks.fail {
                    hook(&failure())?;
                }
            }
            Err(error) => {
                if let Some(hook) = &hooks.error {
                    hook(&failure())?;
                }
                return Err(error);
            }
        }
    }
    Ok(LookupOutcome::Miss)
}
