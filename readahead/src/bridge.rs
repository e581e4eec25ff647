use crate::{reader::State, refill::Outcome, Scheduler};
use std::sync::{Mutex, Weak};
use tracing::trace;

/// Marshals a refill outcome back onto the owner execution context.
///
/// The bridge is the single synchronization point of the design: everywhere
/// else, state is either exclusively held by the background task (the
/// buffer) or exclusively mutated on the owner context (the slot and the
/// pending request). It holds only a weak back-reference to the reader's
/// state, so a completion that outlives the reader is discarded instead of
/// being delivered to a destroyed coordinator. Each refill is tagged with the
/// generation it was dispatched under; a completion whose generation was
/// superseded by [crate::Reader::abort] is likewise discarded.
pub(crate) struct CompletionBridge<S: Scheduler> {
    state: Weak<Mutex<State>>,
    scheduler: S,
    generation: u64,
}

impl<S: Scheduler> CompletionBridge<S> {
    pub fn new(state: Weak<Mutex<State>>, scheduler: S, generation: u64) -> Self {
        Self {
            state,
            scheduler,
            generation,
        }
    }

    /// Schedules delivery of `outcome` on the owner context.
    ///
    /// Called from the background task once its read finishes. The deferred
    /// task revalidates the reader before completing the pending request.
    pub fn deliver(self, outcome: Outcome) {
        let Self {
            state,
            scheduler,
            generation,
        } = self;
        scheduler.defer(Box::new(move || {
            let Some(state) = state.upgrade() else {
                trace!("reader dropped, discarding completion");
                return;
            };
            State::complete(&state, generation, outcome);
        }));
    }
}
