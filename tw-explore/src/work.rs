//! The explorer's unit of work (§3 Thunk / Work item): a state, which thread to run next, and the
//! trace recorded so far. Owned exclusively by the explorer's queues — nothing else in this crate
//! holds one for longer than it takes to process it.

use tw_cas::Hash;

use crate::report::TraceStep;
use crate::state::{State, ThreadId};

/// One pending transition: `state` is where we are, `thread` is which thread the explorer has
/// chosen to advance, `trace` is every `{thread ran, predecessor hash}` step recorded on the path
/// from the initial state to here (§3). `initial_hash` is the hash of the run's seed state itself,
/// which `trace` does not carry — true-cycle detection (§4.3) needs the complete path including
/// the state the run started from, not just the transitions since then.
#[derive(Debug, Clone)]
pub struct Thunk {
    pub state: State,
    pub thread: ThreadId,
    pub depth: usize,
    pub initial_hash: Hash,
    pub trace: Vec<TraceStep>,
}

impl Thunk {
    pub fn new(state: State, thread: ThreadId, depth: usize, initial_hash: Hash, trace: Vec<TraceStep>) -> Self {
        Self { state, thread, depth, initial_hash, trace }
    }

    /// The full path trail from the initial state to here, in order: the seed hash first, then
    /// every transition hash recorded since.
    pub fn path_trail(&self) -> impl Iterator<Item = Hash> + '_ {
        std::iter::once(self.initial_hash).chain(self.trace.iter().map(|step| step.state))
    }
}
