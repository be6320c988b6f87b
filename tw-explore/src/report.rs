//! Structured output the explorer hands to the host: violation records and run statistics (§4.6).
//! No formatting lives here — the reporter interface is deliberately just data, per §1's
//! "Deliberately out of scope" boundary (terminal output formatting belongs to the excluded
//! front-end).

use tw_cas::Hash;

use crate::property::Operator;
use crate::state::ThreadId;

/// What kind of thing this violation record describes (§4.6). `Eventually` and `AlwaysEventually`
/// are carried alongside `Always`/`EventuallyAlways` even though §4.6's prose enumerates only
/// four of the six kinds in play — the source spec names both operators explicitly as trace-wise
/// checks (§4.5) and gives no reason the other two would be silently unreported; adding the
/// missing variants is documented as a resolved gap in `DESIGN.md`. `InitialState` is a
/// `SUPPLEMENTED` kind of its own: an `Always` violation discovered in the seed state, before any
/// thread has run, has no "thread that just ran" to attribute it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ViolationKind {
    Always,
    Eventually,
    EventuallyAlways,
    AlwaysEventually,
    Deadlock,
    Termination,
    Stutter,
    InitialState,
}

impl From<Operator> for ViolationKind {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Always => ViolationKind::Always,
            Operator::Eventually => ViolationKind::Eventually,
            Operator::EventuallyAlways => ViolationKind::EventuallyAlways,
            Operator::AlwaysEventually => ViolationKind::AlwaysEventually,
        }
    }
}

/// One step of a reconstructed trace: which thread ran, and the hash of the state that resulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TraceStep {
    pub thread: ThreadId,
    pub state: Hash,
}

/// A single verification failure, fully self-contained: the host retrieves and renders states
/// via the CAS using `final_state` and the hashes embedded in `trace` (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    pub property: Option<String>,
    pub kind: ViolationKind,
    pub thread: Option<ThreadId>,
    pub thread_name: Option<String>,
    pub depth: usize,
    pub state_number: usize,
    pub trace: Vec<TraceStep>,
    pub final_state: Hash,
}

/// A livelock warning (§4.4): advisory, never a violation in its own right.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LivelockWarning {
    pub weak_hash: Hash,
    pub depths: Vec<usize>,
    pub first_state: Hash,
    pub current_state: Hash,
}

/// Aggregate counters reported alongside violations (§4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub total_transitions: usize,
    pub unique_states: usize,
    pub duplicates: usize,
    pub max_depth: usize,
    pub violation_count: usize,
    pub livelock_count: usize,
    /// `true` iff exploration stopped because `max-depth` was reached while unexplored
    /// successors remained, rather than because the frontier was exhausted (§6 flags,
    /// `SUPPLEMENTED FEATURE` per `SPEC_FULL.md`). Not a violation: a bounded exploration budget
    /// being reached is expected, not a programmer error.
    pub depth_limited: bool,
}

/// Everything one verification run produces: the ordered violation list plus statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub violations: Vec<Violation>,
    pub livelocks: Vec<LivelockWarning>,
    pub stats: Stats,
}
