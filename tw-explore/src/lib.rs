//! State model, canonicaliser, content-addressable persistence, successor generation, temporal
//! evaluation and the BFS explorer that ties them together.
//!
//! This crate owns everything in Timewinder that is aware of *more than one* interleaving: a
//! [`tw_interp::Thread`] only knows how to run itself forward to its next pause point; this crate
//! decides which thread runs next, what a "state" is, when two states are the same state, and
//! whether the resulting graph satisfies the configured properties (§3, §4).

mod canon;
mod cas_entries;
mod config;
mod cycle;
mod errors;
mod explorer;
mod livelock;
mod parallel;
mod property;
mod report;
mod state;
mod succ;
mod trace_eval;
mod work;

pub use canon::{canonicalize, is_canonical};
pub use cas_entries::{decode_value, encode_value, get_state, put_state};
pub use config::ExploreConfig;
pub use errors::ExploreError;
pub use explorer::explore;
pub use livelock::{weak_hash, WeakStateLog};
pub use parallel::{explore_parallel, DEFAULT_WORKERS};
pub use property::{
    always_eventually_holds_cyclic, always_eventually_holds_terminating, eventually_always_holds,
    eventually_always_holds_cyclic, eventually_holds, evaluate, Operator, Property, PropertyError, PropertySet,
};
pub use report::{LivelockWarning, RunReport, Stats, TraceStep, Violation, ViolationKind};
pub use state::{State, ThreadId, ThreadSet};
pub use succ::{advance, eligible_threads};
pub use work::Thunk;
