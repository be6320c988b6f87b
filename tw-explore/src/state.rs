use tw_interp::{Globals, Thread};

/// Externally-visible identity of a thread: which thread set it belongs to, and its index
/// within that set's replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ThreadId {
    pub set: usize,
    pub local: usize,
}

impl ThreadId {
    pub const fn new(set: usize, local: usize) -> Self {
        Self { set, local }
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.set, self.local)
    }
}

/// A vector of threads sharing one entry point (§3 Thread set). `entry_name` is the configured
/// thread name; replica display names (`name`, `name[0]`, `name[1]`, ...) are derived from it by
/// the harness at seeding time (§6), not stored per-thread here.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThreadSet {
    pub entry_name: String,
    pub threads: Vec<Thread>,
}

impl ThreadSet {
    pub fn new(entry_name: impl Into<String>, threads: Vec<Thread>) -> Self {
        Self { entry_name: entry_name.into(), threads }
    }

    /// The display name of replica `local`: bare `entry_name` for a singleton set, `entry_name[i]`
    /// otherwise (§6 entry-point seeding).
    pub fn display_name(&self, local: usize) -> String {
        if self.threads.len() == 1 {
            self.entry_name.clone()
        } else {
            format!("{}[{}]", self.entry_name, local)
        }
    }
}

/// The globals frame plus every thread set currently in play (§3 State).
///
/// Equality is structural; a state's identity for exploration purposes is its content hash
/// (computed over a [`crate::cas_entries::StoredState`] via the CAS), not this in-memory value —
/// two `State`s built through different code paths but with identical contents must hash equal
/// (§3 Invariant 4).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct State {
    pub globals: Globals,
    pub thread_sets: Vec<ThreadSet>,
}

impl State {
    pub fn new(globals: Globals, thread_sets: Vec<ThreadSet>) -> Self {
        Self { globals, thread_sets }
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.thread_sets.get(id.set)?.threads.get(id.local)
    }

    pub fn thread_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.thread_sets.get_mut(id.set)?.threads.get_mut(id.local)
    }

    /// Every thread in the state, paired with its id, in `(set, local)` order. This is the fixed
    /// iteration order successor generation and reporting rely on for determinism.
    pub fn threads(&self) -> impl Iterator<Item = (ThreadId, &Thread)> {
        self.thread_sets.iter().enumerate().flat_map(|(set, ts)| {
            ts.threads.iter().enumerate().map(move |(local, t)| (ThreadId::new(set, local), t))
        })
    }

    pub fn display_name(&self, id: ThreadId) -> Option<String> {
        self.thread_sets.get(id.set).map(|ts| ts.display_name(id.local))
    }

    /// True iff every thread in every set has finished (§4.3 deadlock/termination rules both
    /// special-case this: a deadlock is *not* this).
    pub fn all_finished(&self) -> bool {
        self.threads().all(|(_, t)| t.pause == tw_interp::PauseReason::Finished)
    }
}
