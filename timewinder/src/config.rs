//! Plain-struct configuration shapes (§6 "Configuration (from loader)"): what a front-end/config
//! loader hands the core once it has parsed and compiled everything itself. Nothing in this
//! module parses source text or TOML — these are `serde::Deserialize` purely so a loader can
//! deserialize a config file directly into them, the way `tw_interp::ExecutionOptions` is a plain
//! struct a caller builds rather than something the interpreter reads from disk.

use tw_explore::Operator;
use tw_interp::ExecutionOptions;
use tw_value::{ExecPtr, Value};

/// One configured thread entry (§6): `entry` is the already-compiled call-frame address the
/// front-end produced for the entry expression — the core never parses or compiles it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThreadConfig {
    pub name: String,
    pub entry: ExecPtr,
    /// Number of replicas to spawn into this thread's set (§6 entry-point seeding); `1` produces
    /// a bare `name`, anything greater produces `name[0]`, `name[1]`, ...
    pub replicas: usize,
    /// Weak-fairness obligation applied to every replica (§3 Thread).
    pub fair: bool,
    /// Strong-fairness obligation applied to every replica (§3 Thread).
    pub strong_fair: bool,
}

/// One configured temporal property (§6): `entry` is the already-compiled bytecode address of
/// the property expression.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PropertyConfig {
    pub name: String,
    pub operator: Operator,
    pub entry: ExecPtr,
}

/// Run-wide switches (§6 `flags`). `show_details` is carried through for the loader/front-end's
/// own use (how much of a violation's trace to render) — the core never inspects it.
///
/// `workers`: `None` runs the serial engine; `Some(n)` runs the parallel engine with `n` worker
/// threads (`SUPPLEMENTED`: §5 describes both a single-threaded and a parallel engine but §6's
/// configuration row has no field selecting between them — a front-end has to be able to ask for
/// one or the other, so this flag is the switch). `Some(0)` is treated the same as `Some(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Flags {
    pub keep_going: bool,
    pub no_deadlocks: bool,
    pub termination: bool,
    pub max_depth: Option<usize>,
    pub show_details: bool,
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for Flags {
    fn default() -> Self {
        Self { keep_going: false, no_deadlocks: false, termination: false, max_depth: None, show_details: false, workers: None }
    }
}

/// The full shape of §6's "Configuration (from loader)" row, minus `program` itself — `run` takes
/// the compiled `Program` as its own argument rather than embedding it here, since the program and
/// its run configuration have independent lifetimes in a host that re-runs the same program under
/// several configurations.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunConfig {
    pub threads: Vec<ThreadConfig>,
    pub properties: Vec<PropertyConfig>,
    pub flags: Flags,
    /// Interpreter limits (call depth, steps per atomic region). Not named in §6's configuration
    /// row — the source spec treats these as interpreter-internal constants — but the teacher
    /// workspace always lets a caller override its execution options rather than hard-coding them,
    /// so this is carried as an optional override with `ExecutionOptions::default()` otherwise.
    #[serde(default)]
    pub execution_options: ExecutionOptions,
    /// Global bindings present before any thread takes its first step, already evaluated to
    /// values by the front-end (§6: the core never evaluates source expressions itself).
    ///
    /// `SUPPLEMENTED`: §6's configuration row has no field for this, but it is load-bearing for
    /// the scenarios §8 itself describes ("Globals `{a: 10, b: 10}`") — assignment only ever
    /// updates an existing binding (§4.1's scope-chain rule), so without a way to establish a
    /// global before any thread runs, two threads racing on a shared counter would each silently
    /// create their own thread-local copy instead of contending over one name. Documented as a
    /// resolved gap in `DESIGN.md`.
    #[serde(default)]
    pub initial_globals: Vec<(String, Value)>,
}
