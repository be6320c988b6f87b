/// Flags controlling one exploration run (§6 Configuration's `flags` row, minus `show-details`
/// which is a terminal-output concern the core never sees).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExploreConfig {
    /// Keep exploring after the first violation instead of stopping (§7).
    pub keep_going: bool,
    /// Suppress deadlock reporting (§4.3 "Deadlock (unless disabled)").
    pub no_deadlocks: bool,
    /// Treat a true cycle in which not every thread is `Finished` as a violation (§4.3
    /// "Termination mode (opt-in)").
    pub termination: bool,
    /// Stop expanding successors past this BFS depth (§6 flags; surfaced via
    /// `Stats::depth_limited` rather than a violation per `SPEC_FULL.md`'s supplemented rule).
    pub max_depth: Option<usize>,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self { keep_going: false, no_deadlocks: false, termination: false, max_depth: None }
    }
}
