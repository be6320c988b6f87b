/// Limits the interpreter enforces while running a single thread forward.
///
/// Both limits exist to turn runaway programs (unbounded recursion, an infinite loop with no
/// yield point) into a reported error instead of a hang — the same role `miden-processor`'s
/// `MAX_CONTEXT_DEPTH`-style limits play, tuned here to a model-checked language's call stack and
/// atomic-step budget instead of Miden's trace width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecutionOptions {
    pub max_call_depth: usize,
    pub max_steps_per_atomic: u32,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self { max_call_depth: 256, max_steps_per_atomic: 1_000_000 }
    }
}
