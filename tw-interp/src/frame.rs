use std::collections::BTreeMap;

use tw_value::{ExecPtr, Value};

/// Whether a wait descriptor carries a weak-fairness obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FairnessTag {
    None,
    Weak,
}

/// Records the retry point and fairness class of a frame suspended on a conditional yield.
///
/// Present on a frame iff the owning thread's pause reason is `Waiting` or `WeaklyFairWaiting`
/// (§3 Invariant 2). The explorer re-evaluates `condition_pc` by cloning the state and running
/// the condition bytecode again — wait state is never cached as a boolean across states (§9).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WaitDescriptor {
    pub condition_pc: ExecPtr,
    pub fairness: FairnessTag,
}

/// Which loop variable(s) a `for` loop binds on each iteration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum IterVars {
    One(String),
    Two(String, String),
}

/// The cursor half of an iterator state: where iteration currently is.
///
/// Map iteration walks a *sorted* key list — this is a hard invariant (§3): determinism of the
/// whole verification run depends on it, since two structurally-equal maps with different
/// insertion histories must produce identical loop-variable sequences.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum IterCursor {
    Seq { index: usize, values: Vec<Value> },
    Map { index: usize, entries: Vec<(String, Value)> },
}

impl IterCursor {
    pub fn over_array(values: Vec<Value>) -> Self {
        IterCursor::Seq { index: 0, values }
    }

    pub fn over_map(map: &BTreeMap<String, Value>) -> Self {
        // BTreeMap already iterates in lexicographic key order.
        IterCursor::Map { index: 0, entries: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect() }
    }

    pub fn is_exhausted(&self) -> bool {
        match self {
            IterCursor::Seq { index, values } => *index >= values.len(),
            IterCursor::Map { index, entries } => *index >= entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IterCursor::Seq { values, .. } => values.len(),
            IterCursor::Map { entries, .. } => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current `(first, second)` binding: for a sequence, `(index, value)`; for a map,
    /// `(key, value)`. `second` is `None` for single-variable iteration over a sequence value.
    pub fn current(&self) -> (Value, Value) {
        match self {
            IterCursor::Seq { index, values } => (Value::Int(*index as i64), values[*index].clone()),
            IterCursor::Map { index, entries } => {
                let (k, v) = &entries[*index];
                (Value::Str(k.clone()), v.clone())
            },
        }
    }

    pub fn advance(&mut self) {
        match self {
            IterCursor::Seq { index, .. } | IterCursor::Map { index, .. } => *index += 1,
        }
    }
}

/// A loop record pushed by `ITER_START`/`ITER_START_2`, popped by `ITER_NEXT`/`ITER_END`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IterState {
    pub resume: ExecPtr,
    pub exit: ExecPtr,
    pub vars: IterVars,
    pub cursor: IterCursor,
}

/// The resumable state of one function activation.
///
/// Invariant 1 (§3): the operand stack is empty at every yield — callers that suspend a thread
/// must check this, since a non-empty stack at a yield point is an interpreter bug, not a user
/// error.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub stack: Vec<Value>,
    pub pc: ExecPtr,
    pub vars: BTreeMap<String, Value>,
    pub iterators: Vec<IterState>,
    pub wait: Option<WaitDescriptor>,
}

impl Frame {
    pub fn at(pc: ExecPtr) -> Self {
        Self { pc, ..Default::default() }
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    /// True when this frame satisfies Invariant 1 — used by tests and by the explorer's
    /// debug-assertions at yield points.
    pub fn stack_is_empty_at_yield(&self) -> bool {
        self.stack.is_empty()
    }
}
