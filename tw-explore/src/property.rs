//! Compiled temporal properties and point-wise/trace-wise evaluation (§4.5).
//!
//! A property is "a boolean expression or a nullary function call in the source language"
//! (§4.5): unlike a wait condition (`tw_interp::poll_wait_condition`), it *may* call a
//! user-defined function, but it must still terminate without yielding — properties are pure,
//! total predicates over a single state's globals.

use std::sync::Arc;

use tw_bytecode::Program;
use tw_interp::{ExecutionError, ExecutionOptions, Frame, Globals, OperationError, Registry, StepOutcome};
use tw_value::{ExecPtr, Value};

/// Which of the four temporal operators a [`Property`] is checked under (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Operator {
    Always,
    Eventually,
    EventuallyAlways,
    AlwaysEventually,
}

/// A named, compiled temporal property: `entry` is the already-compiled bytecode address the
/// front-end produced for the property expression (§6: properties arrive pre-compiled, the core
/// never parses source text).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Property {
    pub name: String,
    pub operator: Operator,
    pub entry: ExecPtr,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error("property '{0}' yielded; properties must run to completion without suspending")]
    Yielded(String),
    #[error("property '{name}' returned {found}, expected bool")]
    NotBoolean { name: String, found: &'static str },
}

/// Runs one property's bytecode to completion against a clone of `globals`, inheriting
/// `program`'s function table (so a property that is a nullary call to an exported function
/// resolves normally). Properties may call user-defined functions (unlike wait conditions) but
/// must not yield.
pub fn evaluate(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    property: &Property,
    globals: &Globals,
) -> Result<bool, PropertyError> {
    let mut globals = globals.clone();
    let mut frames = vec![Frame::at(property.entry)];
    let mut steps = 0u32;
    loop {
        steps += 1;
        if steps > options.max_steps_per_atomic {
            let pc = frames.last().expect("always at least one frame").pc;
            return Err(PropertyError::Execution(ExecutionError::new(
                pc,
                None,
                OperationError::StepLimitExceeded(options.max_steps_per_atomic),
            )));
        }
        let frame = frames.last_mut().expect("always at least one frame");
        match tw_interp::step(program, registry, &mut globals, frame)? {
            StepOutcome::Continue => continue,
            StepOutcome::Call { frame: callee } => {
                if frames.len() >= options.max_call_depth {
                    let pc = frames.last().expect("always at least one frame").pc;
                    return Err(PropertyError::Execution(ExecutionError::new(
                        pc,
                        None,
                        OperationError::CallDepthExceeded(options.max_call_depth),
                    )));
                }
                frames.push(*callee);
            },
            StepOutcome::Return(value) => {
                frames.pop();
                match frames.last_mut() {
                    Some(caller) => caller.push(value),
                    None => {
                        return match value {
                            Value::Bool(b) => Ok(b),
                            other => Err(PropertyError::NotBoolean { name: property.name.clone(), found: other.type_name() }),
                        };
                    },
                }
            },
            StepOutcome::Yield { .. } => return Err(PropertyError::Yielded(property.name.clone())),
        }
    }
}

/// The full set of properties configured for a run, shared read-only across the explorer's
/// workers.
pub type PropertySet = Arc<Vec<Property>>;

/// For a terminating (non-cyclic) trace of state predicate values `p_0, ..., p_{n-1}`, is there a
/// `k` from which `p_j` holds for every `j` in `[k, n)`? Empty traces vacuously fail (there is no
/// state to anchor a suffix on).
pub fn eventually_always_holds(trace: &[bool]) -> bool {
    (0..trace.len()).any(|k| trace[k..].iter().all(|&p| p))
}

/// For a cyclic trace (the loop body's predicate values, in order around the cycle once),
/// succeeds iff `p` holds at every state from the loop start to the final state (§4.5, taken
/// literally) — a false anywhere in the cycle recurs forever once the cycle repeats, so the
/// cycle's own span is exactly the question that matters.
pub fn eventually_always_holds_cyclic(cycle: &[bool]) -> bool {
    !cycle.is_empty() && cycle.iter().all(|&p| p)
}

/// For a true cyclic trace, does at least one state in the cycle satisfy `p` (§4.5
/// `AlwaysEventually`)?
pub fn always_eventually_holds_cyclic(cycle: &[bool]) -> bool {
    cycle.iter().any(|&p| p)
}

/// Resolution of the open question in §4.5/§9: `AlwaysEventually` on a *terminating* (non-cyclic)
/// trace is treated as "`P` must hold at the terminal state", chosen for determinism as the spec's
/// own parenthetical permits. Documented in `DESIGN.md`.
pub fn always_eventually_holds_terminating(trace: &[bool]) -> bool {
    trace.last().copied().unwrap_or(false)
}

/// `Eventually P`: does `p` hold at any point along this terminating trace?
pub fn eventually_holds(trace: &[bool]) -> bool {
    trace.iter().any(|&p| p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eventually_always_finds_an_all_true_suffix() {
        assert!(eventually_always_holds(&[false, true, false, true, true]));
        assert!(!eventually_always_holds(&[false, true, false]));
        assert!(!eventually_always_holds(&[]));
    }

    #[test]
    fn always_eventually_terminating_checks_only_the_final_state() {
        assert!(always_eventually_holds_terminating(&[false, false, true]));
        assert!(!always_eventually_holds_terminating(&[true, true, false]));
        assert!(!always_eventually_holds_terminating(&[]));
    }

    #[test]
    fn cyclic_variants_match_their_prose() {
        assert!(eventually_always_holds_cyclic(&[true, true]));
        assert!(!eventually_always_holds_cyclic(&[true, false]));
        assert!(always_eventually_holds_cyclic(&[false, true, false]));
        assert!(!always_eventually_holds_cyclic(&[false, false]));
    }
}
