//! Successor generation (§4.3): deciding which threads may run next, advancing one chosen thread
//! one atomic step, and turning the result into zero or more canonical successor states.

use tw_bytecode::Program;
use tw_interp::{
    poll_wait_condition, resume_nondet, run_to_pause, ExecutionError, ExecutionOptions, PauseReason, Registry,
    RunOutcome,
};

use crate::canon::canonicalize;
use crate::state::{State, ThreadId};

/// Every thread in `state` currently eligible to be chosen as the next to run (§4.3):
/// `Start`/`Runnable`/`Blocked` threads unconditionally; `Waiting`/`WeaklyFairWaiting` threads
/// only if their guard condition, re-evaluated fresh against this state's globals, now holds.
/// `Finished`, `NonDet` (a thread mid-nondeterministic-choice never reaches this function between
/// choices — see [`advance`]) and `Stuttering` threads are never eligible.
pub fn eligible_threads(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    state: &State,
) -> Result<Vec<ThreadId>, ExecutionError> {
    let mut eligible = Vec::new();
    for (id, thread) in state.threads() {
        let is_eligible = match thread.pause {
            PauseReason::Start | PauseReason::Runnable | PauseReason::Blocked => true,
            PauseReason::Waiting | PauseReason::WeaklyFairWaiting => {
                let wait = thread.current_frame().wait.expect("a waiting thread always carries a wait descriptor");
                poll_wait_condition(program, registry, options, &state.globals, wait.condition_pc)?
            },
            PauseReason::Finished | PauseReason::NonDet | PauseReason::Stuttering => false,
        };
        if is_eligible {
            eligible.push(id);
        }
    }
    Ok(eligible)
}

/// Runs `thread` forward from `state` one atomic step, returning every canonical successor state
/// that results.
///
/// A thread found `Waiting`/`WeaklyFairWaiting` has already passed [`eligible_threads`]'s guard
/// check by the time it reaches here; its wait descriptor is cleared and it is marked `Runnable`
/// before being handed to [`run_to_pause`], which otherwise asserts its caller never hands it a
/// disabled thread.
///
/// A `NonDet` yield recursively branches into one successor per offered choice — this naturally
/// handles chained non-determinism within a single atomic step (a choice that immediately leads
/// to another nondeterministic call before the next yield point) without special-casing it. Every
/// resulting state is then passed through the general-purpose canonicaliser, which catches any
/// `NonDet` value a program embedded by some other means (§3 Canonicaliser, §8 "Canonicalisation
/// saturation").
pub fn advance(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    state: &State,
    thread: ThreadId,
) -> Result<Vec<State>, ExecutionError> {
    let mut state = state.clone();
    {
        let t = state.thread_mut(thread).expect("caller passed a valid thread id");
        if matches!(t.pause, PauseReason::Waiting | PauseReason::WeaklyFairWaiting) {
            t.current_frame_mut().wait = None;
            t.pause = PauseReason::Runnable;
        }
    }

    let outcome = {
        let t = state.thread_mut(thread).expect("caller passed a valid thread id");
        run_to_pause(program, registry, options, &mut state.globals, t)?
    };

    let branches = match outcome {
        RunOutcome::Paused => vec![state],
        RunOutcome::NonDet(choices) => {
            let mut branches = Vec::with_capacity(choices.len());
            for choice in choices {
                let mut branch = state.clone();
                {
                    let t = branch.thread_mut(thread).expect("caller passed a valid thread id");
                    resume_nondet(t, choice);
                }
                branches.extend(advance(program, registry, options, &branch, thread)?);
            }
            branches
        },
    };

    Ok(branches.into_iter().flat_map(canonicalize).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tw_bytecode::{Block, Op, Program};
    use tw_interp::{Frame, Globals, Thread};
    use tw_value::{ExecPtr, Value, MAIN_BLOCK};

    use super::*;
    use crate::state::ThreadSet;

    fn single_thread_state(program_ops: Vec<Op>, line_map: Vec<u32>) -> (Program, State) {
        let program = Program { main: Block::new(program_ops, line_map), functions: vec![], exports: BTreeMap::new() };
        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let state = State::new(Globals::default(), vec![ThreadSet::new("t", vec![thread])]);
        (program, state)
    }

    #[test]
    fn runnable_thread_is_eligible() {
        let (program, state) = single_thread_state(vec![Op::Push(Value::Int(1)), Op::Return], vec![1, 1]);
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let eligible = eligible_threads(&program, &registry, &options, &state).unwrap();
        assert_eq!(eligible, vec![ThreadId::new(0, 0)]);
    }

    #[test]
    fn finished_thread_is_not_eligible() {
        let (program, mut state) = single_thread_state(vec![Op::Push(Value::Int(1)), Op::Return], vec![1, 1]);
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let id = ThreadId::new(0, 0);

        let mut successors = advance(&program, &registry, &options, &state, id).unwrap();
        assert_eq!(successors.len(), 1);
        state = successors.remove(0);
        assert!(state.thread(id).unwrap().pause == PauseReason::Finished);

        let eligible = eligible_threads(&program, &registry, &options, &state).unwrap();
        assert!(eligible.is_empty());
    }

    #[test]
    fn advance_runs_until_the_thread_finishes() {
        let (program, state) = single_thread_state(vec![Op::Push(Value::Int(7)), Op::Return], vec![1, 1]);
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let successors = advance(&program, &registry, &options, &state, ThreadId::new(0, 0)).unwrap();
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].thread(ThreadId::new(0, 0)).unwrap().pause, PauseReason::Finished);
    }

    #[test]
    fn unconditional_yield_produces_a_single_runnable_successor() {
        let (program, state) =
            single_thread_state(vec![Op::Yield, Op::Push(Value::Int(1)), Op::Return], vec![1, 2, 2]);
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let successors = advance(&program, &registry, &options, &state, ThreadId::new(0, 0)).unwrap();
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].thread(ThreadId::new(0, 0)).unwrap().pause, PauseReason::Runnable);
    }

    #[test]
    fn nondet_yield_branches_into_one_successor_per_choice() {
        let (program, state) = single_thread_state(
            vec![
                Op::GetVar("nondet".into()),
                Op::Push(Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])),
                Op::BuildArg(None),
                Op::Call(1),
                Op::Return,
            ],
            vec![1, 1, 1, 1, 1],
        );
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let successors = advance(&program, &registry, &options, &state, ThreadId::new(0, 0)).unwrap();
        assert_eq!(successors.len(), 3);
        for s in &successors {
            assert_eq!(s.thread(ThreadId::new(0, 0)).unwrap().pause, PauseReason::Finished);
        }
    }

    #[test]
    fn nondet_of_empty_choices_produces_zero_successors() {
        let (program, state) = single_thread_state(
            vec![
                Op::GetVar("nondet".into()),
                Op::Push(Value::Array(vec![])),
                Op::BuildArg(None),
                Op::Call(1),
                Op::Return,
            ],
            vec![1, 1, 1, 1, 1],
        );
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let successors = advance(&program, &registry, &options, &state, ThreadId::new(0, 0)).unwrap();
        assert!(successors.is_empty());
    }
}
