use tw_bytecode::Program;
use tw_value::Value;

use crate::builtins::Registry;
use crate::errors::{ExecutionError, OperationError};
use crate::frame::Frame;
use crate::globals::Globals;
use crate::options::ExecutionOptions;
use crate::step::{step, StepOutcome, YieldKind};
use crate::thread::{PauseReason, Thread};

/// What [`run_to_pause`] produced, beyond the thread's own updated `pause` field.
///
/// Every yield kind already updates `thread.pause`/the current frame's wait descriptor in place;
/// the one piece of information that has nowhere else to live is a `NonDet` yield's choice list —
/// the explorer needs those concrete values to branch the state on (§4.3 "Non-determinism"), and
/// nothing about the thread or frame records them once the call that produced them has returned.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The thread paused for any reason other than `NonDet` (yielded, finished, or is blocked on
    /// a wait condition); `thread.pause` already reflects which.
    Paused,
    /// A builtin call yielded a nondeterministic choice set. `thread.pause` is `PauseReason::
    /// NonDet`; the caller is expected to branch into one successor per choice, each produced by
    /// [`resume_nondet`] with that choice's value.
    NonDet(Vec<Value>),
}

/// Runs `thread` forward, one opcode at a time, until it yields, returns from its outermost
/// frame, or hits a configured limit. Calls push a fresh [`Frame`] (checked against
/// [`ExecutionOptions::max_call_depth`](crate::ExecutionOptions)); returns pop it and hand the
/// result to the caller's operand stack, finishing the thread when the outermost frame returns.
pub fn run_to_pause(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    globals: &mut Globals,
    thread: &mut Thread,
) -> Result<RunOutcome, ExecutionError> {
    debug_assert!(thread.pause.is_enabled(), "run_to_pause called on a thread that is not runnable");
    let mut steps = 0u32;
    loop {
        steps += 1;
        if steps > options.max_steps_per_atomic {
            let pc = thread.current_frame().pc;
            return Err(ExecutionError::new(pc, None, OperationError::StepLimitExceeded(options.max_steps_per_atomic)));
        }

        let frame = thread.current_frame_mut();
        match step(program, registry, globals, frame)? {
            StepOutcome::Continue => continue,
            StepOutcome::Return(value) => {
                thread.frames.pop();
                match thread.frames.last_mut() {
                    Some(caller) => caller.push(value),
                    None => {
                        thread.pause = PauseReason::Finished;
                        return Ok(RunOutcome::Paused);
                    },
                }
            },
            StepOutcome::Call { frame: callee } => {
                if thread.frames.len() >= options.max_call_depth {
                    let pc = thread.current_frame().pc;
                    return Err(ExecutionError::new(
                        pc,
                        None,
                        OperationError::CallDepthExceeded(options.max_call_depth),
                    ));
                }
                thread.frames.push(*callee);
            },
            StepOutcome::Yield { reason: YieldKind::NonDet(choices) } => {
                thread.pause = PauseReason::NonDet;
                return Ok(RunOutcome::NonDet(choices));
            },
            StepOutcome::Yield { reason } => {
                if reason.marks_weakly_fair() {
                    thread.weakly_fair = true;
                }
                if reason.marks_strongly_fair() {
                    thread.strongly_fair = true;
                }
                thread.pause = reason.pause_reason();
                thread.current_frame_mut().wait = reason.wait_descriptor();
                return Ok(RunOutcome::Paused);
            },
        }
    }
}

/// Pushes a previously-announced nondeterministic choice onto the thread's top frame and marks it
/// runnable again, without re-executing the `CALL` that produced the choice set.
pub fn resume_nondet(thread: &mut Thread, chosen: Value) {
    thread.current_frame_mut().push(chosen);
    thread.pause = PauseReason::Runnable;
}

/// Re-evaluates a waiting thread's guard condition from the given entry point, running it as a
/// side-effect-free boolean expression (the guard block must leave exactly one `Bool` on the
/// stack and must not itself yield).
pub fn poll_wait_condition(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    globals: &Globals,
    condition_pc: tw_value::ExecPtr,
) -> Result<bool, ExecutionError> {
    let mut globals = globals.clone();
    let mut frame = Frame::at(condition_pc);
    let mut steps = 0u32;
    loop {
        steps += 1;
        if steps > options.max_steps_per_atomic {
            return Err(ExecutionError::new(
                frame.pc,
                None,
                OperationError::StepLimitExceeded(options.max_steps_per_atomic),
            ));
        }
        match step(program, registry, &mut globals, &mut frame)? {
            StepOutcome::Continue => continue,
            StepOutcome::Return(Value::Bool(b)) => return Ok(b),
            StepOutcome::Return(other) => {
                return Err(ExecutionError::new(
                    frame.pc,
                    None,
                    OperationError::TypeError(format!("wait condition returned {}, expected bool", other.type_name())),
                ));
            },
            StepOutcome::Call { .. } => {
                return Err(ExecutionError::new(
                    frame.pc,
                    None,
                    OperationError::TypeError("wait conditions may not call user-defined functions".into()),
                ));
            },
            StepOutcome::Yield { .. } => {
                return Err(ExecutionError::new(
                    frame.pc,
                    None,
                    OperationError::TypeError("wait conditions may not yield".into()),
                ));
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tw_bytecode::{Block, FunctionBlock, Op, ParamSpec};
    use tw_value::MAIN_BLOCK;

    use super::*;

    fn program_returning(value: i64) -> Program {
        Program {
            main: Block::new(vec![Op::Push(Value::Int(value)), Op::Return], vec![1, 1]),
            functions: vec![],
            exports: BTreeMap::new(),
        }
    }

    #[test]
    fn runs_to_completion_on_return() {
        let program = program_returning(7);
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let mut globals = Globals::default();
        let mut thread = Thread::new(Frame::at(tw_value::ExecPtr::entry(MAIN_BLOCK)), false, false);
        thread.pause = PauseReason::Start;
        run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap();
        assert_eq!(thread.pause, PauseReason::Finished);
    }

    #[test]
    fn unconditional_yield_stops_with_runnable() {
        let program = Program {
            main: Block::new(vec![Op::Yield, Op::Push(Value::Int(1)), Op::Return], vec![1, 2, 2]),
            functions: vec![],
            exports: BTreeMap::new(),
        };
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let mut globals = Globals::default();
        let mut thread = Thread::new(Frame::at(tw_value::ExecPtr::entry(MAIN_BLOCK)), false, false);
        thread.pause = PauseReason::Start;
        run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap();
        assert_eq!(thread.pause, PauseReason::Runnable);
        assert_eq!(thread.current_frame().pc, tw_value::ExecPtr::entry(MAIN_BLOCK).advance(1));

        thread.pause = PauseReason::Runnable;
        run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap();
        assert_eq!(thread.pause, PauseReason::Finished);
    }

    #[test]
    fn fair_yield_stops_runnable_and_marks_the_thread_weakly_fair() {
        let program = Program {
            main: Block::new(vec![Op::FairYield, Op::Return], vec![1, 1]),
            functions: vec![],
            exports: BTreeMap::new(),
        };
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let mut globals = Globals::default();
        let mut thread = Thread::new(Frame::at(tw_value::ExecPtr::entry(MAIN_BLOCK)), false, false);
        thread.pause = PauseReason::Start;
        run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap();
        assert_eq!(thread.pause, PauseReason::Runnable);
        assert!(thread.weakly_fair);
        assert!(!thread.strongly_fair);
    }

    #[test]
    fn strong_yield_stops_runnable_and_marks_the_thread_strongly_fair() {
        let program = Program {
            main: Block::new(vec![Op::StrongYield, Op::Return], vec![1, 1]),
            functions: vec![],
            exports: BTreeMap::new(),
        };
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let mut globals = Globals::default();
        let mut thread = Thread::new(Frame::at(tw_value::ExecPtr::entry(MAIN_BLOCK)), false, false);
        thread.pause = PauseReason::Start;
        run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap();
        assert_eq!(thread.pause, PauseReason::Runnable);
        assert!(thread.strongly_fair);
        assert!(!thread.weakly_fair);
    }

    #[test]
    fn call_pushes_and_return_pops_a_frame() {
        let mut exports = BTreeMap::new();
        exports.insert("double".to_owned(), 1u32);
        let program = Program {
            main: Block::new(
                vec![
                    Op::GetVar("double".into()),
                    Op::Push(Value::Int(21)),
                    Op::BuildArg(None),
                    Op::Call(1),
                    Op::Return,
                ],
                vec![1, 1, 1, 1, 1],
            ),
            functions: vec![FunctionBlock {
                name: "double".into(),
                params: vec![ParamSpec { name: "n".into(), default: None }],
                block: Block::new(
                    vec![Op::GetVar("n".into()), Op::GetVar("n".into()), Op::Add, Op::Return],
                    vec![2, 2, 2, 2],
                ),
            }],
            exports,
        };
        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let mut globals = Globals::default();
        let mut thread = Thread::new(Frame::at(tw_value::ExecPtr::entry(MAIN_BLOCK)), false, false);
        thread.pause = PauseReason::Start;
        run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap();
        assert_eq!(thread.pause, PauseReason::Finished);
    }

    #[test]
    fn call_depth_guard_trips_on_unbounded_recursion() {
        let mut exports = BTreeMap::new();
        exports.insert("loop_forever".to_owned(), 1u32);
        let program = Program {
            main: Block::new(
                vec![Op::GetVar("loop_forever".into()), Op::Call(0), Op::Return],
                vec![1, 1, 1],
            ),
            functions: vec![FunctionBlock {
                name: "loop_forever".into(),
                params: vec![],
                block: Block::new(
                    vec![Op::GetVar("loop_forever".into()), Op::Call(0), Op::Return],
                    vec![2, 2, 2],
                ),
            }],
            exports,
        };
        let registry = Registry::standard();
        let options = ExecutionOptions { max_call_depth: 8, max_steps_per_atomic: 10_000 };
        let mut globals = Globals::default();
        let mut thread = Thread::new(Frame::at(tw_value::ExecPtr::entry(MAIN_BLOCK)), false, false);
        thread.pause = PauseReason::Start;
        let err = run_to_pause(&program, &registry, &options, &mut globals, &mut thread).unwrap_err();
        assert!(matches!(err.source, OperationError::CallDepthExceeded(8)));
    }
}
