//! The breadth-first state-space explorer (§4.3): the single-threaded engine. Maintains a visited
//! set and one work queue per BFS depth, advances exactly one chosen thread per work item, and
//! applies the cycle / deadlock / termination / stutter rules before handing the result to the
//! temporal evaluator.

use std::collections::HashSet;

use tw_bytecode::Program;
use tw_cas::{Hash, Store};
use tw_interp::{ExecutionOptions, PauseReason, Registry};

use crate::canon::canonicalize;
use crate::cas_entries::{encode_globals, get_state, put_state};
use crate::config::ExploreConfig;
use crate::cycle;
use crate::errors::ExploreError;
use crate::livelock::{weak_hash, WeakStateLog};
use crate::property::{self, Operator, Property};
use crate::report::{RunReport, TraceStep, Violation, ViolationKind};
use crate::state::{State, ThreadId};
use crate::succ::{advance, eligible_threads};
use crate::trace_eval::failed_properties;
use crate::work::Thunk;

/// Runs the serial BFS to completion (or until the first violation, if `config.keep_going` is
/// false), returning every violation found and the run's statistics.
pub fn explore(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    store: &Store,
    properties: &[Property],
    config: &ExploreConfig,
    initial_states: Vec<State>,
) -> Result<RunReport, ExploreError> {
    let mut ctx = Context {
        program,
        registry,
        options,
        store,
        properties,
        config,
        report: RunReport::default(),
        weak_log: WeakStateLog::new(),
        visited: HashSet::new(),
    };

    let mut current: Vec<Thunk> = Vec::new();
    for seed in initial_states {
        for state in canonicalize(seed) {
            ctx.seed_state(state, &mut current)?;
            if ctx.stop_now() {
                return Ok(ctx.report);
            }
        }
    }

    let mut next: Vec<Thunk> = Vec::new();
    let mut depth = 0usize;
    while !current.is_empty() {
        if let Some(max_depth) = ctx.config.max_depth {
            if depth >= max_depth {
                ctx.report.stats.depth_limited = true;
                break;
            }
        }
        ctx.report.stats.max_depth = ctx.report.stats.max_depth.max(depth + 1);

        for thunk in current.drain(..) {
            if ctx.stop_now() {
                break;
            }
            ctx.report.stats.total_transitions += 1;
            let successors = advance(ctx.program, ctx.registry, ctx.options, &thunk.state, thunk.thread)?;
            for successor in successors {
                ctx.process_successor(&thunk, successor, depth, &mut next)?;
                if ctx.stop_now() {
                    break;
                }
            }
        }
        std::mem::swap(&mut current, &mut next);
        depth += 1;
    }

    Ok(ctx.report)
}

struct Context<'a> {
    program: &'a Program,
    registry: &'a Registry,
    options: &'a ExecutionOptions,
    store: &'a Store,
    properties: &'a [Property],
    config: &'a ExploreConfig,
    report: RunReport,
    weak_log: WeakStateLog,
    visited: HashSet<Hash>,
}

impl<'a> Context<'a> {
    fn stop_now(&self) -> bool {
        !self.config.keep_going && !self.report.violations.is_empty()
    }

    fn seed_state(&mut self, state: State, current: &mut Vec<Thunk>) -> Result<(), ExploreError> {
        let hash = put_state(self.store, &state)?;
        if !self.visited.insert(hash) {
            self.report.stats.duplicates += 1;
            return Ok(());
        }
        self.report.stats.unique_states += 1;
        self.record_observation(&state, hash, 0)?;
        self.check_always(&state, hash, 0, None, None, Vec::new())?;

        let eligible = eligible_threads(self.program, self.registry, self.options, &state)?;
        if eligible.is_empty() {
            if state.all_finished() {
                self.check_trace_properties(&[hash], None, None, 0, hash, Vec::new())?;
            } else if !self.config.no_deadlocks {
                self.record_deadlock(None, None, 0, hash, Vec::new());
            }
            return Ok(());
        }
        for thread in eligible {
            current.push(Thunk::new(state.clone(), thread, 0, hash, Vec::new()));
        }
        Ok(())
    }

    fn process_successor(
        &mut self,
        thunk: &Thunk,
        successor: State,
        depth: usize,
        next: &mut Vec<Thunk>,
    ) -> Result<(), ExploreError> {
        let hash = put_state(self.store, &successor)?;
        let thread_name = successor.display_name(thunk.thread);

        if thunk.path_trail().any(|h| h == hash) {
            self.handle_cycle(thunk, hash)?;
            return Ok(());
        }

        let mut new_trace = thunk.trace.clone();
        new_trace.push(TraceStep { thread: thunk.thread, state: hash });

        if !self.visited.insert(hash) {
            self.report.stats.duplicates += 1;
            return Ok(());
        }
        self.report.stats.unique_states += 1;
        self.record_observation(&successor, hash, depth + 1)?;

        self.check_always(&successor, hash, depth + 1, Some(thunk.thread), thread_name.clone(), new_trace.clone())?;
        self.check_stutter(&successor, thunk.thread, &new_trace, depth + 1, hash)?;

        let eligible = eligible_threads(self.program, self.registry, self.options, &successor)?;
        if eligible.is_empty() {
            if successor.all_finished() {
                let mut trail: Vec<Hash> = thunk.path_trail().collect();
                trail.push(hash);
                self.check_trace_properties(&trail, Some(thunk.thread), thread_name, depth + 1, hash, new_trace)?;
            } else if !self.config.no_deadlocks {
                self.record_deadlock(Some(thunk.thread), thread_name, depth + 1, hash, new_trace);
            }
            return Ok(());
        }
        for thread in eligible {
            next.push(Thunk::new(successor.clone(), thread, depth + 1, thunk.initial_hash, new_trace.clone()));
        }
        Ok(())
    }

    fn record_observation(&mut self, state: &State, hash: Hash, depth: usize) -> Result<(), ExploreError> {
        let globals_hash = encode_globals(self.store, &state.globals)?;
        let weak = weak_hash(self.store, globals_hash, state);
        if let Some(warning) = self.weak_log.observe(self.store, weak, depth, hash) {
            self.report.livelocks.push(warning);
            self.report.stats.livelock_count += 1;
        }
        Ok(())
    }

    fn check_always(
        &mut self,
        state: &State,
        hash: Hash,
        depth: usize,
        thread: Option<ThreadId>,
        thread_name: Option<String>,
        trace: Vec<TraceStep>,
    ) -> Result<(), ExploreError> {
        for prop in self.properties.iter().filter(|p| p.operator == Operator::Always) {
            let holds = property::evaluate(self.program, self.registry, self.options, prop, &state.globals)?;
            if !holds {
                let kind = if depth == 0 { ViolationKind::InitialState } else { ViolationKind::Always };
                self.push_violation(Some(prop.name.clone()), kind, thread, thread_name.clone(), depth, hash, trace.clone());
            }
        }
        Ok(())
    }

    fn check_stutter(
        &mut self,
        state: &State,
        thread_id: ThreadId,
        trace: &[TraceStep],
        depth: usize,
        hash: Hash,
    ) -> Result<(), ExploreError> {
        let Some(thread) = state.thread(thread_id) else { return Ok(()) };
        if !matches!(thread.pause, PauseReason::Runnable | PauseReason::Blocked) {
            return Ok(());
        }
        if thread.weakly_fair || thread.strongly_fair {
            return Ok(());
        }
        let any_strongly_fair_enabled = state
            .threads()
            .any(|(_, t)| t.pause.is_enabled() && (t.strongly_fair || t.pause == PauseReason::Start));
        if any_strongly_fair_enabled {
            return Ok(());
        }

        let mut stuttered = state.clone();
        stuttered.thread_mut(thread_id).expect("thread_id resolved above").pause = PauseReason::Stuttering;
        let stutter_hash = put_state(self.store, &stuttered)?;
        let mut stutter_trail: Vec<Hash> = trace[..trace.len().saturating_sub(1)].iter().map(|s| s.state).collect();
        stutter_trail.push(stutter_hash);

        let failures =
            failed_properties(self.store, self.program, self.registry, self.options, self.properties, &stutter_trail, false)?;
        for prop in failures {
            self.push_violation(
                Some(prop.name),
                ViolationKind::Stutter,
                Some(thread_id),
                state.display_name(thread_id),
                depth,
                hash,
                trace.to_vec(),
            );
        }
        Ok(())
    }

    fn check_trace_properties(
        &mut self,
        trail: &[Hash],
        thread: Option<ThreadId>,
        thread_name: Option<String>,
        depth: usize,
        final_hash: Hash,
        trace: Vec<TraceStep>,
    ) -> Result<(), ExploreError> {
        let failures =
            failed_properties(self.store, self.program, self.registry, self.options, self.properties, trail, false)?;
        for prop in failures {
            let kind = ViolationKind::from(prop.operator);
            self.push_violation(Some(prop.name), kind, thread, thread_name.clone(), depth, final_hash, trace.clone());
        }
        Ok(())
    }

    fn handle_cycle(&mut self, thunk: &Thunk, closing_hash: Hash) -> Result<(), ExploreError> {
        let trail: Vec<Hash> = thunk.path_trail().collect();
        let cycle_start = trail.iter().position(|&h| h == closing_hash).expect("caller verified membership");

        let cycle_hashes = &trail[cycle_start..];
        let cycle_states = cycle_hashes.iter().map(|&h| get_state(self.store, h)).collect::<Result<Vec<_>, _>>()?;

        let mut ran: Vec<ThreadId> = thunk.trace[cycle_start..].iter().map(|step| step.thread).collect();
        ran.push(thunk.thread);

        if !cycle::is_admissible(&cycle_states, &ran) {
            return Ok(());
        }

        let thread_name = cycle_states[0].display_name(thunk.thread);

        if self.config.termination && !cycle_states[0].all_finished() {
            self.push_violation(
                None,
                ViolationKind::Termination,
                Some(thunk.thread),
                thread_name.clone(),
                thunk.depth + 1,
                closing_hash,
                thunk.trace.clone(),
            );
        }

        let failures =
            failed_properties(self.store, self.program, self.registry, self.options, self.properties, cycle_hashes, true)?;
        for prop in failures {
            let kind = ViolationKind::from(prop.operator);
            self.push_violation(
                Some(prop.name),
                kind,
                Some(thunk.thread),
                thread_name.clone(),
                thunk.depth + 1,
                closing_hash,
                thunk.trace.clone(),
            );
        }
        Ok(())
    }

    fn record_deadlock(
        &mut self,
        thread: Option<ThreadId>,
        thread_name: Option<String>,
        depth: usize,
        hash: Hash,
        trace: Vec<TraceStep>,
    ) {
        self.push_violation(None, ViolationKind::Deadlock, thread, thread_name, depth, hash, trace);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_violation(
        &mut self,
        property: Option<String>,
        kind: ViolationKind,
        thread: Option<ThreadId>,
        thread_name: Option<String>,
        depth: usize,
        final_state: Hash,
        trace: Vec<TraceStep>,
    ) {
        self.report.violations.push(Violation {
            property,
            kind,
            thread,
            thread_name,
            depth,
            state_number: final_state.as_u64() as usize,
            trace,
            final_state,
        });
        self.report.stats.violation_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tw_bytecode::{Block, FunctionBlock, Op};
    use tw_interp::{Frame, Globals, Thread};
    use tw_value::{ExecPtr, Value, MAIN_BLOCK};

    use super::*;
    use crate::state::ThreadSet;

    fn program_with(ops: Vec<Op>, lines: Vec<u32>) -> Program {
        Program { main: Block::new(ops, lines), functions: vec![], exports: BTreeMap::new() }
    }

    #[test]
    fn single_thread_no_properties_reaches_a_deadlock_free_termination() {
        let program = program_with(vec![Op::Push(Value::Int(1)), Op::Return], vec![1, 1]);
        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let initial = State::new(Globals::default(), vec![ThreadSet::new("t", vec![thread])]);

        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let store = Store::new();
        let report =
            explore(&program, &registry, &options, &store, &[], &ExploreConfig::default(), vec![initial]).unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.stats.unique_states, 2);
    }

    /// Two replicas each test a wait condition that is always false and never become eligible
    /// again once started; the state where both are waiting has no runnable thread and is not
    /// `all_finished`, so it must be reported as a deadlock.
    #[test]
    fn two_threads_permanently_waiting_is_a_deadlock() {
        let ops = vec![
            Op::Push(Value::Bool(false)),
            Op::ConditionalYield(3),
            Op::Return,
            Op::Push(Value::Bool(false)),
            Op::Return,
        ];
        let lines = vec![1, 1, 1, 1, 1];
        let program = program_with(ops, lines);

        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let initial = State::new(Globals::default(), vec![ThreadSet::new("t", vec![thread.clone(), thread])]);

        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let store = Store::new();
        let config = ExploreConfig { keep_going: true, ..ExploreConfig::default() };
        let report = explore(&program, &registry, &options, &store, &[], &config, vec![initial]).unwrap();
        assert!(report.violations.iter().any(|v| v.kind == ViolationKind::Deadlock));
    }

    /// An unboundedly growing counter never repeats a state and never runs out of successors;
    /// bounding the search by `max_depth` must stop expansion without reporting a violation.
    #[test]
    fn max_depth_sets_depth_limited_without_reporting_a_violation() {
        let ops = vec![
            Op::GetVar("counter".into()),
            Op::Push(Value::Int(1)),
            Op::Add,
            Op::SetVar("counter".into()),
            Op::Yield,
            Op::Jmp(0),
        ];
        let lines = vec![1, 1, 1, 1, 1, 1];
        let program = program_with(ops, lines);

        let mut globals = Globals::default();
        globals.set("counter", Value::Int(0));
        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let initial = State::new(globals, vec![ThreadSet::new("t", vec![thread])]);

        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let store = Store::new();
        let config = ExploreConfig { max_depth: Some(3), ..ExploreConfig::default() };
        let report = explore(&program, &registry, &options, &store, &[], &config, vec![initial]).unwrap();
        assert!(report.stats.depth_limited);
        assert!(report.violations.is_empty());
    }

    /// `FAIR_YIELD` must mark the thread weakly fair (§3) so `check_stutter` exempts it: a thread
    /// that loops on `FAIR_YIELD` forever never satisfies `EventuallyAlways` on its own (the
    /// property global never becomes true), so without the exemption every step would be reported
    /// as a spurious stutter violation.
    #[test]
    fn fair_yield_exempts_the_thread_from_stutter_checking() {
        let ops = vec![Op::FairYield, Op::Jmp(0)];
        let lines = vec![1, 1];
        let program = Program {
            main: Block::new(ops, lines),
            functions: vec![FunctionBlock {
                name: "flag_holds".into(),
                params: vec![],
                block: Block::new(vec![Op::GetVar("flag".into()), Op::Return], vec![1, 1]),
            }],
            exports: BTreeMap::new(),
        };

        let mut globals = Globals::default();
        globals.set("flag", Value::Bool(false));
        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let initial = State::new(globals, vec![ThreadSet::new("t", vec![thread])]);

        let properties =
            vec![Property { name: "flag_holds".into(), operator: Operator::EventuallyAlways, entry: ExecPtr::entry(1) }];

        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let store = Store::new();
        let config = ExploreConfig { keep_going: true, max_depth: Some(4), ..ExploreConfig::default() };
        let report =
            explore(&program, &registry, &options, &store, &properties, &config, vec![initial]).unwrap();
        assert!(!report.violations.iter().any(|v| v.kind == ViolationKind::Stutter));
    }
}
