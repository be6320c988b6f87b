//! Parallel BFS explorer (§4.3 "Parallel"/§5): the same state graph, visited set and temporal
//! rules as [`crate::explorer::explore`], advanced by a pool of worker threads instead of one.
//!
//! The source design splits workers into two pools: execution workers that advance a thunk and
//! enqueue its successors, and checker workers that run property/stutter/deadlock/cycle
//! evaluation on each enqueued successor, coordinated by a pending-item counter that gates the
//! advance to the next depth. This rewrite folds both roles into one worker loop per item: a
//! worker that has just advanced a thunk already holds every successor state in hand, so handing
//! it to a second pool over a channel buys nothing but an extra hop. [`std::thread::scope`]'s
//! join is used as the depth barrier in place of the pending counter — both mechanisms say the
//! same thing ("do not start depth k+1 until every depth-k item, including its successor checks,
//! has finished"). Resolved design choice, documented in `DESIGN.md`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};

use tw_bytecode::Program;
use tw_cas::{Hash, Store};
use tw_interp::{ExecutionOptions, PauseReason, Registry};

use crate::canon::canonicalize;
use crate::cas_entries::{encode_globals, put_state};
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

/// Worker count used when a caller has no preference of its own.
pub const DEFAULT_WORKERS: usize = 4;

/// Runs the parallel BFS to completion (or until the first violation, if `config.keep_going` is
/// false), returning every violation found and the run's statistics. `workers` is clamped to at
/// least 1.
pub fn explore_parallel(
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    store: &Store,
    properties: &[Property],
    config: &ExploreConfig,
    initial_states: Vec<State>,
    workers: usize,
) -> Result<RunReport, ExploreError> {
    let workers = workers.max(1);
    let shared = Shared::new(program, registry, options, store, properties, config);

    let mut current: Vec<Thunk> = Vec::new();
    'seed: for seed in initial_states {
        for state in canonicalize(seed) {
            shared.seed_state(state, &mut current)?;
            shared.take_error()?;
            if shared.should_cancel() {
                break 'seed;
            }
        }
    }

    let mut depth = 0usize;
    while !current.is_empty() && !shared.should_cancel() {
        if let Some(max_depth) = shared.config.max_depth {
            if depth >= max_depth {
                shared.report.lock().stats.depth_limited = true;
                break;
            }
        }
        shared.report.lock().stats.max_depth = shared.report.lock().stats.max_depth.max(depth + 1);

        current = shared.run_depth(current, depth, workers)?;
        depth += 1;
    }

    shared.take_error()?;
    Ok(shared.into_report())
}

struct Shared<'a> {
    program: &'a Program,
    registry: &'a Registry,
    options: &'a ExecutionOptions,
    store: &'a Store,
    properties: &'a [Property],
    config: &'a ExploreConfig,
    report: Mutex<RunReport>,
    weak_log: Mutex<WeakStateLog>,
    visited: RwLock<HashSet<Hash>>,
    cancel: AtomicBool,
    first_error: Mutex<Option<ExploreError>>,
}

impl<'a> Shared<'a> {
    fn new(
        program: &'a Program,
        registry: &'a Registry,
        options: &'a ExecutionOptions,
        store: &'a Store,
        properties: &'a [Property],
        config: &'a ExploreConfig,
    ) -> Self {
        Self {
            program,
            registry,
            options,
            store,
            properties,
            config,
            report: Mutex::new(RunReport::default()),
            weak_log: Mutex::new(WeakStateLog::new()),
            visited: RwLock::new(HashSet::new()),
            cancel: AtomicBool::new(false),
            first_error: Mutex::new(None),
        }
    }

    fn into_report(self) -> RunReport {
        self.report.into_inner()
    }

    /// Cooperative cancellation check (§5): workers consult this at their next item boundary
    /// rather than being interrupted mid-item.
    fn should_cancel(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn record_error(&self, err: ExploreError) {
        self.cancel.store(true, Ordering::Relaxed);
        let mut slot = self.first_error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take_error(&self) -> Result<(), ExploreError> {
        match self.first_error.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Double-checked-locking claim on the read-mostly visited set (§5 "Shared resources"): a
    /// cheap read-lock probe first, then a write-lock insert only when the probe missed. Returns
    /// `true` iff this call is the one that actually added `hash`.
    fn claim(&self, hash: Hash) -> bool {
        if self.visited.read().contains(&hash) {
            return false;
        }
        self.visited.write().insert(hash)
    }

    fn seed_state(&self, state: State, current: &mut Vec<Thunk>) -> Result<(), ExploreError> {
        let hash = put_state(self.store, &state)?;
        if !self.claim(hash) {
            self.report.lock().stats.duplicates += 1;
            return Ok(());
        }
        self.report.lock().stats.unique_states += 1;
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

    /// Drains `current` across `workers` scoped threads and returns the merged next-depth work
    /// list. Each worker pulls thunks off a shared bounded channel (§5 "Queues"); the channel is
    /// pre-loaded with every item at this depth before any worker starts, since the full set is
    /// already known up front and no producer needs to block a consumer mid-depth.
    fn run_depth(&self, current: Vec<Thunk>, depth: usize, workers: usize) -> Result<Vec<Thunk>, ExploreError> {
        let (tx, rx) = bounded::<Thunk>(current.len().max(1));
        for thunk in current {
            tx.send(thunk).expect("receiver outlives this scope");
        }
        drop(tx);

        let results: Vec<Vec<Thunk>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let rx = rx.clone();
                    scope.spawn(move || self.worker_loop(rx, depth))
                })
                .collect();
            handles.into_iter().map(|h| h.join().expect("explorer worker thread panicked")).collect()
        });

        self.take_error()?;
        Ok(results.into_iter().flatten().collect())
    }

    fn worker_loop(&self, rx: crossbeam_channel::Receiver<Thunk>, depth: usize) -> Vec<Thunk> {
        let mut next = Vec::new();
        while let Ok(thunk) = rx.recv() {
            if self.should_cancel() {
                continue;
            }
            self.report.lock().stats.total_transitions += 1;
            let successors = match advance(self.program, self.registry, self.options, &thunk.state, thunk.thread) {
                Ok(s) => s,
                Err(err) => {
                    self.record_error(err.into());
                    continue;
                },
            };
            for successor in successors {
                if self.should_cancel() {
                    break;
                }
                if let Err(err) = self.process_successor(&thunk, successor, depth, &mut next) {
                    self.record_error(err);
                    break;
                }
            }
        }
        next
    }

    fn process_successor(
        &self,
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

        if !self.claim(hash) {
            self.report.lock().stats.duplicates += 1;
            return Ok(());
        }
        self.report.lock().stats.unique_states += 1;
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

    fn record_observation(&self, state: &State, hash: Hash, depth: usize) -> Result<(), ExploreError> {
        let globals_hash = encode_globals(self.store, &state.globals)?;
        let weak = weak_hash(self.store, globals_hash, state);
        if let Some(warning) = self.weak_log.lock().observe(self.store, weak, depth, hash) {
            let mut report = self.report.lock();
            report.livelocks.push(warning);
            report.stats.livelock_count += 1;
        }
        Ok(())
    }

    fn check_always(
        &self,
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
        &self,
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
        &self,
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

    fn handle_cycle(&self, thunk: &Thunk, closing_hash: Hash) -> Result<(), ExploreError> {
        let trail: Vec<Hash> = thunk.path_trail().collect();
        let cycle_start = trail.iter().position(|&h| h == closing_hash).expect("caller verified membership");

        let cycle_hashes = &trail[cycle_start..];
        let cycle_states =
            cycle_hashes.iter().map(|&h| crate::cas_entries::get_state(self.store, h)).collect::<Result<Vec<_>, _>>()?;

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

    fn record_deadlock(&self, thread: Option<ThreadId>, thread_name: Option<String>, depth: usize, hash: Hash, trace: Vec<TraceStep>) {
        self.push_violation(None, ViolationKind::Deadlock, thread, thread_name, depth, hash, trace);
    }

    #[allow(clippy::too_many_arguments)]
    fn push_violation(
        &self,
        property: Option<String>,
        kind: ViolationKind,
        thread: Option<ThreadId>,
        thread_name: Option<String>,
        depth: usize,
        final_state: Hash,
        trace: Vec<TraceStep>,
    ) {
        let mut report = self.report.lock();
        report.violations.push(Violation {
            property,
            kind,
            thread,
            thread_name,
            depth,
            state_number: final_state.as_u64() as usize,
            trace,
            final_state,
        });
        report.stats.violation_count += 1;
        drop(report);
        if !self.config.keep_going {
            self.cancel.store(true, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tw_bytecode::{Block, Op};
    use tw_interp::{Frame, Globals, Thread};
    use tw_value::{ExecPtr, Value, MAIN_BLOCK};

    use super::*;
    use crate::state::ThreadSet;

    fn program_with(ops: Vec<Op>, lines: Vec<u32>) -> Program {
        Program { main: Block::new(ops, lines), functions: vec![], exports: BTreeMap::new() }
    }

    #[test]
    fn matches_the_serial_engine_on_a_deadlock_free_program() {
        let program = program_with(vec![Op::Push(Value::Int(1)), Op::Return], vec![1, 1]);
        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let initial = State::new(Globals::default(), vec![ThreadSet::new("t", vec![thread])]);

        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let store = Store::new();
        let report = explore_parallel(
            &program,
            &registry,
            &options,
            &store,
            &[],
            &ExploreConfig::default(),
            vec![initial],
            DEFAULT_WORKERS,
        )
        .unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.stats.unique_states, 2);
    }

    /// The same racing-replica scenario `explorer::tests` exercises serially: with two unfair
    /// replicas permanently testing a false wait condition, the jointly-waiting state has no
    /// eligible thread and must surface as a deadlock under either engine.
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
        let report =
            explore_parallel(&program, &registry, &options, &store, &[], &config, vec![initial], 2).unwrap();
        assert!(report.violations.iter().any(|v| v.kind == ViolationKind::Deadlock));
    }

    #[test]
    fn stopping_on_first_violation_cancels_remaining_workers() {
        let ops = vec![Op::Push(Value::Bool(false)), Op::Return];
        let lines = vec![1, 1];
        let program = program_with(ops, lines);

        let thread = Thread::new(Frame::at(ExecPtr::entry(MAIN_BLOCK)), false, false);
        let initial = State::new(Globals::default(), vec![ThreadSet::new("t", vec![thread])]);

        let registry = Registry::standard();
        let options = ExecutionOptions::default();
        let store = Store::new();
        let properties = vec![Property { name: "never".into(), operator: Operator::Always, entry: ExecPtr::entry(0) }];
        let config = ExploreConfig { keep_going: false, ..ExploreConfig::default() };
        let report =
            explore_parallel(&program, &registry, &options, &store, &properties, &config, vec![initial], 4).unwrap();
        assert!(!report.violations.is_empty());
    }
}
