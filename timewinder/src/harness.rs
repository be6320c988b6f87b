//! Harness / glue (§6 "Entry-point seeding", §2's "Harness / glue" component row): turns an
//! already-compiled [`Program`] plus a [`RunConfig`] into the initial [`tw_explore::State`] and
//! drives the explorer to completion.

use std::sync::Arc;

use tw_bytecode::Program;
use tw_cas::Store;
use tw_interp::{Frame, Globals, Registry, Thread};
use tw_explore::{explore, explore_parallel, ExploreConfig, ExploreError, Property, RunReport, State, ThreadSet};

use crate::config::RunConfig;

/// Builds the seed state from `config.threads`/`config.initial_globals` and runs the explorer to
/// completion: the serial engine, unless `config.flags.workers` asks for the parallel one.
pub fn run(program: Arc<Program>, config: RunConfig) -> Result<RunReport, ExploreError> {
    let registry = Registry::standard();
    let store = Store::new();

    let thread_sets = config
        .threads
        .iter()
        .map(|t| {
            let replicas = t.replicas.max(1);
            let threads =
                (0..replicas).map(|_| Thread::new(Frame::at(t.entry), t.fair, t.strong_fair)).collect();
            ThreadSet::new(t.name.clone(), threads)
        })
        .collect();

    let mut globals = Globals::default();
    for (name, value) in &config.initial_globals {
        globals.set(name.clone(), value.clone());
    }
    let initial = State::new(globals, thread_sets);

    let properties: Vec<Property> = config
        .properties
        .iter()
        .map(|p| Property { name: p.name.clone(), operator: p.operator, entry: p.entry })
        .collect();

    let explore_config = ExploreConfig {
        keep_going: config.flags.keep_going,
        no_deadlocks: config.flags.no_deadlocks,
        termination: config.flags.termination,
        max_depth: config.flags.max_depth,
    };

    match config.flags.workers {
        None => explore(&program, &registry, &config.execution_options, &store, &properties, &explore_config, vec![
            initial,
        ]),
        Some(workers) => explore_parallel(
            &program,
            &registry,
            &config.execution_options,
            &store,
            &properties,
            &explore_config,
            vec![initial],
            workers.max(1),
        ),
    }
}
