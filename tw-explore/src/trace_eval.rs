//! Trace-wise temporal evaluation (§4.5): rehydrating a span of state hashes from the CAS and
//! checking `Eventually` / `EventuallyAlways` / `AlwaysEventually` against it. `Always` is checked
//! point-wise during the BFS itself (`crate::explorer`) and never reaches this module.

use tw_bytecode::Program;
use tw_cas::{Hash, Store};
use tw_interp::{ExecutionOptions, Registry};

use crate::cas_entries::get_state;
use crate::errors::ExploreError;
use crate::property::{self, Operator, Property};

/// Evaluates `prop` at every state named in `trail`, in order.
fn bools_along(
    store: &Store,
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    prop: &Property,
    trail: &[Hash],
) -> Result<Vec<bool>, ExploreError> {
    trail
        .iter()
        .map(|&h| {
            let state = get_state(store, h)?;
            Ok(property::evaluate(program, registry, options, prop, &state.globals)?)
        })
        .collect()
}

/// The names of every non-`Always` property that fails to hold over `trail`. `cyclic` selects the
/// cyclic-trace rule (§4.5) over the terminating-trace rule for `EventuallyAlways` and
/// `AlwaysEventually`; `Eventually` uses the same "holds somewhere in the trail" check either way.
pub fn failed_properties(
    store: &Store,
    program: &Program,
    registry: &Registry,
    options: &ExecutionOptions,
    properties: &[Property],
    trail: &[Hash],
    cyclic: bool,
) -> Result<Vec<Property>, ExploreError> {
    let mut failures = Vec::new();
    for prop in properties {
        if prop.operator == Operator::Always {
            continue;
        }
        let bools = bools_along(store, program, registry, options, prop, trail)?;
        let holds = match (prop.operator, cyclic) {
            (Operator::Eventually, _) => property::eventually_holds(&bools),
            (Operator::EventuallyAlways, false) => property::eventually_always_holds(&bools),
            (Operator::EventuallyAlways, true) => property::eventually_always_holds_cyclic(&bools),
            (Operator::AlwaysEventually, false) => property::always_eventually_holds_terminating(&bools),
            (Operator::AlwaysEventually, true) => property::always_eventually_holds_cyclic(&bools),
            (Operator::Always, _) => unreachable!("filtered above"),
        };
        if !holds {
            failures.push(prop.clone());
        }
    }
    Ok(failures)
}
