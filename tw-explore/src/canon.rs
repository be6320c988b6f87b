//! Expands any [`Value::NonDet`] embedded anywhere in a state into one state per choice (§3
//! Canonicaliser). A canonical state, by construction, contains no `NonDet` values (§8
//! "Canonicalisation saturation").
//!
//! `NonDet` values reach a state in two ways: the interpreter's own yield-on-`NonDet` path
//! (handled by the explorer at the point a thread's run produces a `YieldKind::NonDet`, *before*
//! the state is ever built — see `crate::explorer::succ`), and a `NonDet` value a program embeds
//! into a variable, array element, or map value without going through that yield protocol (e.g.
//! nesting a nondeterministic builtin's result inside a list literal). The canonicaliser is the
//! second, general-purpose mechanism that catches the latter.

use tw_value::Value;

use crate::state::State;

/// Finds the first `NonDet` value reachable from `state`'s globals or any thread's variables, and
/// returns how to split on it. Array elements, map values, and argument-thunk payloads are
/// searched recursively; the iterator cursors and program counters are not, since no opcode can
/// currently construct a `NonDet` there without first passing through a frame variable.
fn find_first_nondet(state: &State) -> Option<Choice> {
    for (name, value) in state.globals.as_map() {
        if let Some(path) = find_in_value(value) {
            return Some(Choice::Global { name: name.clone(), path });
        }
    }
    for (set_idx, set) in state.thread_sets.iter().enumerate() {
        for (local_idx, thread) in set.threads.iter().enumerate() {
            for (frame_idx, frame) in thread.frames.iter().enumerate() {
                for (name, value) in &frame.vars {
                    if let Some(path) = find_in_value(value) {
                        return Some(Choice::Local { set: set_idx, local: local_idx, frame: frame_idx, name: name.clone(), path });
                    }
                }
            }
        }
    }
    None
}

/// Where, inside one root value, a `NonDet` was found: a sequence of "descend into" steps from
/// the root down to the `NonDet` itself.
#[derive(Debug, Clone)]
enum Step {
    ArrayIndex(usize),
    MapKey(String),
    ArgValue,
}

#[derive(Debug, Clone)]
enum Choice {
    Global { name: String, path: Vec<Step> },
    Local { set: usize, local: usize, frame: usize, name: String, path: Vec<Step> },
}

fn find_in_value(value: &Value) -> Option<Vec<Step>> {
    match value {
        Value::NonDet(_) => Some(Vec::new()),
        Value::Array(items) => items.iter().enumerate().find_map(|(i, v)| {
            find_in_value(v).map(|mut path| {
                path.insert(0, Step::ArrayIndex(i));
                path
            })
        }),
        Value::Map(map) => map.iter().find_map(|(k, v)| {
            find_in_value(v).map(|mut path| {
                path.insert(0, Step::MapKey(k.clone()));
                path
            })
        }),
        Value::Arg { value, .. } => find_in_value(value).map(|mut path| {
            path.insert(0, Step::ArgValue);
            path
        }),
        _ => None,
    }
}

/// Replaces the value at `path` inside `root` with `replacement`, returning the choices that were
/// offered there (empty path means `root` itself is the `NonDet`).
fn take_choices(root: &mut Value, path: &[Step]) -> Vec<Value> {
    match path.split_first() {
        None => match std::mem::replace(root, Value::Bool(false)) {
            Value::NonDet(choices) => choices,
            other => {
                *root = other;
                Vec::new()
            },
        },
        Some((Step::ArrayIndex(i), rest)) => {
            let Value::Array(items) = root else { return Vec::new() };
            take_choices(&mut items[*i], rest)
        },
        Some((Step::MapKey(k), rest)) => {
            let Value::Map(map) = root else { return Vec::new() };
            match map.get_mut(k) {
                Some(v) => take_choices(v, rest),
                None => Vec::new(),
            }
        },
        Some((Step::ArgValue, rest)) => {
            let Value::Arg { value, .. } = root else { return Vec::new() };
            take_choices(value, rest)
        },
    }
}

fn put_choice(root: &mut Value, path: &[Step], chosen: Value) {
    match path.split_first() {
        None => *root = chosen,
        Some((Step::ArrayIndex(i), rest)) => {
            if let Value::Array(items) = root {
                put_choice(&mut items[*i], rest, chosen);
            }
        },
        Some((Step::MapKey(k), rest)) => {
            if let Value::Map(map) = root {
                if let Some(v) = map.get_mut(k) {
                    put_choice(v, rest, chosen);
                }
            }
        },
        Some((Step::ArgValue, rest)) => {
            if let Value::Arg { value, .. } = root {
                put_choice(value, rest, chosen);
            }
        },
    }
}

/// Splits `state` on the first embedded `NonDet` value, one output state per choice. A `NonDet`
/// with an empty choice list is the distinguished "no choice" value (§8 boundary behaviour): it
/// contributes *zero* branches, so the whole path through this `NonDet` dies rather than
/// producing a state with the slot left unresolved.
fn split_on(mut state: State, choice: Choice) -> Vec<State> {
    let choices = match &choice {
        Choice::Global { name, path } => {
            let value = state.globals.as_map().get(name).expect("path was found in this value").clone();
            let mut value = value;
            let choices = take_choices(&mut value, path);
            state.globals.set(name.clone(), value);
            choices
        },
        Choice::Local { set, local, frame, name, path } => {
            let value = state.thread_sets[*set].threads[*local].frames[*frame].vars[name].clone();
            let mut value = value;
            let choices = take_choices(&mut value, path);
            state.thread_sets[*set].threads[*local].frames[*frame].vars.insert(name.clone(), value);
            choices
        },
    };

    choices
        .into_iter()
        .map(|chosen| {
            let mut branch = state.clone();
            match &choice {
                Choice::Global { name, path } => {
                    let mut value = branch.globals.as_map().get(name).expect("just set above").clone();
                    put_choice(&mut value, path, chosen);
                    branch.globals.set(name.clone(), value);
                },
                Choice::Local { set, local, frame, name, path } => {
                    let mut value = branch.thread_sets[*set].threads[*local].frames[*frame].vars[name].clone();
                    put_choice(&mut value, path, chosen);
                    branch.thread_sets[*set].threads[*local].frames[*frame].vars.insert(name.clone(), value);
                },
            }
            branch
        })
        .collect()
}

/// Expands `state` into every canonical (i.e. `NonDet`-free) state it represents. A state with no
/// embedded `NonDet` at all expands to exactly itself.
pub fn canonicalize(state: State) -> Vec<State> {
    match find_first_nondet(&state) {
        None => vec![state],
        Some(choice) => split_on(state, choice).into_iter().flat_map(canonicalize).collect(),
    }
}

/// True iff `state` contains no embedded `NonDet` value — the postcondition every caller of
/// [`canonicalize`] relies on ("canonicalisation saturation", §8).
pub fn is_canonical(state: &State) -> bool {
    find_first_nondet(state).is_none()
}

#[cfg(test)]
mod tests {
    use tw_interp::{Frame, Globals, Thread};
    use tw_value::ExecPtr;

    use super::*;
    use crate::state::ThreadSet;

    fn state_with_global(value: Value) -> State {
        let mut globals = Globals::default();
        globals.set("x", value);
        State::new(globals, vec![ThreadSet::new("t", vec![Thread::new(Frame::at(ExecPtr::entry(0)), false, false)])])
    }

    #[test]
    fn state_with_no_nondet_expands_to_itself() {
        let state = state_with_global(Value::Int(1));
        let expanded = canonicalize(state.clone());
        assert_eq!(expanded, vec![state]);
    }

    #[test]
    fn nondet_global_expands_to_one_state_per_choice() {
        let state = state_with_global(Value::NonDet(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        let expanded = canonicalize(state);
        assert_eq!(expanded.len(), 3);
        let values: Vec<_> = expanded.iter().map(|s| s.globals.get("x").unwrap().clone()).collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        for s in &expanded {
            assert!(is_canonical(s));
        }
    }

    #[test]
    fn empty_nondet_produces_zero_branches() {
        let state = state_with_global(Value::NonDet(vec![]));
        let expanded = canonicalize(state);
        assert!(expanded.is_empty());
    }

    #[test]
    fn nested_nondet_inside_array_is_found_and_split() {
        let state = state_with_global(Value::Array(vec![
            Value::Int(0),
            Value::NonDet(vec![Value::Int(10), Value::Int(20)]),
        ]));
        let expanded = canonicalize(state);
        assert_eq!(expanded.len(), 2);
        for s in &expanded {
            assert!(is_canonical(s));
        }
    }

    #[test]
    fn multiple_nondet_values_expand_to_their_cartesian_product() {
        let mut globals = Globals::default();
        globals.set("a", Value::NonDet(vec![Value::Int(1), Value::Int(2)]));
        globals.set("b", Value::NonDet(vec![Value::Int(10), Value::Int(20)]));
        let state = State::new(globals, vec![]);
        let expanded = canonicalize(state);
        assert_eq!(expanded.len(), 4);
        for s in &expanded {
            assert!(is_canonical(s));
        }
    }
}
