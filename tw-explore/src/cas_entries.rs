//! "Stored shadow" types for every compound domain object the explorer persists (§4.2): each
//! mirrors a live type from `tw-value`/`tw-interp`/this crate's own [`crate::state`], but with
//! every nested compound replaced by a [`Slot`] so that unchanged substructure reuses hashes
//! across states. Maps always encode as two parallel, already-sorted `(names, slots)` vectors —
//! `BTreeMap` already iterates in key order, so no extra sort is needed here — giving a byte
//! representation independent of insertion order (§4.2).
//!
//! This module only knows how to convert back and forth; it has no opinion on *when* something
//! should be decomposed versus stored fresh each time — that policy lives in [`Slot::decompose`].

use std::collections::BTreeMap;

use tw_cas::{CasError, Hash, Slot, Store, StoreEntry, ARRAY_INLINE_MAX, MAP_INLINE_MAX};
use tw_interp::{FairnessTag, Frame, Globals, IterCursor, IterState, IterVars, PauseReason, Thread, WaitDescriptor};
use tw_value::{ExecPtr, Value};

use crate::state::{State, ThreadSet};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StoredValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Slot<StoredValue>>),
    /// Parallel sorted `(keys, values)`, never the insertion-order map directly (§4.2).
    Map(Vec<String>, Vec<Slot<StoredValue>>),
    Func(ExecPtr),
    Builtin(String),
    Arg { key: Option<String>, value: Box<Slot<StoredValue>> },
    NonDet(Vec<Slot<StoredValue>>),
}

impl StoreEntry for StoredValue {
    const TAG: &'static str = "value";
}

pub fn encode_value(store: &Store, value: &Value) -> Result<Slot<StoredValue>, CasError> {
    let slot = match value {
        Value::Bool(b) => Slot::Inline(StoredValue::Bool(*b)),
        Value::Int(i) => Slot::Inline(StoredValue::Int(*i)),
        Value::Float(f) => Slot::Inline(StoredValue::Float(*f)),
        Value::Str(s) => Slot::Inline(StoredValue::Str(s.clone())),
        Value::Array(items) => {
            let children = items.iter().map(|v| encode_value(store, v)).collect::<Result<Vec<_>, _>>()?;
            let len = items.len();
            Slot::decompose(store, StoredValue::Array(children), len, ARRAY_INLINE_MAX)?
        },
        Value::Map(map) => {
            let mut names = Vec::with_capacity(map.len());
            let mut slots = Vec::with_capacity(map.len());
            for (k, v) in map {
                names.push(k.clone());
                slots.push(encode_value(store, v)?);
            }
            let len = map.len();
            Slot::decompose(store, StoredValue::Map(names, slots), len, MAP_INLINE_MAX)?
        },
        Value::Func(ptr) => Slot::Inline(StoredValue::Func(*ptr)),
        Value::Builtin(name) => Slot::Inline(StoredValue::Builtin(name.clone())),
        Value::Arg { key, value } => {
            let inner = encode_value(store, value)?;
            Slot::Inline(StoredValue::Arg { key: key.clone(), value: Box::new(inner) })
        },
        Value::NonDet(choices) => {
            let children = choices.iter().map(|v| encode_value(store, v)).collect::<Result<Vec<_>, _>>()?;
            Slot::Inline(StoredValue::NonDet(children))
        },
    };
    Ok(slot)
}

pub fn decode_value(store: &Store, slot: &Slot<StoredValue>) -> Result<Value, CasError> {
    decode_stored(store, &slot.resolve(store)?)
}

fn decode_stored(store: &Store, stored: &StoredValue) -> Result<Value, CasError> {
    Ok(match stored {
        StoredValue::Bool(b) => Value::Bool(*b),
        StoredValue::Int(i) => Value::Int(*i),
        StoredValue::Float(f) => Value::Float(*f),
        StoredValue::Str(s) => Value::Str(s.clone()),
        StoredValue::Array(children) => {
            Value::Array(children.iter().map(|s| decode_value(store, s)).collect::<Result<Vec<_>, _>>()?)
        },
        StoredValue::Map(names, slots) => {
            let mut map = BTreeMap::new();
            for (name, slot) in names.iter().zip(slots.iter()) {
                map.insert(name.clone(), decode_value(store, slot)?);
            }
            Value::Map(map)
        },
        StoredValue::Func(ptr) => Value::Func(*ptr),
        StoredValue::Builtin(name) => Value::Builtin(name.clone()),
        StoredValue::Arg { key, value } => {
            Value::Arg { key: key.clone(), value: Box::new(decode_value(store, value)?) }
        },
        StoredValue::NonDet(children) => {
            Value::NonDet(children.iter().map(|s| decode_value(store, s)).collect::<Result<Vec<_>, _>>()?)
        },
    })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredGlobals(Vec<(String, Slot<StoredValue>)>);

impl StoreEntry for StoredGlobals {
    const TAG: &'static str = "globals";
}

pub fn encode_globals(store: &Store, globals: &Globals) -> Result<Hash, CasError> {
    let entries = globals
        .as_map()
        .iter()
        .map(|(k, v)| Ok((k.clone(), encode_value(store, v)?)))
        .collect::<Result<Vec<_>, CasError>>()?;
    store.put(&StoredGlobals(entries))
}

pub fn decode_globals(store: &Store, hash: Hash) -> Result<Globals, CasError> {
    let stored: StoredGlobals = store.get(hash)?;
    let mut map = BTreeMap::new();
    for (name, slot) in stored.0 {
        map.insert(name, decode_value(store, &slot)?);
    }
    Ok(Globals::new(map))
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
enum StoredIterVars {
    One(String),
    Two(String, String),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
enum StoredIterCursor {
    Seq { index: usize, values: Vec<Slot<StoredValue>> },
    Map { index: usize, entries: Vec<(String, Slot<StoredValue>)> },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredIterState {
    resume: ExecPtr,
    exit: ExecPtr,
    vars: StoredIterVars,
    cursor: StoredIterCursor,
}

impl StoreEntry for StoredIterState {
    const TAG: &'static str = "iter_state";
}

fn encode_iter_state(store: &Store, it: &IterState) -> Result<Hash, CasError> {
    let vars = match &it.vars {
        IterVars::One(n) => StoredIterVars::One(n.clone()),
        IterVars::Two(a, b) => StoredIterVars::Two(a.clone(), b.clone()),
    };
    let cursor = match &it.cursor {
        IterCursor::Seq { index, values } => StoredIterCursor::Seq {
            index: *index,
            values: values.iter().map(|v| encode_value(store, v)).collect::<Result<Vec<_>, _>>()?,
        },
        IterCursor::Map { index, entries } => StoredIterCursor::Map {
            index: *index,
            entries: entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), encode_value(store, v)?)))
                .collect::<Result<Vec<_>, CasError>>()?,
        },
    };
    store.put(&StoredIterState { resume: it.resume, exit: it.exit, vars, cursor })
}

fn decode_iter_state(store: &Store, hash: Hash) -> Result<IterState, CasError> {
    let stored: StoredIterState = store.get(hash)?;
    let vars = match stored.vars {
        StoredIterVars::One(n) => IterVars::One(n),
        StoredIterVars::Two(a, b) => IterVars::Two(a, b),
    };
    let cursor = match stored.cursor {
        StoredIterCursor::Seq { index, values } => IterCursor::Seq {
            index,
            values: values.iter().map(|s| decode_value(store, s)).collect::<Result<Vec<_>, _>>()?,
        },
        StoredIterCursor::Map { index, entries } => IterCursor::Map {
            index,
            entries: entries
                .iter()
                .map(|(k, s)| Ok((k.clone(), decode_value(store, s)?)))
                .collect::<Result<Vec<_>, CasError>>()?,
        },
    };
    Ok(IterState { resume: stored.resume, exit: stored.exit, vars, cursor })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredFrame {
    pc: ExecPtr,
    /// Sorted by name (the live `Frame::vars` is already a `BTreeMap`), mirroring the map
    /// encoding's canonical-order rule.
    vars: Vec<(String, Slot<StoredValue>)>,
    iterators: Vec<Hash>,
    wait: Option<WaitDescriptor>,
}

impl StoreEntry for StoredFrame {
    const TAG: &'static str = "frame";
}

/// Frames are only ever persisted at yield points (Invariant 1, §3): the operand stack is always
/// empty there, so it is not part of the stored shadow at all.
fn encode_frame(store: &Store, frame: &Frame) -> Result<Hash, CasError> {
    debug_assert!(frame.stack_is_empty_at_yield(), "frames must only be persisted at a yield point");
    let vars = frame
        .vars
        .iter()
        .map(|(k, v)| Ok((k.clone(), encode_value(store, v)?)))
        .collect::<Result<Vec<_>, CasError>>()?;
    let iterators = frame.iterators.iter().map(|it| encode_iter_state(store, it)).collect::<Result<Vec<_>, _>>()?;
    store.put(&StoredFrame { pc: frame.pc, vars, iterators, wait: frame.wait })
}

fn decode_frame(store: &Store, hash: Hash) -> Result<Frame, CasError> {
    let stored: StoredFrame = store.get(hash)?;
    let mut vars = BTreeMap::new();
    for (name, slot) in stored.vars {
        vars.insert(name, decode_value(store, &slot)?);
    }
    let iterators = stored.iterators.iter().map(|h| decode_iter_state(store, *h)).collect::<Result<Vec<_>, _>>()?;
    Ok(Frame { stack: Vec::new(), pc: stored.pc, vars, iterators, wait: stored.wait })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredThread {
    frames: Vec<Hash>,
    pause: PauseReason,
    weakly_fair: bool,
    strongly_fair: bool,
}

impl StoreEntry for StoredThread {
    const TAG: &'static str = "thread";
}

fn encode_thread(store: &Store, thread: &Thread) -> Result<Hash, CasError> {
    let frames = thread.frames.iter().map(|f| encode_frame(store, f)).collect::<Result<Vec<_>, _>>()?;
    store.put(&StoredThread {
        frames,
        pause: thread.pause,
        weakly_fair: thread.weakly_fair,
        strongly_fair: thread.strongly_fair,
    })
}

fn decode_thread(store: &Store, hash: Hash) -> Result<Thread, CasError> {
    let stored: StoredThread = store.get(hash)?;
    let frames = stored.frames.iter().map(|h| decode_frame(store, *h)).collect::<Result<Vec<_>, _>>()?;
    Ok(Thread { frames, pause: stored.pause, weakly_fair: stored.weakly_fair, strongly_fair: stored.strongly_fair })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredThreadSet {
    entry_name: String,
    threads: Vec<Hash>,
}

impl StoreEntry for StoredThreadSet {
    const TAG: &'static str = "thread_set";
}

fn encode_thread_set(store: &Store, set: &ThreadSet) -> Result<Hash, CasError> {
    let threads = set.threads.iter().map(|t| encode_thread(store, t)).collect::<Result<Vec<_>, _>>()?;
    store.put(&StoredThreadSet { entry_name: set.entry_name.clone(), threads })
}

fn decode_thread_set(store: &Store, hash: Hash) -> Result<ThreadSet, CasError> {
    let stored: StoredThreadSet = store.get(hash)?;
    let threads = stored.threads.iter().map(|h| decode_thread(store, *h)).collect::<Result<Vec<_>, _>>()?;
    Ok(ThreadSet { entry_name: stored.entry_name, threads })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredState {
    globals: Hash,
    thread_sets: Vec<Hash>,
}

impl StoreEntry for StoredState {
    const TAG: &'static str = "state";
}

/// Commits `state` to the store, returning the hash that identifies it (§3: a state's identity
/// *is* its content hash). Unchanged thread sets, threads, frames, arrays and maps between two
/// successive states reuse their existing hashes rather than being re-serialized.
pub fn put_state(store: &Store, state: &State) -> Result<Hash, CasError> {
    let globals = encode_globals(store, &state.globals)?;
    let thread_sets = state.thread_sets.iter().map(|ts| encode_thread_set(store, ts)).collect::<Result<Vec<_>, _>>()?;
    store.put(&StoredState { globals, thread_sets })
}

/// Rehydrates a state previously committed with [`put_state`].
pub fn get_state(store: &Store, hash: Hash) -> Result<State, CasError> {
    let stored: StoredState = store.get(hash)?;
    let globals = decode_globals(store, stored.globals)?;
    let thread_sets = stored.thread_sets.iter().map(|h| decode_thread_set(store, *h)).collect::<Result<Vec<_>, _>>()?;
    Ok(State { globals, thread_sets })
}

#[cfg(test)]
mod tests {
    use tw_interp::Thread;

    use super::*;
    use crate::state::ThreadSet;

    fn sample_state() -> State {
        let mut globals = Globals::default();
        globals.set("a", Value::Int(10));
        globals.set("b", Value::Int(10));
        let frame = Frame::at(ExecPtr::entry(1));
        let thread = Thread::new(frame, false, false);
        State::new(globals, vec![ThreadSet::new("writer", vec![thread.clone(), thread])])
    }

    #[test]
    fn round_trips_through_the_store() {
        let store = Store::new();
        let state = sample_state();
        let hash = put_state(&store, &state).unwrap();
        let back = get_state(&store, hash).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn structurally_equal_states_hash_equal() {
        let store = Store::new();
        let h1 = put_state(&store, &sample_state()).unwrap();
        let h2 = put_state(&store, &sample_state()).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn unchanged_thread_set_reuses_its_hash_across_states() {
        let store = Store::new();
        let mut s1 = sample_state();
        put_state(&store, &s1).unwrap();
        let entries_after_first = store.len();

        // Mutate only globals; the thread-set subtree is untouched and must reuse its hash.
        s1.globals.set("a", Value::Int(5));
        put_state(&store, &s1).unwrap();
        let entries_after_second = store.len();

        // Only the new globals entry (and the new top-level state entry) should be added, not a
        // second copy of the thread sets.
        assert!(entries_after_second - entries_after_first <= 2);
    }

    #[test]
    fn large_array_is_referenced_not_duplicated_inline() {
        let store = Store::new();
        let big = Value::Array((0..10).map(Value::Int).collect());
        let slot = encode_value(&store, &big).unwrap();
        assert!(matches!(slot, Slot::Ref(_)));
        assert_eq!(decode_value(&store, &slot).unwrap(), big);
    }

    #[test]
    fn small_array_is_inlined() {
        let store = Store::new();
        let small = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        let slot = encode_value(&store, &small).unwrap();
        assert!(matches!(slot, Slot::Inline(_)));
    }
}
