//! Livelock detection (§4.4): a *weak* state hash identifies states that are semantically
//! equivalent (same globals, same per-thread pause reasons) but differ in control-flow position
//! (different PCs, locals, iterator cursors). Seeing the same weak hash recur at a consistent
//! depth interval at least three times is reported as an advisory warning — it never fails the
//! run by itself.

use std::collections::HashMap;

use tw_cas::{Hash, Store, StoreEntry};
use tw_interp::PauseReason;

use crate::report::LivelockWarning;
use crate::state::State;

/// Tracks, per weak hash, the full-state hash observed at each depth. `tw_cas::Store`'s own
/// weak-state index (§4.2) is the append-log of record required by the spec; this side table is
/// this crate's own bookkeeping so a qualifying [`LivelockWarning`] can report *which* full state
/// was seen first and which is current, something a depth-only log cannot answer on its own.
#[derive(Debug, Default)]
pub struct WeakStateLog {
    by_weak: HashMap<Hash, Vec<(usize, Hash)>>,
}

impl WeakStateLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation and returns a warning if the pattern now qualifies (§4.4: at
    /// least three observations with a consistent depth interval between the three most recent).
    pub fn observe(&mut self, store: &Store, weak: Hash, depth: usize, full_hash: Hash) -> Option<LivelockWarning> {
        store.record_weak_observation(weak, depth);
        let entries = self.by_weak.entry(weak).or_default();
        entries.push((depth, full_hash));
        let depths: Vec<usize> = entries.iter().map(|(d, _)| *d).collect();
        if !has_consistent_interval(&depths) {
            return None;
        }
        let first_state = entries[entries.len() - 3].1;
        Some(build_warning(weak, depths, first_state, full_hash))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct WeakStateShadow {
    globals: Hash,
    /// Flattened `(set, local)`-order pause reasons — PC, operand stacks and locals are
    /// deliberately excluded (§4.4).
    pauses: Vec<PauseReason>,
}

impl StoreEntry for WeakStateShadow {
    const TAG: &'static str = "weak_state";
}

/// Computes the weak hash of `state`, given the full hash of its globals (already computed by the
/// caller while building the full state hash — no need to hash them twice).
pub fn weak_hash(store: &Store, globals_hash: Hash, state: &State) -> Hash {
    let pauses = state.threads().map(|(_, t)| t.pause).collect();
    store
        .put(&WeakStateShadow { globals: globals_hash, pauses })
        .expect("weak-state shadow serialization cannot fail")
}

/// Three most-recent depths with a consistent interval: `d2 - d1 == d3 - d2` (§4.4).
fn has_consistent_interval(depths: &[usize]) -> bool {
    if depths.len() < 3 {
        return false;
    }
    let n = depths.len();
    let (d1, d2, d3) = (depths[n - 3], depths[n - 2], depths[n - 1]);
    d2 >= d1 && d3 >= d2 && (d2 - d1) == (d3 - d2)
}

fn build_warning(weak: Hash, depths: Vec<usize>, first_state: Hash, current_state: Hash) -> LivelockWarning {
    LivelockWarning { weak_hash: weak, depths, first_state, current_state }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_observations_with_consistent_interval_qualify() {
        assert!(has_consistent_interval(&[2, 5, 8]));
        assert!(has_consistent_interval(&[0, 1, 3, 5, 7]));
    }

    #[test]
    fn inconsistent_interval_does_not_qualify() {
        assert!(!has_consistent_interval(&[2, 5, 9]));
    }

    #[test]
    fn fewer_than_three_observations_never_qualifies() {
        assert!(!has_consistent_interval(&[1, 2]));
        assert!(!has_consistent_interval(&[]));
    }

    #[test]
    fn observe_reports_a_warning_once_the_pattern_emerges() {
        let store = Store::new();
        let mut log = WeakStateLog::new();
        let weak = Hash::from_u64(7);
        let full = |n: u64| Hash::from_u64(n);
        assert!(log.observe(&store, weak, 1, full(101)).is_none());
        assert!(log.observe(&store, weak, 3, full(103)).is_none());
        let warning = log.observe(&store, weak, 5, full(105)).unwrap();
        assert_eq!(warning.weak_hash, weak);
        assert_eq!(warning.depths, vec![1, 3, 5]);
        assert_eq!(warning.first_state, full(101));
        assert_eq!(warning.current_state, full(105));
    }

    #[test]
    fn distinct_weak_hashes_are_tracked_independently() {
        let store = Store::new();
        let mut log = WeakStateLog::new();
        let a = Hash::from_u64(1);
        let b = Hash::from_u64(2);
        assert!(log.observe(&store, a, 1, Hash::from_u64(10)).is_none());
        assert!(log.observe(&store, b, 2, Hash::from_u64(20)).is_none());
        assert!(log.observe(&store, a, 3, Hash::from_u64(10)).is_none());
        assert!(log.observe(&store, b, 6, Hash::from_u64(20)).is_none());
        assert!(log.observe(&store, a, 5, Hash::from_u64(10)).is_some());
        assert!(log.observe(&store, b, 10, Hash::from_u64(20)).is_some());
    }
}
