use crate::hash::Hash;
use crate::store::{CasError, Store, StoreEntry};

/// Below this many elements, an array is stored inline in its parent's record rather than as a
/// separate CAS entry (§4.2's inline-storage threshold).
pub const ARRAY_INLINE_MAX: usize = 5;
/// Below this many fields, a map is stored inline rather than referenced.
pub const MAP_INLINE_MAX: usize = 3;

/// A child of a compound domain object, either inlined directly or stored as a reference to its
/// own CAS entry.
///
/// This is the mechanism behind "decomposition": a parent record (a `StoredState`, a
/// `StoredFrame`, ...) holds a `Slot<T>` per child rather than `T` directly, so unchanged
/// substructures reuse hashes across states instead of being copied.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Slot<T> {
    Inline(T),
    Ref(Hash),
}

impl<T: StoreEntry + Clone> Slot<T> {
    /// Commits `value` as a reference slot, unconditionally.
    pub fn referenced(store: &Store, value: &T) -> Result<Self, CasError> {
        Ok(Slot::Ref(store.put(value)?))
    }

    /// Builds a slot, inlining `value` when `size` is below `threshold` and otherwise committing
    /// it to the store as a reference.
    pub fn decompose(store: &Store, value: T, size: usize, threshold: usize) -> Result<Self, CasError> {
        if size < threshold {
            Ok(Slot::Inline(value))
        } else {
            Ok(Slot::Ref(store.put(&value)?))
        }
    }

    /// Resolves this slot back to its value, fetching from the store if it was a reference.
    pub fn resolve(&self, store: &Store) -> Result<T, CasError> {
        match self {
            Slot::Inline(value) => Ok(value.clone()),
            Slot::Ref(hash) => store.get(*hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Blob(Vec<i64>);
    impl StoreEntry for Blob {
        const TAG: &'static str = "blob";
    }

    #[test]
    fn small_values_are_inlined() {
        let store = Store::new();
        let slot = Slot::decompose(&store, Blob(vec![1, 2]), 2, ARRAY_INLINE_MAX).unwrap();
        assert!(matches!(slot, Slot::Inline(_)));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn large_values_become_references() {
        let store = Store::new();
        let slot = Slot::decompose(&store, Blob(vec![0; 8]), 8, ARRAY_INLINE_MAX).unwrap();
        assert!(matches!(slot, Slot::Ref(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(slot.resolve(&store).unwrap(), Blob(vec![0; 8]));
    }
}
