use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::BoundedCache;
use crate::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CasError {
    #[error("failed to encode a {0} entry")]
    Encode(&'static str),
    #[error("failed to decode a {expected} entry (stored bytes are for a '{found}' entry)")]
    TagMismatch { expected: &'static str, found: String },
    #[error("failed to decode a {0} entry: corrupt payload")]
    Decode(&'static str),
    #[error("hash {0} has no entry in the store")]
    MissingEntry(Hash),
}

/// A domain type that can be committed to the content-addressable store.
///
/// `TAG` participates in the hash (see [`Hash::of_tagged`]) so that two types with coincidentally
/// identical serialized payloads never collide. Implementors are typically small "stored shadow"
/// structs — `StoredState`, `StoredFrame`, and so on — whose fields are themselves [`Hash`]es
/// rather than live values; decomposing a compound domain object into child hashes plus a
/// reference record is the caller's job — the CAS itself only knows how to hash and persist
/// whatever bytes it is handed.
pub trait StoreEntry: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TAG: &'static str;
}

struct RawEntry {
    tag: &'static str,
    bytes: Vec<u8>,
}

/// Thread-safe content-addressable store.
///
/// `put`/`get` dedupe by hash: committing the same bytes twice is a no-op the second time, which
/// is exactly the structural sharing the explorer relies on to keep memory bounded across a large
/// state space. A read-write lock guards the backing map; contention is acceptable because the
/// critical sections are short and parallelism in the explorer comes from concurrent state
/// generation, not from hammering the store (§4.2).
pub struct Store {
    entries: RwLock<HashMap<Hash, Arc<RawEntry>>>,
    decode_cache: Option<Mutex<BoundedCache<Hash, Arc<dyn Any + Send + Sync>>>>,
    weak_index: Mutex<HashMap<Hash, Vec<usize>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self { entries: RwLock::new(HashMap::new()), decode_cache: None, weak_index: Mutex::new(HashMap::new()) }
    }

    /// Builds a store with a bounded LRU cache of `capacity` recently-deserialized blobs in
    /// front of `get`. Purely an optimization (§4.2 "Optional cache layer") — `put`/`get`
    /// behave identically with or without it.
    pub fn with_cache(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            decode_cache: Some(Mutex::new(BoundedCache::new(capacity))),
            weak_index: Mutex::new(HashMap::new()),
        }
    }

    /// Serializes `value`, hashes the type-tagged bytes, and stores them if not already present.
    #[tracing::instrument(level = "trace", skip(self, value), fields(tag = T::TAG))]
    pub fn put<T: StoreEntry>(&self, value: &T) -> Result<Hash, CasError> {
        let bytes = bincode::serialize(value).map_err(|_| CasError::Encode(T::TAG))?;
        let hash = Hash::of_tagged(T::TAG, &bytes);

        let already_present = self.entries.read().contains_key(&hash);
        if !already_present {
            let mut entries = self.entries.write();
            entries.entry(hash).or_insert_with(|| Arc::new(RawEntry { tag: T::TAG, bytes }));
        }
        Ok(hash)
    }

    /// Retrieves and deserializes the entry at `hash`, verifying its type tag matches `T`.
    #[tracing::instrument(level = "trace", skip(self), fields(tag = T::TAG))]
    pub fn get<T: StoreEntry + Clone>(&self, hash: Hash) -> Result<T, CasError> {
        if let Some(cache) = &self.decode_cache {
            if let Some(cached) = cache.lock().get(&hash) {
                if let Some(value) = cached.downcast_ref::<T>() {
                    return Ok(value.clone());
                }
            }
        }

        let entry = {
            let entries = self.entries.read();
            entries.get(&hash).cloned().ok_or(CasError::MissingEntry(hash))?
        };
        if entry.tag != T::TAG {
            return Err(CasError::TagMismatch { expected: T::TAG, found: entry.tag.to_owned() });
        }
        let value: T = bincode::deserialize(&entry.bytes).map_err(|_| CasError::Decode(T::TAG))?;

        if let Some(cache) = &self.decode_cache {
            cache.lock().put(hash, Arc::new(value.clone()));
        }
        Ok(value)
    }

    /// True if `hash` names an entry already committed to the store.
    pub fn contains(&self, hash: Hash) -> bool {
        self.entries.read().contains_key(&hash)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Appends `depth` to the list of exploration depths at which `weak_hash` was observed.
    /// A pure append-log, not deduplicated — the livelock detector (§4.4) needs every
    /// observation, including repeats, to test the "consistent interval" condition.
    pub fn record_weak_observation(&self, weak_hash: Hash, depth: usize) {
        self.weak_index.lock().entry(weak_hash).or_default().push(depth);
    }

    /// All depths at which `weak_hash` has been observed so far, in observation order.
    pub fn weak_observations(&self, weak_hash: Hash) -> Vec<usize> {
        self.weak_index.lock().get(&weak_hash).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Leaf(i64);
    impl StoreEntry for Leaf {
        const TAG: &'static str = "leaf";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct OtherLeaf(i64);
    impl StoreEntry for OtherLeaf {
        const TAG: &'static str = "other_leaf";
    }

    #[test]
    fn put_is_idempotent_by_hash() {
        let store = Store::new();
        let h1 = store.put(&Leaf(42)).unwrap();
        let h2 = store.put(&Leaf(42)).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn round_trips_through_get() {
        let store = Store::new();
        let hash = store.put(&Leaf(7)).unwrap();
        assert_eq!(store.get::<Leaf>(hash).unwrap(), Leaf(7));
    }

    #[test]
    fn tag_mismatch_is_rejected() {
        let store = Store::new();
        let hash = store.put(&Leaf(7)).unwrap();
        let err = store.get::<OtherLeaf>(hash).unwrap_err();
        assert!(matches!(err, CasError::TagMismatch { .. }));
    }

    #[test]
    fn missing_hash_is_an_error() {
        let store = Store::new();
        let bogus = Hash::from_u64(0xdead_beef);
        assert_eq!(store.get::<Leaf>(bogus).unwrap_err(), CasError::MissingEntry(bogus));
    }

    #[test]
    fn cache_layer_preserves_get_semantics() {
        let store = Store::with_cache(4);
        let hash = store.put(&Leaf(9)).unwrap();
        assert_eq!(store.get::<Leaf>(hash).unwrap(), Leaf(9));
        assert_eq!(store.get::<Leaf>(hash).unwrap(), Leaf(9));
    }

    #[test]
    fn weak_index_is_an_append_log() {
        let store = Store::new();
        let weak = Hash::from_u64(1);
        store.record_weak_observation(weak, 3);
        store.record_weak_observation(weak, 6);
        store.record_weak_observation(weak, 6);
        assert_eq!(store.weak_observations(weak), vec![3, 6, 6]);
    }
}
