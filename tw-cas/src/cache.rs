use std::collections::HashMap;
use std::hash::Hash as StdHash;

/// A minimal bounded LRU used to front the store's deserialization path. Not a general-purpose
/// cache: it exists to avoid repeatedly deserializing hot blobs during exploration, nothing more.
pub struct BoundedCache<K, V> {
    capacity: usize,
    // Most-recently-used at the back.
    order: Vec<K>,
    entries: HashMap<K, V>,
}

impl<K: StdHash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), order: Vec::new(), entries: HashMap::new() }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    pub fn put(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push(key);
        if self.order.len() > self.capacity {
            let evicted = self.order.remove(0);
            self.entries.remove(&evicted);
        }
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.push(k);
        }
    }
}
