//! Bounded LRU map.
//!
//! A thin wrapper over the [`lru`] crate that fixes the semantics stratadb
//! relies on in two places: the block cache inside
//! [`BlockManager`](crate::block::BlockManager) (keys are
//! `"<path>:<block_num>"` strings) and the engine's key-value cache (keys
//! are raw key bytes).
//!
//! - `get` and `put` move the touched entry to the most-recently-used end.
//! - Inserting beyond capacity evicts from the least-recently-used end.
//! - `items` returns a snapshot in MRU → LRU order.
//!
//! The map itself is not synchronized; each owner guards it with its own
//! lock.

#[cfg(test)]
mod tests;

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

/// A bounded map with least-recently-used eviction.
#[derive(Debug)]
pub struct LruMap<K: Hash + Eq, V: Clone> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq + Clone, V: Clone> LruMap<K, V> {
    /// Creates a map holding at most `capacity` entries.
    ///
    /// A zero capacity is clamped to one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Looks up `key`, promoting the entry on a hit.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.inner.get(key).cloned()
    }

    /// Inserts or replaces `key`, promoting it and evicting the
    /// least-recently-used entry on overflow.
    pub fn put(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    /// Removes `key`, returning the evicted value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    /// Snapshot of all entries, most-recently-used first.
    pub fn items(&self) -> Vec<(K, V)> {
        self.inner
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}
