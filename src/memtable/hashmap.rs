//! Hash-map store: unordered slots, sorted on demand.

use std::collections::HashMap;

use super::Slot;

/// Unordered key → slot map.
///
/// The cheapest store for point operations; range scans pay for the
/// missing order by extracting and sorting the keys.
#[derive(Debug)]
pub struct HashStore {
    slots: HashMap<Vec<u8>, Slot>,
}

impl HashStore {
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.slots.insert(
            key,
            Slot {
                value,
                tombstone: false,
            },
        );
    }

    pub fn get(&self, key: &[u8]) -> Option<Slot> {
        self.slots.get(key).cloned()
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.slots.insert(
            key,
            Slot {
                value: Vec::new(),
                tombstone: true,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every slot sorted by key, tombstones included.
    pub fn sorted_entries(&self) -> Vec<(Vec<u8>, Slot)> {
        let mut entries: Vec<(Vec<u8>, Slot)> = self
            .slots
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }

    /// Installs a slot verbatim; used by snapshot loading.
    pub fn insert_slot(&mut self, key: Vec<u8>, slot: Slot) {
        self.slots.insert(key, slot);
    }
}

impl Default for HashStore {
    fn default() -> Self {
        Self::new()
    }
}
