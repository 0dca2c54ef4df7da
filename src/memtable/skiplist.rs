//! Skip-list store: an arena-backed probabilistic ordered list.
//!
//! Nodes live in a flat arena and link to each other by index, which keeps
//! the structure in safe Rust with no reference counting. Each node draws
//! its height from a geometric distribution: starting at one level, the
//! height grows while a uniform draw stays below `prob`, capped at
//! `max_level`.
//!
//! ```text
//! level 2: head ──────────► c
//! level 1: head ──► a ────► c ────► f
//! level 0: head ──► a ─► b ─► c ─► e ─► f
//! ```
//!
//! Deletion marks the node's tombstone flag (or inserts a fresh tombstone
//! node) rather than unlinking, so deletions survive a flush to disk.

use rand::Rng;

use super::Slot;

#[derive(Debug)]
struct Node {
    key: Vec<u8>,
    slot: Slot,
    /// Forward link per level; `None` is the end of the list.
    forward: Vec<Option<usize>>,
}

/// Ordered key → slot store.
#[derive(Debug)]
pub struct SkipStore {
    arena: Vec<Node>,
    /// Forward links out of the head, one per level.
    head: Vec<Option<usize>>,
    /// Highest level currently in use.
    level: usize,
    max_level: usize,
    prob: f64,
    len: usize,
}

impl SkipStore {
    /// Creates an empty list with the given height cap and promotion
    /// probability.
    pub fn new(max_level: usize, prob: f64) -> Self {
        let max_level = max_level.max(1);
        Self {
            arena: Vec::new(),
            head: vec![None; max_level],
            level: 1,
            max_level,
            prob,
            len: 0,
        }
    }

    fn random_level(&self) -> usize {
        let mut rng = rand::rng();
        let mut level = 1;
        while level < self.max_level && rng.random::<f64>() < self.prob {
            level += 1;
        }
        level
    }

    /// Successor of `node` (or of the head) at `level`.
    fn forward_of(&self, node: Option<usize>, level: usize) -> Option<usize> {
        match node {
            Some(idx) => self.arena[idx].forward.get(level).copied().flatten(),
            None => self.head[level],
        }
    }

    fn set_forward(&mut self, node: Option<usize>, level: usize, target: Option<usize>) {
        match node {
            Some(idx) => self.arena[idx].forward[level] = target,
            None => self.head[level] = target,
        }
    }

    /// Walks down from the top level, collecting the rightmost node with a
    /// key `< key` at every level. `preds[l]` of `None` means the head.
    fn predecessors(&self, key: &[u8]) -> Vec<Option<usize>> {
        let mut preds = vec![None; self.max_level];
        let mut current: Option<usize> = None;
        for level in (0..self.level).rev() {
            while let Some(next) = self.forward_of(current, level) {
                if self.arena[next].key.as_slice() < key {
                    current = Some(next);
                } else {
                    break;
                }
            }
            preds[level] = current;
        }
        preds
    }

    fn find(&self, key: &[u8]) -> Option<usize> {
        let preds = self.predecessors(key);
        let candidate = self.forward_of(preds[0], 0)?;
        (self.arena[candidate].key.as_slice() == key).then_some(candidate)
    }

    fn link_new_node(&mut self, key: Vec<u8>, slot: Slot) {
        let height = self.random_level();
        let preds = self.predecessors(&key);

        if height > self.level {
            self.level = height;
        }

        let idx = self.arena.len();
        let mut forward = vec![None; height];
        for (level, link) in forward.iter_mut().enumerate() {
            *link = self.forward_of(preds[level], level);
        }
        self.arena.push(Node { key, slot, forward });

        for level in 0..height {
            self.set_forward(preds[level], level, Some(idx));
        }
        self.len += 1;
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let slot = Slot {
            value,
            tombstone: false,
        };
        match self.find(&key) {
            Some(idx) => self.arena[idx].slot = slot,
            None => self.link_new_node(key, slot),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Slot> {
        self.find(key).map(|idx| self.arena[idx].slot.clone())
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        match self.find(&key) {
            Some(idx) => {
                self.arena[idx].slot = Slot {
                    value: Vec::new(),
                    tombstone: true,
                };
            }
            None => self.link_new_node(
                key,
                Slot {
                    value: Vec::new(),
                    tombstone: true,
                },
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Every slot in key order, tombstones included — a walk of level 0.
    pub fn sorted_entries(&self) -> Vec<(Vec<u8>, Slot)> {
        let mut entries = Vec::with_capacity(self.len);
        let mut current = self.head[0];
        while let Some(idx) = current {
            let node = &self.arena[idx];
            entries.push((node.key.clone(), node.slot.clone()));
            current = node.forward[0];
        }
        entries
    }

    /// Installs a slot verbatim; used by snapshot loading.
    pub fn insert_slot(&mut self, key: Vec<u8>, slot: Slot) {
        match self.find(&key) {
            Some(idx) => self.arena[idx].slot = slot,
            None => self.link_new_node(key, slot),
        }
    }
}
