//! # Memtable Module
//!
//! The in-memory write buffer of the storage engine. Two interchangeable
//! store implementations sit behind one dispatch type:
//!
//! - [`HashStore`](hashmap::HashStore) — an unordered map; range scans
//!   extract and sort on demand.
//! - [`SkipStore`](skiplist::SkipStore) — an arena-backed probabilistic
//!   skip list that maintains key order.
//!
//! ## Design Invariants
//!
//! - A key present in any memtable shadows that key in every SSTable.
//! - Deletes are tombstones, never physical removal: a tombstone must
//!   survive rotation and flush so it can shadow older on-disk entries.
//! - A later write for the same key always wins, including a put after a
//!   delete (which revives the key).
//! - Capacity is an **entry count**; rotation is driven by the engine,
//!   never by the memtable itself.
//!
//! ## WAL coverage
//!
//! Each memtable records the set of WAL segment paths its records were
//! logged to. A memtable's lifespan can cross a segment rotation, so this
//! is a set rather than a single path; the engine deletes a segment only
//! once no live memtable covers it.
//!
//! ## Concurrency
//!
//! State sits behind an `RwLock`, so concurrent readers proceed while no
//! writer holds the lock.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod hashmap;
pub mod skiplist;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::block::BlockManager;
use crate::clock;
use crate::encoding::{Decode, Encode, EncodingError};
use crate::sstable::{self, Entry, SSTableError};

use hashmap::HashStore;
use skiplist::SkipStore;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by [`Memtable`] operations.
#[derive(Debug, Error)]
pub enum MemtableError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error in a snapshot file.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// SSTable write failure during flush.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Internal invariant violation or poisoned lock.
    #[error("internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Core types
// ------------------------------------------------------------------------------------------------

/// Which store implementation backs a memtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemtableKind {
    /// Unordered hash map; sorts on demand.
    HashMap,
    /// Probabilistic skip list; maintains order.
    SkipList,
}

/// A stored value together with its tombstone flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Value bytes; empty for a tombstone.
    pub value: Vec<u8>,

    /// True when the slot marks a deletion.
    pub tombstone: bool,
}

/// Result of a point lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key holds this value.
    Value(Vec<u8>),

    /// The key was deleted here; the miss is authoritative.
    Tombstone,

    /// The key is unknown to this memtable.
    NotFound,
}

#[derive(Debug)]
enum Store {
    Hash(HashStore),
    Skip(SkipStore),
}

#[derive(Debug)]
struct MemtableInner {
    store: Store,
    wal_segments: Vec<PathBuf>,
}

/// One in-memory table: the engine's active write buffer, or a retained
/// read-only predecessor awaiting flush.
#[derive(Debug)]
pub struct Memtable {
    kind: MemtableKind,
    inner: RwLock<MemtableInner>,
}

impl Memtable {
    /// Creates an empty memtable backed by the given store kind.
    ///
    /// The skip list uses a maximum of 16 levels with promotion
    /// probability 0.5.
    pub fn new(kind: MemtableKind) -> Self {
        let store = match kind {
            MemtableKind::HashMap => Store::Hash(HashStore::new()),
            MemtableKind::SkipList => Store::Skip(SkipStore::new(16, 0.5)),
        };
        Self {
            kind,
            inner: RwLock::new(MemtableInner {
                store,
                wal_segments: Vec::new(),
            }),
        }
    }

    /// Store kind backing this memtable.
    pub fn kind(&self) -> MemtableKind {
        self.kind
    }

    /// Inserts or updates a key. A put on a tombstoned key revives it.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        let mut inner = write_lock(&self.inner);
        match &mut inner.store {
            Store::Hash(s) => s.put(key, value),
            Store::Skip(s) => s.put(key, value),
        }
    }

    /// Looks up a key.
    pub fn get(&self, key: &[u8]) -> Lookup {
        let inner = read_lock(&self.inner);
        let slot = match &inner.store {
            Store::Hash(s) => s.get(key),
            Store::Skip(s) => s.get(key),
        };
        match slot {
            Some(slot) if slot.tombstone => Lookup::Tombstone,
            Some(slot) => Lookup::Value(slot.value),
            None => Lookup::NotFound,
        }
    }

    /// Marks a key deleted, creating a tombstone if the key was absent.
    pub fn delete(&self, key: Vec<u8>) {
        let mut inner = write_lock(&self.inner);
        match &mut inner.store {
            Store::Hash(s) => s.delete(key),
            Store::Skip(s) => s.delete(key),
        }
    }

    /// Number of slots held, tombstones included.
    pub fn len(&self) -> usize {
        let inner = read_lock(&self.inner);
        match &inner.store {
            Store::Hash(s) => s.len(),
            Store::Skip(s) => s.len(),
        }
    }

    /// True when no slots are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live (non-tombstoned) pairs with `from ≤ key ≤ to`, in key order.
    pub fn range_scan(&self, from: &[u8], to: &[u8]) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.entries()
            .into_iter()
            .filter(|(key, slot)| {
                !slot.tombstone && key.as_slice() >= from && key.as_slice() <= to
            })
            .map(|(key, slot)| (key, slot.value))
            .collect()
    }

    /// Every slot in key order, tombstones included.
    ///
    /// This is the raw view the engine merges during scans and the flush
    /// path serializes; the public [`range_scan`](Self::range_scan) filters
    /// tombstones out.
    pub fn entries(&self) -> Vec<(Vec<u8>, Slot)> {
        let inner = read_lock(&self.inner);
        match &inner.store {
            Store::Hash(s) => s.sorted_entries(),
            Store::Skip(s) => s.sorted_entries(),
        }
    }

    // --------------------------------------------------------------------------------------------
    // Flush
    // --------------------------------------------------------------------------------------------

    /// Writes this memtable's contents as a complete SSTable run in `dir`.
    ///
    /// Entries are emitted in key order with fresh timestamps. Tombstones
    /// are **kept**: a level-0 run must still shadow older runs; only
    /// final-level compaction may drop them.
    pub fn flush_to_sstable(&self, dir: &Path, block_mgr: &BlockManager) -> Result<(), MemtableError> {
        fs::create_dir_all(dir)?;

        let entries: Vec<Entry> = self
            .entries()
            .into_iter()
            .map(|(key, slot)| Entry {
                key,
                value: slot.value,
                tombstone: slot.tombstone,
                timestamp: clock::now_nanos(),
            })
            .collect();

        info!(dir = %dir.display(), entries = entries.len(), "flushing memtable to SSTable");
        sstable::write_all_files(dir, entries, block_mgr)?;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // WAL coverage
    // --------------------------------------------------------------------------------------------

    /// Notes that this memtable holds records logged to `segment`.
    pub fn record_wal_segment(&self, segment: PathBuf) {
        let mut inner = write_lock(&self.inner);
        if !inner.wal_segments.contains(&segment) {
            trace!(segment = %segment.display(), "memtable covers WAL segment");
            inner.wal_segments.push(segment);
        }
    }

    /// The WAL segments this memtable's records live in.
    pub fn wal_segments(&self) -> Vec<PathBuf> {
        read_lock(&self.inner).wal_segments.clone()
    }

    /// True when `segment` is in this memtable's coverage set.
    pub fn covers_segment(&self, segment: &Path) -> bool {
        read_lock(&self.inner)
            .wal_segments
            .iter()
            .any(|s| s == segment)
    }

    // --------------------------------------------------------------------------------------------
    // Snapshots
    // --------------------------------------------------------------------------------------------

    /// Serializes every slot to `path` for fast recovery.
    ///
    /// A snapshot found at engine start is loaded instead of replaying the
    /// WAL.
    pub fn save_snapshot(&self, path: &Path) -> Result<(), MemtableError> {
        let entries = self.entries();

        let mut buf = Vec::new();
        (entries.len() as u64).encode_to(&mut buf)?;
        for (key, slot) in &entries {
            key.encode_to(&mut buf)?;
            slot.tombstone.encode_to(&mut buf)?;
            slot.value.encode_to(&mut buf)?;
        }

        fs::write(path, buf)?;
        debug!(path = %path.display(), entries = entries.len(), "memtable snapshot saved");
        Ok(())
    }

    /// Replaces this memtable's contents with the snapshot at `path`.
    pub fn load_snapshot(&self, path: &Path) -> Result<(), MemtableError> {
        let data = fs::read(path)?;

        let mut offset = 0;
        let (count, used) = u64::decode_from(&data[offset..])?;
        offset += used;

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let (key, used) = Vec::<u8>::decode_from(&data[offset..])?;
            offset += used;
            let (tombstone, used) = bool::decode_from(&data[offset..])?;
            offset += used;
            let (value, used) = Vec::<u8>::decode_from(&data[offset..])?;
            offset += used;
            entries.push((key, Slot { value, tombstone }));
        }

        let mut inner = write_lock(&self.inner);
        let store = match self.kind {
            MemtableKind::HashMap => {
                let mut s = HashStore::new();
                for (key, slot) in entries {
                    s.insert_slot(key, slot);
                }
                Store::Hash(s)
            }
            MemtableKind::SkipList => {
                let mut s = SkipStore::new(16, 0.5);
                for (key, slot) in entries {
                    s.insert_slot(key, slot);
                }
                Store::Skip(s)
            }
        };
        inner.store = store;

        debug!(path = %path.display(), entries = count, "memtable snapshot loaded");
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Lock helpers
// ------------------------------------------------------------------------------------------------

// A poisoned memtable lock means a writer panicked mid-update; the slot map
// itself is still structurally sound, so reads continue on the inner value.
fn read_lock(lock: &RwLock<MemtableInner>) -> std::sync::RwLockReadGuard<'_, MemtableInner> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock(lock: &RwLock<MemtableInner>) -> std::sync::RwLockWriteGuard<'_, MemtableInner> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
