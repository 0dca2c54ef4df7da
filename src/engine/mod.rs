//! # LSM Storage Engine
//!
//! The orchestrator of the store: it owns the WAL writer, the chain of
//! memtables, the SSTable directory, the key cache and the admission
//! limiter, and serves every public operation.
//!
//! ## Write path
//!
//! A `put` or `delete`:
//!
//! 1. asks the token bucket for admission;
//! 2. rotates the active memtable into the read-only list when it is full,
//!    and flushes the oldest read-only memtable to a fresh level-0 run
//!    (then compacts) when too many tables are retained;
//! 3. appends a record to the WAL and syncs it;
//! 4. applies the mutation to the active memtable;
//! 5. updates the key cache.
//!
//! ## Read path
//!
//! A `get` consults, in order: the key cache, the active memtable, the
//! read-only memtables newest → oldest, and finally the SSTable runs
//! with directory names sorted descending (newest first). The first
//! definitive answer wins — a tombstone is a definitive miss and stops
//! the search.
//!
//! ## Scans
//!
//! Range and prefix scans merge every memtable (tombstones included) with
//! every run; memtables decide a key over any run, and the first run
//! visited decides it over the rest. Results are filtered and sorted.
//! Pagination slices the sorted result; iterators materialize it behind a
//! `next()` / `stop()` cursor.
//!
//! ## WAL segment lifecycle
//!
//! Every memtable tracks the set of WAL segments its records were logged
//! to — a memtable's lifespan can cross a segment rotation. When a
//! memtable is flushed, each of its segments is deleted once no other
//! live memtable covers it.
//!
//! ## Concurrency
//!
//! One coarse mutex serializes all engine operations. The block manager,
//! the memtables and the token bucket carry their own locks, so they stay
//! consistent even when touched without the engine lock held.
//!
//! ## Durability
//!
//! Every WAL append is synced before the write is acknowledged; a flushed
//! run's files are synced before its WAL segments are deleted.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::block::{BlockError, BlockManager};
use crate::cache::LruMap;
use crate::clock;
use crate::compaction::{self, CompactionError, LevelPolicy};
use crate::config::{ConfigError, StoreConfig};
use crate::limiter::{DEFAULT_MAX_TOKENS, DEFAULT_REFILL_MS, LimiterError, TokenBucket};
use crate::memtable::{Lookup, Memtable, MemtableError, MemtableKind};
use crate::sstable::{self, GetResult, SSTableError};
use crate::wal::{self, RECORD_OVERHEAD, Record, WalError, WalState, WalWriter};

/// WAL segments live in `<root>/wal`.
pub const WAL_DIR: &str = "wal";

/// SSTable runs live in `<root>/sstables`.
pub const SSTABLE_DIR: &str = "sstables";

/// Optional memtable snapshot used to bypass WAL replay on startup.
pub const SNAPSHOT_FILE: &str = "memtable.snapshot";

/// Persisted token-bucket state.
pub const BUCKET_FILE: &str = "ratelimit.bucket";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The token bucket denied the operation; retry after refill.
    #[error("rate limited")]
    RateLimited,

    /// Configuration failure.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// WAL subsystem failure.
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    /// Memtable subsystem failure.
    #[error("memtable error: {0}")]
    Memtable(#[from] MemtableError),

    /// SSTable subsystem failure.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Compaction failure.
    #[error("compaction error: {0}")]
    Compaction(#[from] CompactionError),

    /// Rate-limiter persistence failure.
    #[error("rate limiter error: {0}")]
    Limiter(#[from] LimiterError),

    /// Block-level failure.
    #[error("block error: {0}")]
    Block(#[from] BlockError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal invariant violation (poisoned lock, unexpected state).
    #[error("internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Public state types
// ------------------------------------------------------------------------------------------------

/// Snapshot of engine statistics returned by [`Engine::stats`].
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Successful puts since open.
    pub put_count: u64,
    /// Successful gets since open.
    pub get_count: u64,
    /// Slots in the active memtable, tombstones included.
    pub active_entries: usize,
    /// Read-only memtables awaiting flush.
    pub read_only_tables: usize,
    /// SSTable runs on disk.
    pub sstable_runs: usize,
    /// Entries in the key cache.
    pub key_cache_entries: usize,
    /// Blocks in the shared block cache.
    pub cached_blocks: usize,
}

/// Materialized scan cursor with `next()` / `stop()` semantics.
///
/// The qualifying pairs are collected and sorted at creation time;
/// `next()` walks them until exhaustion or an explicit `stop()`.
pub struct ScanIterator {
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
    pos: usize,
    stopped: bool,
}

impl ScanIterator {
    fn new(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            pairs,
            pos: 0,
            stopped: false,
        }
    }

    /// The next pair, or `None` once exhausted or stopped.
    pub fn next(&mut self) -> Option<(Vec<u8>, Vec<u8>)> {
        if self.stopped {
            return None;
        }
        let pair = self.pairs.get(self.pos).cloned();
        if pair.is_some() {
            self.pos += 1;
        }
        pair
    }

    /// Ends the iteration; every further `next()` returns `None`.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Pairs remaining before exhaustion.
    pub fn remaining(&self) -> usize {
        if self.stopped {
            0
        } else {
            self.pairs.len() - self.pos
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Engine
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct EngineInner {
    config: StoreConfig,
    kind: MemtableKind,
    root: PathBuf,
    wal: WalWriter,
    /// Active write buffer.
    active: Memtable,
    /// Retained read-only memtables, oldest first.
    read_only: Vec<Memtable>,
    /// Key → value cache over live entries.
    key_cache: LruMap<Vec<u8>, Vec<u8>>,
    put_count: u64,
    get_count: u64,
}

/// The storage engine handle.
#[derive(Debug)]
pub struct Engine {
    inner: Mutex<EngineInner>,
    limiter: TokenBucket,
    block_mgr: Arc<BlockManager>,
}

impl Engine {
    /// Opens (or creates) a store rooted at `root`.
    ///
    /// Fresh directories are laid out as `<root>/wal` and
    /// `<root>/sstables`. On an existing store, recovery runs: a memtable
    /// snapshot is loaded when present, otherwise every WAL segment is
    /// replayed into the active memtable. Persisted token-bucket state is
    /// restored; a missing or damaged state file falls back to the
    /// default bucket.
    pub fn open(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let kind = config.memtable_kind()?;

        let root = root.as_ref().to_path_buf();
        let wal_dir = root.join(WAL_DIR);
        let sst_dir = root.join(SSTABLE_DIR);
        fs::create_dir_all(&wal_dir)?;
        fs::create_dir_all(&sst_dir)?;

        let block_mgr = Arc::new(BlockManager::new(config.block_size_kb, config.cache_capacity));
        let wal = WalWriter::open(&wal_dir, config.wal_segment_size, Arc::clone(&block_mgr))?;

        // Recovery: snapshot when present, WAL replay otherwise.
        let active = Memtable::new(kind);
        let snapshot_path = root.join(SNAPSHOT_FILE);
        if snapshot_path.exists() {
            active.load_snapshot(&snapshot_path)?;
            info!(path = %snapshot_path.display(), "memtable snapshot loaded, WAL replay skipped");
        } else {
            let applied = wal::replay(&block_mgr, &wal_dir, &active)?;
            debug!(records = applied, "WAL replayed into active memtable");
        }

        // Whatever segments survive on disk are now represented in the
        // active memtable; it owns their cleanup after its own flush.
        for (_, segment) in wal::list_segments(&wal_dir)? {
            active.record_wal_segment(segment);
        }

        let bucket_path = root.join(BUCKET_FILE);
        let limiter = if bucket_path.exists() {
            match TokenBucket::load(&bucket_path) {
                Ok(bucket) => bucket,
                Err(e) => {
                    warn!(error = %e, "token bucket state unusable, installing default");
                    TokenBucket::new(DEFAULT_MAX_TOKENS, DEFAULT_REFILL_MS)
                }
            }
        } else {
            TokenBucket::new(DEFAULT_MAX_TOKENS, DEFAULT_REFILL_MS)
        };

        let key_cache = LruMap::new(config.cache_capacity);

        info!(root = %root.display(), ?kind, "engine opened");

        Ok(Self {
            inner: Mutex::new(EngineInner {
                config,
                kind,
                root,
                wal,
                active,
                read_only: Vec::new(),
                key_cache,
                put_count: 0,
                get_count: 0,
            }),
            limiter,
            block_mgr,
        })
    }

    /// Gracefully shuts the engine down: flushes every read-only memtable
    /// and persists the token-bucket state. The active memtable stays in
    /// the WAL for the next start.
    pub fn close(&self) -> Result<(), EngineError> {
        self.flush_all_memtables()?;
        let inner = self.lock()?;
        self.limiter.save(&inner.root.join(BUCKET_FILE))?;
        info!("engine closed");
        Ok(())
    }

    /// Shared block manager (one block cache per engine).
    pub fn block_manager(&self) -> &Arc<BlockManager> {
        &self.block_mgr
    }

    // --------------------------------------------------------------------------------------------
    // Writes
    // --------------------------------------------------------------------------------------------

    /// Inserts or updates a key.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let mut inner = self.lock()?;
        self.write_locked(&mut inner, key, value, false)
    }

    /// Deletes a key by writing a tombstone.
    pub fn delete(&self, key: Vec<u8>) -> Result<(), EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let mut inner = self.lock()?;
        self.write_locked(&mut inner, key, Vec::new(), true)
    }

    fn write_locked(
        &self,
        inner: &mut EngineInner,
        key: Vec<u8>,
        value: Vec<u8>,
        tombstone: bool,
    ) -> Result<(), EngineError> {
        // Reject records the WAL framing cannot hold before any state moves.
        let capacity = self.block_mgr.block_size().saturating_sub(RECORD_OVERHEAD);
        if key.len() + value.len() > capacity {
            return Err(EngineError::Wal(WalError::RecordTooLarge(
                RECORD_OVERHEAD + key.len() + value.len(),
            )));
        }

        // 1. Rotate a full active memtable into the read-only list.
        if inner.active.len() + 1 > inner.config.memtable_max_entries {
            inner
                .active
                .record_wal_segment(inner.wal.current_segment_path());
            let fresh = Memtable::new(inner.kind);
            let retired = std::mem::replace(&mut inner.active, fresh);
            inner.read_only.push(retired);
            debug!(
                read_only = inner.read_only.len(),
                "active memtable rotated to read-only"
            );
        }

        // 2. Too many retained tables → flush the oldest to level 0.
        if inner.read_only.len() + 1 > inner.config.memtable_max_tables {
            self.flush_oldest_locked(inner, true)?;
        }

        // 3. WAL first.
        let record = Record {
            timestamp: clock::now_nanos(),
            tombstone,
            key: key.clone(),
            value: value.clone(),
        };
        inner.wal.append(&record)?;
        inner
            .active
            .record_wal_segment(inner.wal.current_segment_path());

        // 4. Apply in memory.
        if tombstone {
            inner.active.delete(key.clone());
        } else {
            inner.active.put(key.clone(), value.clone());
        }

        // 5. Key cache follows the mutation.
        if tombstone {
            inner.key_cache.remove(&key);
        } else {
            inner.key_cache.put(key, value);
            inner.put_count += 1;
        }

        Ok(())
    }

    /// Flushes the oldest read-only memtable into a fresh level-0 run,
    /// releases the WAL segments only it covered, and optionally runs
    /// compaction afterwards.
    fn flush_oldest_locked(
        &self,
        inner: &mut EngineInner,
        compact: bool,
    ) -> Result<(), EngineError> {
        if inner.read_only.is_empty() {
            return Ok(());
        }
        let memtable = inner.read_only.remove(0);

        let sst_root = inner.root.join(SSTABLE_DIR);
        let run_dir = sst_root.join(sstable::run_dir_name(0, clock::now_nanos()));
        memtable.flush_to_sstable(&run_dir, &self.block_mgr)?;
        info!(run = %run_dir.display(), "read-only memtable flushed");

        // The flushed data is durable; its WAL segments can go, unless a
        // younger memtable still holds records in them. Deleting the
        // writer's current segment is safe: it recreates sparsely, the
        // zeroed slots read back as empty, and the writer's position is
        // block-based.
        for segment in memtable.wal_segments() {
            let still_covered = inner.active.covers_segment(&segment)
                || inner.read_only.iter().any(|m| m.covers_segment(&segment));
            if still_covered {
                continue;
            }
            match fs::remove_file(&segment) {
                Ok(()) => {
                    self.block_mgr.evict_file(&segment)?;
                    debug!(segment = %segment.display(), "WAL segment deleted after flush");
                }
                Err(e) => {
                    warn!(segment = %segment.display(), error = %e, "could not delete WAL segment");
                }
            }
        }

        if compact {
            let policy = LevelPolicy {
                max_levels: inner.config.max_levels,
                sstables_per_level: inner.config.sstable_files_per_level,
            };
            compaction::auto_compact(&sst_root, &self.block_mgr, policy)?;

            // Runaway run count → collapse everything into one run.
            if sstable::list_runs(&sst_root)?.len() > inner.config.max_sstable_files {
                compaction::compact_all(&sst_root, &self.block_mgr)?;
            }
        }

        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Reads
    // --------------------------------------------------------------------------------------------

    /// Looks up a single key.
    ///
    /// Returns `Ok(Some(value))` on a hit, `Ok(None)` when the key was
    /// never written or was deleted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let mut inner = self.lock()?;

        // 1. Key cache.
        if let Some(value) = inner.key_cache.get(&key.to_vec()) {
            inner.get_count += 1;
            return Ok(Some(value));
        }

        // 2. Memtables, newest first; a tombstone is a definitive miss.
        let mut found: Option<Vec<u8>> = None;
        let mut tables = Vec::with_capacity(1 + inner.read_only.len());
        tables.push(&inner.active);
        tables.extend(inner.read_only.iter().rev());
        for table in tables {
            match table.get(key) {
                Lookup::Value(value) => {
                    found = Some(value);
                    break;
                }
                Lookup::Tombstone => return Ok(None),
                Lookup::NotFound => {}
            }
        }

        // 3. SSTable runs, newest directory name first; the first run
        //    that knows the key (even as a tombstone) ends the search.
        if found.is_none() {
            let sst_root = inner.root.join(SSTABLE_DIR);
            for dir in sstable::list_runs(&sst_root)? {
                match sstable::get(&dir, key, &self.block_mgr)? {
                    GetResult::Value(value) => {
                        found = Some(value);
                        break;
                    }
                    GetResult::Tombstone => return Ok(None),
                    GetResult::NotFound => {}
                }
            }
        }

        if let Some(value) = found {
            inner.key_cache.put(key.to_vec(), value.clone());
            inner.get_count += 1;
            return Ok(Some(value));
        }
        Ok(None)
    }

    // --------------------------------------------------------------------------------------------
    // Scans
    // --------------------------------------------------------------------------------------------

    /// Live pairs with `from ≤ key ≤ to`, in key order.
    pub fn range_scan(
        &self,
        from: &[u8],
        to: &[u8],
    ) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let inner = self.lock()?;
        self.merged_scan(&inner, |key| key >= from && key <= to)
    }

    /// One page of a range scan: the half-open slice
    /// `[page·size, (page+1)·size)` of the sorted result.
    pub fn range_scan_paginated(
        &self,
        from: &[u8],
        to: &[u8],
        page: usize,
        size: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let inner = self.lock()?;
        let map = self.merged_scan(&inner, |key| key >= from && key <= to)?;
        Ok(paginate(map, page, size))
    }

    /// Every live pair whose key starts with `prefix`, in key order.
    pub fn prefix_scan_all(
        &self,
        prefix: &[u8],
    ) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let inner = self.lock()?;
        self.merged_scan(&inner, |key| key.starts_with(prefix))
    }

    /// One page of a prefix scan.
    pub fn prefix_scan_paginated(
        &self,
        prefix: &[u8],
        page: usize,
        size: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let inner = self.lock()?;
        let map = self.merged_scan(&inner, |key| key.starts_with(prefix))?;
        Ok(paginate(map, page, size))
    }

    /// Cursor over `from ≤ key ≤ to`, materialized at creation time.
    pub fn new_range_iterator(&self, from: &[u8], to: &[u8]) -> Result<ScanIterator, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let inner = self.lock()?;
        let map = self.merged_scan(&inner, |key| key >= from && key <= to)?;
        Ok(ScanIterator::new(map.into_iter().collect()))
    }

    /// Cursor over keys starting with `prefix`, materialized at creation
    /// time.
    pub fn new_prefix_iterator(&self, prefix: &[u8]) -> Result<ScanIterator, EngineError> {
        if !self.limiter.allow() {
            return Err(EngineError::RateLimited);
        }
        let inner = self.lock()?;
        let map = self.merged_scan(&inner, |key| key.starts_with(prefix))?;
        Ok(ScanIterator::new(map.into_iter().collect()))
    }

    /// Merges every layer into the live view of all keys matching `pred`.
    ///
    /// Memtables are folded oldest → newest so a later write wins; runs
    /// are consulted in descending directory-name order and may only
    /// speak for keys no memtable (and no earlier-visited run) has
    /// decided — tombstones decide a key as "absent" and block shadowed
    /// values from resurfacing.
    fn merged_scan(
        &self,
        inner: &EngineInner,
        pred: impl Fn(&[u8]) -> bool,
    ) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, EngineError> {
        let mut decided: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();

        for table in inner.read_only.iter().chain(std::iter::once(&inner.active)) {
            for (key, slot) in table.entries() {
                if pred(&key) {
                    let value = (!slot.tombstone).then_some(slot.value);
                    decided.insert(key, value);
                }
            }
        }

        let sst_root = inner.root.join(SSTABLE_DIR);
        for dir in sstable::list_runs(&sst_root)? {
            for entry in sstable::load_run_entries(&dir, &self.block_mgr)? {
                if pred(&entry.key) && !decided.contains_key(&entry.key) {
                    let value = (!entry.tombstone).then_some(entry.value);
                    decided.insert(entry.key, value);
                }
            }
        }

        Ok(decided
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect())
    }

    // --------------------------------------------------------------------------------------------
    // Maintenance operations
    // --------------------------------------------------------------------------------------------

    /// Flushes every read-only memtable to level-0 runs, releasing their
    /// WAL segments. The active memtable stays in place.
    pub fn flush_all_memtables(&self) -> Result<(), EngineError> {
        let mut inner = self.lock()?;
        while !inner.read_only.is_empty() {
            self.flush_oldest_locked(&mut inner, false)?;
        }
        Ok(())
    }

    /// Full merge: collapses every run into one fresh level-0 run,
    /// dropping tombstones. Returns whether any work was done.
    pub fn compact_all(&self) -> Result<bool, EngineError> {
        let inner = self.lock()?;
        let sst_root = inner.root.join(SSTABLE_DIR);
        Ok(compaction::compact_all(&sst_root, &self.block_mgr)?)
    }

    /// Saves the active memtable as a snapshot for fast recovery.
    pub fn save_snapshot(&self) -> Result<(), EngineError> {
        let inner = self.lock()?;
        let path = inner.root.join(SNAPSHOT_FILE);
        inner.active.save_snapshot(&path)?;
        Ok(())
    }

    /// Replaces the active memtable's contents with the saved snapshot.
    pub fn load_snapshot(&self) -> Result<(), EngineError> {
        let inner = self.lock()?;
        let path = inner.root.join(SNAPSHOT_FILE);
        inner.active.load_snapshot(&path)?;
        Ok(())
    }

    /// Recomputes the Merkle root of the named run directory and compares
    /// it against the stored witness.
    pub fn validate_merkle(&self, run_name: &str) -> Result<bool, EngineError> {
        let inner = self.lock()?;
        let dir = inner.root.join(SSTABLE_DIR).join(run_name);
        Ok(sstable::validate_merkle(&dir, &self.block_mgr)?)
    }

    /// Replaces the token bucket's parameters and persists the new state.
    pub fn set_rate_limit(&self, max_tokens: u64, refill_ms: u64) -> Result<(), EngineError> {
        self.limiter.reset(max_tokens, refill_ms);
        let inner = self.lock()?;
        self.limiter.save(&inner.root.join(BUCKET_FILE))?;
        info!(max_tokens, refill_ms, "rate limit updated");
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // State inspection
    // --------------------------------------------------------------------------------------------

    /// Counters and table/run counts.
    pub fn stats(&self) -> Result<EngineStats, EngineError> {
        let inner = self.lock()?;
        let runs = sstable::list_runs(&inner.root.join(SSTABLE_DIR))?;
        Ok(EngineStats {
            put_count: inner.put_count,
            get_count: inner.get_count,
            active_entries: inner.active.len(),
            read_only_tables: inner.read_only.len(),
            sstable_runs: runs.len(),
            key_cache_entries: inner.key_cache.len(),
            cached_blocks: self.block_mgr.cached_blocks(),
        })
    }

    /// Position of the WAL writer.
    pub fn wal_state(&self) -> Result<WalState, EngineError> {
        let inner = self.lock()?;
        Ok(inner.wal.state())
    }

    /// Live contents of the active memtable.
    pub fn memtable_state(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>, EngineError> {
        let inner = self.lock()?;
        Ok(inner
            .active
            .entries()
            .into_iter()
            .filter(|(_, slot)| !slot.tombstone)
            .map(|(key, slot)| (key, slot.value))
            .collect())
    }

    /// Key cache contents, most-recently-used first.
    pub fn cache_state(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, EngineError> {
        let inner = self.lock()?;
        Ok(inner.key_cache.items())
    }

    /// The configuration this engine was opened with.
    pub fn config(&self) -> Result<StoreConfig, EngineError> {
        let inner = self.lock()?;
        Ok(inner.config.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, EngineInner>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Internal("engine mutex poisoned".into()))
    }
}

/// The half-open page `[page·size, (page+1)·size)` of the sorted pairs.
fn paginate(
    map: BTreeMap<Vec<u8>, Vec<u8>>,
    page: usize,
    size: usize,
) -> Vec<(Vec<u8>, Vec<u8>)> {
    map.into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .collect()
}
