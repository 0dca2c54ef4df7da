//! Fixed-size block I/O with a shared LRU block cache.
//!
//! Every persistent file stratadb reads or writes through blocks — WAL
//! segments, SSTable data, index and summary files — goes through one
//! [`BlockManager`]. The manager owns a single `block_size` (configured in
//! KiB) and addresses file contents as `block_num × block_size` byte
//! offsets.
//!
//! # Caching
//!
//! Block reads and writes populate an LRU cache keyed by
//! `"<path>:<block_num>"`. Paths are unique and stable within a run, so a
//! key can never alias two files. Cached blocks are always exactly
//! `block_size` bytes: a short tail read from disk is zero-padded before it
//! is cached or returned, matching the zero padding writers leave implicit.
//!
//! # Concurrency
//!
//! One internal mutex serializes every manager operation, keeping the cache
//! and the disk consistent without per-file locking. Writers do not pad the
//! file on disk — a block write at offset `n × block_size` leaves any gap
//! sparse.


use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing::trace;

use crate::cache::LruMap;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by block manager operations.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A block write larger than the configured block size.
    #[error("data of {len} bytes exceeds block size ({block_size})")]
    OversizeBlock {
        /// Size of the rejected write.
        len: usize,
        /// Configured block size.
        block_size: usize,
    },

    /// A read at a block offset past the end of the file.
    ///
    /// This is the normal terminator for sequential block scans.
    #[error("unexpected end of file")]
    UnexpectedEof,

    /// Internal consistency or locking error.
    #[error("internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Block Manager
// ------------------------------------------------------------------------------------------------

/// Block-granular file I/O front-end with an LRU cache.
#[derive(Debug)]
pub struct BlockManager {
    /// Fixed block size in bytes (`block_size_kb × 1024`).
    block_size: usize,

    /// Cache of whole blocks keyed by `"<path>:<block_num>"`.
    cache: Mutex<LruMap<String, Vec<u8>>>,
}

impl BlockManager {
    /// Creates a manager with the given block size (KiB) and cache
    /// capacity (block count).
    pub fn new(block_size_kb: usize, cache_capacity: usize) -> Self {
        Self {
            block_size: block_size_kb * 1024,
            cache: Mutex::new(LruMap::new(cache_capacity)),
        }
    }

    /// Configured block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Reads block `block_num` of `path`.
    ///
    /// Served from the cache when possible. On a miss the file is opened
    /// read-only and exactly one block is read at `block_num × block_size`;
    /// a short read at the end of the file is accepted and zero-padded.
    /// Reading where the file has no bytes at all yields
    /// [`BlockError::UnexpectedEof`].
    pub fn read_block(&self, path: &Path, block_num: u64) -> Result<Vec<u8>, BlockError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| BlockError::Internal("block cache mutex poisoned".into()))?;

        let key = cache_key(path, block_num);
        if let Some(block) = cache.get(&key) {
            trace!(%key, "block cache hit");
            return Ok(block);
        }

        let file = File::open(path)?;
        let offset = block_num
            .checked_mul(self.block_size as u64)
            .ok_or(BlockError::UnexpectedEof)?;

        let mut buf = vec![0u8; self.block_size];
        let n = read_up_to(&file, &mut buf, offset)?;
        if n == 0 {
            return Err(BlockError::UnexpectedEof);
        }

        trace!(%key, bytes = n, "block read from disk");
        cache.put(key, buf.clone());
        Ok(buf)
    }

    /// Writes `data` as block `block_num` of `path`.
    ///
    /// Fails with [`BlockError::OversizeBlock`] when `data` does not fit in
    /// one block. The file is created if missing; the write lands at the
    /// block offset without padding the file, and the cache entry is
    /// refreshed with the zero-padded block.
    pub fn write_block(&self, path: &Path, block_num: u64, data: &[u8]) -> Result<(), BlockError> {
        if data.len() > self.block_size {
            return Err(BlockError::OversizeBlock {
                len: data.len(),
                block_size: self.block_size,
            });
        }

        let mut cache = self
            .cache
            .lock()
            .map_err(|_| BlockError::Internal("block cache mutex poisoned".into()))?;

        let file = OpenOptions::new().write(true).create(true).open(path)?;
        let offset = block_num
            .checked_mul(self.block_size as u64)
            .ok_or_else(|| BlockError::Internal("block offset overflow".into()))?;
        file.write_all_at(data, offset)?;

        let mut block = vec![0u8; self.block_size];
        block[..data.len()].copy_from_slice(data);
        cache.put(cache_key(path, block_num), block);

        trace!(path = %path.display(), block_num, bytes = data.len(), "block written");
        Ok(())
    }

    /// Flushes a file's data and metadata to stable storage.
    ///
    /// Used by the WAL after each append and by the SSTable writer after a
    /// completed flush.
    pub fn sync(&self, path: &Path) -> Result<(), BlockError> {
        let file = File::open(path)?;
        file.sync_all()?;
        Ok(())
    }

    /// Drops every cached block belonging to `path`.
    ///
    /// Cache keys embed the file path, so entries for a deleted or renamed
    /// file must be removed explicitly.
    pub fn evict_file(&self, path: &Path) -> Result<(), BlockError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| BlockError::Internal("block cache mutex poisoned".into()))?;

        let prefix = format!("{}:", path.display());
        let stale: Vec<String> = cache
            .items()
            .into_iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k)
            .collect();
        for key in stale {
            cache.remove(&key);
        }
        Ok(())
    }

    /// Number of blocks currently cached.
    pub fn cached_blocks(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}

/// Cache key for one block of one file.
fn cache_key(path: &Path, block_num: u64) -> String {
    format!("{}:{}", path.display(), block_num)
}

/// Positional read that fills as much of `buf` as the file provides,
/// returning the number of bytes read (possibly zero at end of file).
fn read_up_to(file: &File, buf: &mut [u8], offset: u64) -> Result<usize, BlockError> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read_at(&mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(BlockError::Io(e)),
        }
    }
    Ok(filled)
}
