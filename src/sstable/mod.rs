//! Sorted String Table (SSTable) Module
//!
//! An **immutable**, **block-aligned**, on-disk sorted run. Each run is a
//! directory named `sstable_L<level>_<nanos>` holding six files:
//!
//! | File      | Contents                                                      |
//! |-----------|---------------------------------------------------------------|
//! | `data`    | One entry per block: `u64 ts ‖ u8 tomb ‖ u64 ksize ‖ u64 vsize ‖ key ‖ value` |
//! | `meta`    | Single little-endian `i64` — the entry count                  |
//! | `index`   | One block per entry: `u64 ksize ‖ key ‖ u64 data_block`       |
//! | `summary` | Every 10th index entry's key + that entry's **byte** offset   |
//! | `bloom`   | Bloom filter over the run's keys                              |
//! | `merkle`  | Lowercase-hex SHA-256 Merkle root over the sorted entries     |
//!
//! The `data`, `index` and `summary` files are written and read through the
//! shared [`BlockManager`](crate::block::BlockManager); `meta`, `bloom` and
//! `merkle` are small whole files.
//!
//! # Point lookup
//!
//! [`get`] gates on the bloom filter when present, seeds the index scan
//! from the summary when present, exact-matches the key in the index, and
//! reads the single data block it points at. A tombstone hit is an
//! **authoritative negative**: the caller must stop searching older runs.
//!
//! # Shadowing order
//!
//! Runs at the same level shadow by their `nanos` suffix (larger = newer).
//! [`list_runs`] yields run directories with their names sorted
//! descending, so within a level the newest run comes first and
//! higher-numbered levels sort before lower ones.
//!
//! # Integrity
//!
//! `meta` and `data` must agree; `summary` and `bloom` are optional at read
//! time. [`validate_merkle`] recomputes the root from `data` and compares
//! it against the stored witness.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod merkle;
pub mod writer;

pub use merkle::merkle_root;
pub use writer::write_all_files;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::trace;

use crate::block::{BlockError, BlockManager};
use crate::encoding::{Decode, Encode, EncodingError, put_raw, take_raw};
use crate::filter::{BloomFilter, FilterError};

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Fixed bytes in front of a data entry's key: timestamp + tombstone +
/// key_size + value_size. The data frame carries no CRC.
pub const DATA_HEADER_SIZE: usize = 8 + 1 + 8 + 8;

/// Every n-th index entry is sampled into the summary.
pub const SUMMARY_SAMPLING_RATE: usize = 10;

/// False-positive rate of the per-run bloom filter.
pub const BLOOM_FALSE_POSITIVE_RATE: f64 = 0.01;

pub const DATA_FILE: &str = "data";
pub const META_FILE: &str = "meta";
pub const INDEX_FILE: &str = "index";
pub const SUMMARY_FILE: &str = "summary";
pub const BLOOM_FILE: &str = "bloom";
pub const MERKLE_FILE: &str = "merkle";

const RUN_PREFIX: &str = "sstable_L";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by SSTable operations.
#[derive(Debug, Error)]
pub enum SSTableError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Block-level read or write failure.
    #[error("block error: {0}")]
    Block(#[from] BlockError),

    /// Encoding / decoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Bloom filter sidecar failure.
    #[error("bloom filter error: {0}")]
    Filter(#[from] FilterError),

    /// A stored block whose header does not fit its own frame.
    #[error("corrupt SSTable block: {0}")]
    CorruptBlock(String),

    /// A `meta` file that does not hold a valid entry count.
    #[error("malformed meta file: {0}")]
    MalformedMeta(String),
}

// ------------------------------------------------------------------------------------------------
// Entry
// ------------------------------------------------------------------------------------------------

/// One record of a run. The universal unit the memtable flush, the readers
/// and the compactor all exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Key bytes.
    pub key: Vec<u8>,

    /// Value bytes; empty for a tombstone.
    pub value: Vec<u8>,

    /// True when the entry marks a deletion.
    pub tombstone: bool,

    /// Nanosecond timestamp; larger wins on key collisions.
    pub timestamp: u64,
}

impl Entry {
    /// Serializes the entry as a data-block image (no padding).
    pub(crate) fn encode_block(&self) -> Result<Vec<u8>, SSTableError> {
        let mut buf = Vec::with_capacity(DATA_HEADER_SIZE + self.key.len() + self.value.len());
        self.timestamp.encode_to(&mut buf)?;
        self.tombstone.encode_to(&mut buf)?;
        (self.key.len() as u64).encode_to(&mut buf)?;
        (self.value.len() as u64).encode_to(&mut buf)?;
        put_raw(&mut buf, &self.key);
        put_raw(&mut buf, &self.value);
        Ok(buf)
    }

    /// Parses one data block.
    pub(crate) fn decode_block(data: &[u8]) -> Result<Entry, SSTableError> {
        if data.len() < DATA_HEADER_SIZE {
            return Err(SSTableError::CorruptBlock(format!(
                "data block of {} bytes is smaller than the entry header",
                data.len()
            )));
        }

        let mut offset = 0;
        let (timestamp, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (tombstone, used) = bool::decode_from(&data[offset..])
            .map_err(|e| SSTableError::CorruptBlock(format!("tombstone byte: {e}")))?;
        offset += used;
        let (key_size, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (value_size, used) = u64::decode_from(&data[offset..])?;
        offset += used;

        let total = (DATA_HEADER_SIZE as u64)
            .checked_add(key_size)
            .and_then(|t| t.checked_add(value_size))
            .ok_or_else(|| SSTableError::CorruptBlock("entry size overflow".into()))?;
        if total > data.len() as u64 {
            return Err(SSTableError::CorruptBlock(format!(
                "entry claims {total} bytes in a {}-byte block",
                data.len()
            )));
        }

        let (key, used) = take_raw(&data[offset..], key_size as usize)?;
        offset += used;
        let (value, _) = take_raw(&data[offset..], value_size as usize)?;

        Ok(Entry {
            key,
            value,
            tombstone,
            timestamp,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// Index / summary frames
// ------------------------------------------------------------------------------------------------

/// Serializes `u64 ksize ‖ key ‖ u64 target` — the frame shared by index
/// blocks (target = data block number) and summary blocks (target = index
/// byte offset).
pub(crate) fn encode_index_block(key: &[u8], target: u64) -> Result<Vec<u8>, SSTableError> {
    let mut buf = Vec::with_capacity(16 + key.len());
    (key.len() as u64).encode_to(&mut buf)?;
    put_raw(&mut buf, key);
    target.encode_to(&mut buf)?;
    Ok(buf)
}

/// Parses an index or summary block into `(key, target)`.
pub(crate) fn decode_index_block(data: &[u8]) -> Result<(Vec<u8>, u64), SSTableError> {
    let mut offset = 0;
    let (key_size, used) = u64::decode_from(data)?;
    offset += used;

    let total = 16u64
        .checked_add(key_size)
        .ok_or_else(|| SSTableError::CorruptBlock("index entry size overflow".into()))?;
    if total > data.len() as u64 {
        return Err(SSTableError::CorruptBlock(format!(
            "index entry claims {total} bytes in a {}-byte block",
            data.len()
        )));
    }

    let (key, used) = take_raw(&data[offset..], key_size as usize)?;
    offset += used;
    let (target, _) = u64::decode_from(&data[offset..])?;
    Ok((key, target))
}

// ------------------------------------------------------------------------------------------------
// Readers
// ------------------------------------------------------------------------------------------------

/// Reads the first `count` entries of a data file, one block each.
pub fn read_data(
    path: &Path,
    count: usize,
    block_mgr: &BlockManager,
) -> Result<Vec<Entry>, SSTableError> {
    let mut entries = Vec::with_capacity(count);
    for block_num in 0..count {
        let data = block_mgr.read_block(path, block_num as u64)?;
        entries.push(Entry::decode_block(&data)?);
    }
    Ok(entries)
}

/// Reads the single entry stored as `block_num` of a data file.
pub fn read_entry_at_block(
    block_mgr: &BlockManager,
    path: &Path,
    block_num: u64,
) -> Result<Entry, SSTableError> {
    let data = block_mgr.read_block(path, block_num)?;
    Entry::decode_block(&data)
}

/// Scans index blocks sequentially from `start_block`, exact-matching
/// `target`. Returns the data block number, or `None` when the key is not
/// in this run. The index is sorted, so the scan stops early once it walks
/// past the target.
pub fn find_in_index(
    block_mgr: &BlockManager,
    index_path: &Path,
    target: &[u8],
    start_block: u64,
) -> Result<Option<u64>, SSTableError> {
    let mut block_num = start_block;
    loop {
        let data = match block_mgr.read_block(index_path, block_num) {
            Ok(data) => data,
            Err(BlockError::UnexpectedEof) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (key, data_block) = decode_index_block(&data)?;
        if key == target {
            return Ok(Some(data_block));
        }
        if key.as_slice() > target {
            return Ok(None);
        }
        block_num += 1;
    }
}

/// Scans the summary for the largest sampled key `≤ target`.
///
/// Returns that index entry's **byte** offset (divide by the block size
/// for the index block number), or `None` when every sampled key is past
/// the target. Stops as soon as a sampled key `> target` is seen.
pub fn find_closest_in_summary(
    block_mgr: &BlockManager,
    summary_path: &Path,
    target: &[u8],
) -> Result<Option<u64>, SSTableError> {
    let mut block_num = 0;
    let mut best: Option<u64> = None;
    loop {
        let data = match block_mgr.read_block(summary_path, block_num) {
            Ok(data) => data,
            Err(BlockError::UnexpectedEof) => return Ok(best),
            Err(e) => return Err(e.into()),
        };

        let (key, offset) = decode_index_block(&data)?;
        if key.as_slice() <= target {
            best = Some(offset);
        } else {
            return Ok(best);
        }
        block_num += 1;
    }
}

/// Result of a point lookup against one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetResult {
    /// The key holds this value.
    Value(Vec<u8>),

    /// The key was deleted in this run; authoritative — do not consult
    /// older runs.
    Tombstone,

    /// The key is not in this run.
    NotFound,
}

/// Point lookup against one run directory.
///
/// The bloom filter and summary are consulted when their files exist;
/// both are optional at read time.
pub fn get(dir: &Path, key: &[u8], block_mgr: &BlockManager) -> Result<GetResult, SSTableError> {
    let bloom_path = dir.join(BLOOM_FILE);
    if bloom_path.exists() {
        let bloom = BloomFilter::load(&bloom_path)?;
        if !bloom.may_contain(key) {
            trace!(dir = %dir.display(), "bloom filter ruled key out");
            return Ok(GetResult::NotFound);
        }
    }

    let summary_path = dir.join(SUMMARY_FILE);
    let start_block = if summary_path.exists() {
        match find_closest_in_summary(block_mgr, &summary_path, key)? {
            Some(byte_offset) => byte_offset / block_mgr.block_size() as u64,
            None => 0,
        }
    } else {
        0
    };

    let index_path = dir.join(INDEX_FILE);
    let Some(data_block) = find_in_index(block_mgr, &index_path, key, start_block)? else {
        return Ok(GetResult::NotFound);
    };

    let entry = read_entry_at_block(block_mgr, &dir.join(DATA_FILE), data_block)?;
    if entry.tombstone {
        Ok(GetResult::Tombstone)
    } else {
        Ok(GetResult::Value(entry.value))
    }
}

// ------------------------------------------------------------------------------------------------
// Meta / merkle
// ------------------------------------------------------------------------------------------------

/// Reads the entry count from a run's `meta` file.
pub fn read_meta(dir: &Path) -> Result<usize, SSTableError> {
    let data = fs::read(dir.join(META_FILE))?;
    let (count, _) = i64::decode_from(&data)?;
    usize::try_from(count).map_err(|_| SSTableError::MalformedMeta(format!("entry count {count}")))
}

/// Loads every entry of a run, as described by its `meta` file.
pub fn load_run_entries(dir: &Path, block_mgr: &BlockManager) -> Result<Vec<Entry>, SSTableError> {
    let count = read_meta(dir)?;
    read_data(&dir.join(DATA_FILE), count, block_mgr)
}

/// Recomputes a run's Merkle root from its data and compares it against
/// the stored witness.
pub fn validate_merkle(dir: &Path, block_mgr: &BlockManager) -> Result<bool, SSTableError> {
    let entries = load_run_entries(dir, block_mgr)?;
    let computed = merkle_root(&entries);
    let stored = fs::read_to_string(dir.join(MERKLE_FILE))?;
    Ok(computed == stored.trim())
}

// ------------------------------------------------------------------------------------------------
// Run directories
// ------------------------------------------------------------------------------------------------

/// Directory name for a run created at `nanos` on `level`.
pub fn run_dir_name(level: u32, nanos: u64) -> String {
    format!("{RUN_PREFIX}{level}_{nanos}")
}

/// Parses `sstable_L<level>_<nanos>` into `(level, nanos)`.
pub fn parse_run_name(name: &str) -> Option<(u32, u64)> {
    let rest = name.strip_prefix(RUN_PREFIX)?;
    let (level, nanos) = rest.split_once('_')?;
    Some((level.parse().ok()?, nanos.parse().ok()?))
}

/// Every run directory under `root`, directory names sorted descending
/// (newest first within a level; higher-numbered levels sort before
/// lower ones).
pub fn list_runs(root: &Path) -> Result<Vec<PathBuf>, SSTableError> {
    let mut runs: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && parse_run_name(name).is_some()
        {
            runs.push((name.to_string(), entry.path()));
        }
    }
    runs.sort_by(|(a, _), (b, _)| b.cmp(a));
    Ok(runs.into_iter().map(|(_, path)| path).collect())
}

/// The run directories on one level, newest first.
pub fn runs_at_level(root: &Path, level: u32) -> Result<Vec<PathBuf>, SSTableError> {
    let mut runs: Vec<(u64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && let Some((l, nanos)) = parse_run_name(name)
            && l == level
        {
            runs.push((nanos, entry.path()));
        }
    }
    runs.sort_by(|(na, _), (nb, _)| nb.cmp(na));
    Ok(runs.into_iter().map(|(_, path)| path).collect())
}
