//! Write-Ahead Logging (WAL) Module
//!
//! An **append-only**, **segmented**, **block-framed** write-ahead log.
//! Every mutation the engine accepts is recorded here before it touches the
//! memtable, which is what makes crash recovery possible.
//!
//! # On-disk layout
//!
//! Segments are files named `wal_segment_<index>.log` (`index ≥ 1`) inside
//! the WAL directory. Each record occupies **exactly one block** of the
//! shared [`BlockManager`](crate::block::BlockManager):
//!
//! ```text
//! [0..4)    CRC32 of every following byte
//! [4..12)   timestamp (u64 LE)
//! [12..13)  tombstone (0 or 1)
//! [13..21)  key_size (u64 LE)
//! [21..29)  value_size (u64 LE)
//! [29..29+key_size)              key bytes
//! [..+value_size)                value bytes
//! [rest]    zero padding to the end of the block
//! ```
//!
//! One record per block wastes space for small records but makes recovery
//! trivially block-aligned: a block whose bytes are all zero is an empty
//! slot and is skipped; end of file ends the scan. The framing bounds a
//! record at `block_size − 29` bytes of key + value.
//!
//! # Segmentation
//!
//! A [`WalWriter`] opened against a directory discovers the highest
//! existing segment index, counts the valid records already in that
//! segment, and keeps appending to it until `segment_size` records are
//! reached; then it rotates to `index + 1`. Segments are deleted by the
//! engine once every memtable whose records they contain has been flushed
//! to an SSTable.
//!
//! # Guarantees
//!
//! - **Durability:** every `append` is followed by a file sync.
//! - **Integrity:** the per-record CRC32 covers the full record body;
//!   replay fails with [`WalError::CorruptRecord`] on the first mismatch.
//! - **Recovery:** [`replay`] applies every surviving record, in segment
//!   order, to the active memtable without re-logging.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crc32fast::Hasher as Crc32;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::block::{BlockError, BlockManager};
use crate::encoding::{Decode, Encode, EncodingError, put_raw, take_raw};
use crate::memtable::Memtable;

/// Fixed bytes in front of the key: CRC32 + timestamp + tombstone +
/// key_size + value_size.
pub const RECORD_OVERHEAD: usize = 4 + 8 + 1 + 8 + 8;

const SEGMENT_PREFIX: &str = "wal_segment_";
const SEGMENT_SUFFIX: &str = ".log";

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Block-level read or write failure.
    #[error("block error: {0}")]
    Block(#[from] BlockError),

    /// Encoding / decoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// CRC mismatch or header inconsistency in a stored record.
    #[error("corrupt WAL record: {0}")]
    CorruptRecord(String),

    /// A record too large for one block.
    #[error("record of {0} bytes exceeds block capacity")]
    RecordTooLarge(usize),
}

// ------------------------------------------------------------------------------------------------
// Record
// ------------------------------------------------------------------------------------------------

/// One logged operation. Tombstone records carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Nanosecond timestamp assigned at write time.
    pub timestamp: u64,

    /// True for a delete.
    pub tombstone: bool,

    /// Key bytes.
    pub key: Vec<u8>,

    /// Value bytes; empty and ignored when `tombstone` is set.
    pub value: Vec<u8>,
}

impl Record {
    /// Serializes the record as one block image: CRC first, then the body
    /// the CRC covers. No padding is appended — the block write leaves the
    /// tail sparse.
    fn encode_block(&self) -> Result<Vec<u8>, WalError> {
        let mut body = Vec::with_capacity(RECORD_OVERHEAD - 4 + self.key.len() + self.value.len());
        self.timestamp.encode_to(&mut body)?;
        self.tombstone.encode_to(&mut body)?;
        (self.key.len() as u64).encode_to(&mut body)?;
        (self.value.len() as u64).encode_to(&mut body)?;
        put_raw(&mut body, &self.key);
        put_raw(&mut body, &self.value);

        let mut hasher = Crc32::new();
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut block = Vec::with_capacity(4 + body.len());
        crc.encode_to(&mut block)?;
        block.extend_from_slice(&body);
        Ok(block)
    }

    /// Parses one block. Returns `Ok(None)` for an all-zero block (an
    /// empty slot left by sparse writes).
    fn decode_block(data: &[u8]) -> Result<Option<Record>, WalError> {
        if data.iter().all(|&b| b == 0) {
            return Ok(None);
        }

        if data.len() < RECORD_OVERHEAD {
            return Err(WalError::CorruptRecord(format!(
                "block of {} bytes is smaller than the record header",
                data.len()
            )));
        }

        let mut offset = 0;
        let (stored_crc, used) = u32::decode_from(&data[offset..])?;
        offset += used;
        let body_start = offset;

        let (timestamp, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (tombstone, used) = bool::decode_from(&data[offset..])
            .map_err(|e| WalError::CorruptRecord(format!("tombstone byte: {e}")))?;
        offset += used;
        let (key_size, used) = u64::decode_from(&data[offset..])?;
        offset += used;
        let (value_size, used) = u64::decode_from(&data[offset..])?;
        offset += used;

        let total = (RECORD_OVERHEAD as u64)
            .checked_add(key_size)
            .and_then(|t| t.checked_add(value_size))
            .ok_or_else(|| WalError::CorruptRecord("record size overflow".into()))?;
        if total > data.len() as u64 {
            return Err(WalError::CorruptRecord(format!(
                "record claims {total} bytes in a {}-byte block",
                data.len()
            )));
        }

        let (key, used) = take_raw(&data[offset..], key_size as usize)?;
        offset += used;
        let (value, used) = take_raw(&data[offset..], value_size as usize)?;
        offset += used;

        let mut hasher = Crc32::new();
        hasher.update(&data[body_start..offset]);
        let computed = hasher.finalize();
        if computed != stored_crc {
            return Err(WalError::CorruptRecord(format!(
                "CRC mismatch (stored {stored_crc:08x}, computed {computed:08x})"
            )));
        }

        Ok(Some(Record {
            timestamp,
            tombstone,
            key,
            value,
        }))
    }
}

// ------------------------------------------------------------------------------------------------
// Segment iteration
// ------------------------------------------------------------------------------------------------

/// Streaming reader over one segment's records.
///
/// Yields records block by block, skipping empty slots. End of file ends
/// the iteration; a damaged record surfaces as
/// [`WalError::CorruptRecord`] and stops it.
pub struct SegmentIter<'a> {
    block_mgr: &'a BlockManager,
    path: PathBuf,
    next_block: u64,
    done: bool,
}

impl<'a> SegmentIter<'a> {
    /// Starts reading `path` from block zero.
    pub fn new(block_mgr: &'a BlockManager, path: impl Into<PathBuf>) -> Self {
        Self {
            block_mgr,
            path: path.into(),
            next_block: 0,
            done: false,
        }
    }
}

impl Iterator for SegmentIter<'_> {
    type Item = Result<Record, WalError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let data = match self.block_mgr.read_block(&self.path, self.next_block) {
                Ok(data) => data,
                Err(BlockError::UnexpectedEof) => {
                    trace!(path = %self.path.display(), "WAL segment scan reached end of file");
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };
            self.next_block += 1;

            match Record::decode_block(&data) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue, // empty slot
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Reads every valid record of one segment.
pub fn read_all_records(block_mgr: &BlockManager, path: &Path) -> Result<Vec<Record>, WalError> {
    SegmentIter::new(block_mgr, path).collect()
}

/// Reads the records of every segment in `dir`, in ascending segment-index
/// order.
pub fn load_all_segments(block_mgr: &BlockManager, dir: &Path) -> Result<Vec<Record>, WalError> {
    let mut records = Vec::new();
    for (_, path) in list_segments(dir)? {
        records.extend(read_all_records(block_mgr, &path)?);
    }
    Ok(records)
}

/// Replays every segment into `memtable` without re-logging.
///
/// Records are applied one at a time, so a corrupt record leaves the
/// memtable holding exactly the records that preceded it. Returns the
/// number of records applied.
pub fn replay(
    block_mgr: &BlockManager,
    dir: &Path,
    memtable: &Memtable,
) -> Result<usize, WalError> {
    let mut applied = 0;
    for (index, path) in list_segments(dir)? {
        debug!(segment = index, "WAL replay of segment");
        for record in SegmentIter::new(block_mgr, &path) {
            let record = record?;
            if record.tombstone {
                memtable.delete(record.key);
            } else {
                memtable.put(record.key, record.value);
            }
            applied += 1;
        }
    }
    info!(records = applied, "WAL replay finished");
    Ok(applied)
}

// ------------------------------------------------------------------------------------------------
// Segment naming
// ------------------------------------------------------------------------------------------------

/// File name of segment `index`.
pub fn segment_file_name(index: u64) -> String {
    format!("{SEGMENT_PREFIX}{index}{SEGMENT_SUFFIX}")
}

/// Parses a segment index out of a file name, if it is one.
fn parse_segment_index(name: &str) -> Option<u64> {
    name.strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?
        .parse()
        .ok()
}

/// All segments in `dir`, sorted by ascending index.
pub fn list_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>, WalError> {
    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(name) = name.to_str()
            && let Some(index) = parse_segment_index(name)
        {
            segments.push((index, entry.path()));
        }
    }
    segments.sort_by_key(|(index, _)| *index);
    Ok(segments)
}

// ------------------------------------------------------------------------------------------------
// Writer
// ------------------------------------------------------------------------------------------------

/// Snapshot of the writer's position, for state inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalState {
    /// File name of the active segment.
    pub segment_file: String,

    /// Index of the active segment.
    pub segment_index: u64,

    /// Block slots already occupied in the active segment.
    pub records_in_segment: usize,
}

/// Appender over a directory of WAL segments.
#[derive(Debug)]
pub struct WalWriter {
    dir: PathBuf,
    segment_size: usize,
    block_mgr: Arc<BlockManager>,
    current_index: u64,
    records_in_file: usize,
}

impl WalWriter {
    /// Opens a writer against `dir`, creating the directory if needed.
    ///
    /// The writer resumes the highest-numbered existing segment and
    /// continues after its last occupied block slot, derived from the
    /// file length — earlier slots may be empty (zeroed) when a covered
    /// segment was deleted and recreated, and must never be rewritten
    /// out of order. With no segments present it starts at index 1.
    pub fn open(
        dir: impl Into<PathBuf>,
        segment_size: usize,
        block_mgr: Arc<BlockManager>,
    ) -> Result<Self, WalError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let segments = list_segments(&dir)?;
        let (current_index, records_in_file) = match segments.last() {
            Some((index, path)) => {
                let file_len = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let slots = file_len.div_ceil(block_mgr.block_size() as u64);
                (*index, slots as usize)
            }
            None => (1, 0),
        };

        info!(
            dir = %dir.display(),
            segment = current_index,
            records = records_in_file,
            "WAL writer opened"
        );

        Ok(Self {
            dir,
            segment_size: segment_size.max(1),
            block_mgr,
            current_index,
            records_in_file,
        })
    }

    /// Appends one record as a single block and syncs the segment.
    ///
    /// Rotates to the next segment first when the active one is full.
    pub fn append(&mut self, record: &Record) -> Result<(), WalError> {
        let capacity = self.block_mgr.block_size().saturating_sub(RECORD_OVERHEAD);
        if record.key.len() + record.value.len() > capacity {
            return Err(WalError::RecordTooLarge(
                RECORD_OVERHEAD + record.key.len() + record.value.len(),
            ));
        }

        if self.records_in_file >= self.segment_size {
            self.current_index += 1;
            self.records_in_file = 0;
            debug!(segment = self.current_index, "WAL rotated to new segment");
        }

        let path = self.current_segment_path();
        let block = record.encode_block()?;
        self.block_mgr
            .write_block(&path, self.records_in_file as u64, &block)?;
        self.block_mgr.sync(&path)?;
        self.records_in_file += 1;

        trace!(
            segment = self.current_index,
            block = self.records_in_file - 1,
            tombstone = record.tombstone,
            "WAL record appended"
        );
        Ok(())
    }

    /// Path of the segment the next append will land in.
    pub fn current_segment_path(&self) -> PathBuf {
        self.dir.join(segment_file_name(self.current_index))
    }

    /// Directory holding the segments.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writer position for state inspection.
    pub fn state(&self) -> WalState {
        WalState {
            segment_file: segment_file_name(self.current_index),
            segment_index: self.current_index,
            records_in_segment: self.records_in_file,
        }
    }
}
