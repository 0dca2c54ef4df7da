//! Per-run Bloom filter.
//!
//! Each SSTable run carries a `bloom` sidecar so point lookups can skip
//! runs that certainly do not contain the key. The filter is sized from the
//! expected element count `n` and the target false-positive rate `p`:
//!
//! ```text
//! m = ceil(-n · ln p / (ln 2)²)      bits
//! k = ceil((m / n) · ln 2)           hash functions
//! ```
//!
//! The hash family is deterministic across restarts: hash `i` is the first
//! eight bytes of `MD5(data ‖ seed_i)` interpreted big-endian, where
//! `seed_i` is the 4-byte big-endian encoding of `i` (starting at zero).
//!
//! # Persistence
//!
//! `save`/`load` use the fixed sidecar format
//! `i64 size | i64 num_hashes | size × {0|1} bytes` with little-endian
//! integers — one byte per bit, so the file is trivially inspectable.


use std::fs;
use std::io;
use std::path::Path;

use bit_vec::BitVec;
use md5::{Digest, Md5};
use thiserror::Error;

use crate::encoding::{Decode, Encode, EncodingError};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned when persisting or loading a Bloom filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding / decoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// The sidecar file does not describe a well-formed filter.
    #[error("malformed bloom filter file: {0}")]
    Malformed(String),
}

// ------------------------------------------------------------------------------------------------
// Bloom Filter
// ------------------------------------------------------------------------------------------------

/// Approximate membership filter over a run's keys.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: BitVec,
    num_hashes: usize,
}

impl BloomFilter {
    /// Builds an empty filter sized for `expected_elements` entries at the
    /// given false-positive rate.
    ///
    /// `expected_elements` is clamped to at least one so an empty run still
    /// produces a valid (tiny) filter.
    pub fn new(expected_elements: usize, false_positive_rate: f64) -> Self {
        let n = expected_elements.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;

        let m = (-(n * false_positive_rate.ln()) / (ln2 * ln2)).ceil() as usize;
        let m = m.max(1);
        let k = ((m as f64 / n) * ln2).ceil() as usize;
        let k = k.max(1);

        Self {
            bits: BitVec::from_elem(m, false),
            num_hashes: k,
        }
    }

    /// Sets the `k` probe bits for `data`.
    pub fn add(&mut self, data: &[u8]) {
        let m = self.bits.len() as u64;
        for seed in 0..self.num_hashes {
            let index = (seeded_hash(seed as u32, data) % m) as usize;
            self.bits.set(index, true);
        }
    }

    /// Returns `false` when `data` is certainly absent; `true` when it is
    /// probably present.
    pub fn may_contain(&self, data: &[u8]) -> bool {
        let m = self.bits.len() as u64;
        for seed in 0..self.num_hashes {
            let index = (seeded_hash(seed as u32, data) % m) as usize;
            if !self.bits.get(index).unwrap_or(false) {
                return false;
            }
        }
        true
    }

    /// Number of bits in the filter (`m`).
    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Number of hash functions (`k`).
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// Writes the filter in the sidecar format.
    pub fn save(&self, path: &Path) -> Result<(), FilterError> {
        let mut buf = Vec::with_capacity(16 + self.bits.len());
        (self.bits.len() as i64).encode_to(&mut buf)?;
        (self.num_hashes as i64).encode_to(&mut buf)?;
        for bit in self.bits.iter() {
            buf.push(u8::from(bit));
        }
        fs::write(path, buf)?;
        Ok(())
    }

    /// Reads a filter back from the sidecar format.
    pub fn load(path: &Path) -> Result<Self, FilterError> {
        let data = fs::read(path)?;

        let mut offset = 0;
        let (size, used) = i64::decode_from(&data[offset..])?;
        offset += used;
        let (num_hashes, used) = i64::decode_from(&data[offset..])?;
        offset += used;

        if size < 0 || num_hashes <= 0 {
            return Err(FilterError::Malformed(format!(
                "size {size}, hashes {num_hashes}"
            )));
        }
        let size = size as usize;
        if data.len() - offset < size {
            return Err(FilterError::Malformed(format!(
                "expected {size} bit bytes, found {}",
                data.len() - offset
            )));
        }

        let mut bits = BitVec::from_elem(size, false);
        for (i, &byte) in data[offset..offset + size].iter().enumerate() {
            match byte {
                0 => {}
                1 => bits.set(i, true),
                other => {
                    return Err(FilterError::Malformed(format!(
                        "bit byte 0x{other:02X} at index {i}"
                    )));
                }
            }
        }

        Ok(Self {
            bits,
            num_hashes: num_hashes as usize,
        })
    }
}

/// First 8 bytes of `MD5(data ‖ seed_be32)`, big-endian.
fn seeded_hash(seed: u32, data: &[u8]) -> u64 {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();

    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(first)
}
