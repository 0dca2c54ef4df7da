//! Store configuration.
//!
//! Loaded once at startup from a JSON file; every field has a default so a
//! partial file (or none at all) still yields a working store.
//!
//! ```json
//! {
//!   "memtable_type": "skiplist",
//!   "memtable_max_entries": 1024,
//!   "memtable_max_tables": 4,
//!   "wal_segment_size": 64,
//!   "max_sstable_files": 16,
//!   "max_levels": 4,
//!   "sstable_files_per_level": 4,
//!   "block_size_kb": 4,
//!   "cache_capacity": 128
//! }
//! ```


use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memtable::MemtableKind;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON that does not parse into a configuration.
    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holding an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// All tunables of a store instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Memtable implementation: `"hashmap"` or `"skiplist"`.
    #[serde(default = "default_memtable_type")]
    pub memtable_type: String,

    /// Entry-count capacity of the active memtable before rotation.
    #[serde(default = "default_memtable_max_entries")]
    pub memtable_max_entries: usize,

    /// Memtable count (active + read-only) that triggers a flush of the
    /// oldest read-only table.
    #[serde(default = "default_memtable_max_tables")]
    pub memtable_max_tables: usize,

    /// Records per WAL segment before rotation.
    #[serde(default = "default_wal_segment_size")]
    pub wal_segment_size: usize,

    /// Total run count that triggers a full merge after flush.
    #[serde(default = "default_max_sstable_files")]
    pub max_sstable_files: usize,

    /// Number of SSTable levels.
    #[serde(default = "default_max_levels")]
    pub max_levels: u32,

    /// Runs a level may hold before leveled compaction picks it up.
    #[serde(default = "default_sstable_files_per_level")]
    pub sstable_files_per_level: usize,

    /// Block size in KiB for all block-aligned files.
    #[serde(default = "default_block_size_kb")]
    pub block_size_kb: usize,

    /// Block cache capacity in blocks.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_memtable_type() -> String {
    "skiplist".to_string()
}
fn default_memtable_max_entries() -> usize {
    1024
}
fn default_memtable_max_tables() -> usize {
    4
}
fn default_wal_segment_size() -> usize {
    64
}
fn default_max_sstable_files() -> usize {
    16
}
fn default_max_levels() -> u32 {
    4
}
fn default_sstable_files_per_level() -> usize {
    4
}
fn default_block_size_kb() -> usize {
    4
}
fn default_cache_capacity() -> usize {
    128
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            memtable_type: default_memtable_type(),
            memtable_max_entries: default_memtable_max_entries(),
            memtable_max_tables: default_memtable_max_tables(),
            wal_segment_size: default_wal_segment_size(),
            max_sstable_files: default_max_sstable_files(),
            max_levels: default_max_levels(),
            sstable_files_per_level: default_sstable_files_per_level(),
            block_size_kb: default_block_size_kb(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl StoreConfig {
    /// Reads and validates a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: StoreConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.memtable_kind()?;
        if self.memtable_max_entries == 0 {
            return Err(ConfigError::Invalid("memtable_max_entries must be ≥ 1".into()));
        }
        if self.memtable_max_tables == 0 {
            return Err(ConfigError::Invalid("memtable_max_tables must be ≥ 1".into()));
        }
        if self.wal_segment_size == 0 {
            return Err(ConfigError::Invalid("wal_segment_size must be ≥ 1".into()));
        }
        if self.max_levels < 2 {
            return Err(ConfigError::Invalid("max_levels must be ≥ 2".into()));
        }
        if self.sstable_files_per_level == 0 {
            return Err(ConfigError::Invalid(
                "sstable_files_per_level must be ≥ 1".into(),
            ));
        }
        if self.block_size_kb == 0 {
            return Err(ConfigError::Invalid("block_size_kb must be ≥ 1".into()));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid("cache_capacity must be ≥ 1".into()));
        }
        Ok(())
    }

    /// The memtable implementation this configuration selects.
    pub fn memtable_kind(&self) -> Result<MemtableKind, ConfigError> {
        match self.memtable_type.as_str() {
            "hashmap" => Ok(MemtableKind::HashMap),
            "skiplist" => Ok(MemtableKind::SkipList),
            other => Err(ConfigError::Invalid(format!(
                "unknown memtable_type {other:?} (expected \"hashmap\" or \"skiplist\")"
            ))),
        }
    }
}
