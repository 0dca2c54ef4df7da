//! Compaction Module
//!
//! Two merge routines over the SSTable runs of a store:
//!
//! - [`compact_all`] — a full, size-tiered merge. Every run is read, the
//!   newest entry per key wins, tombstones are dropped, and one fresh
//!   level-0 run replaces everything. Because the merge consumes *every*
//!   run, no older entry can survive for a dropped tombstone to shadow,
//!   so discarding them is safe here.
//! - [`auto_compact`] — leveled compaction. A level holding more runs than
//!   `sstable_files_per_level` has all of them merged into a single run
//!   one level deeper. On key collisions the larger timestamp wins.
//!   Tombstones are preserved through intermediate levels — an older run
//!   deeper down may still hold the shadowed key — and dropped only when
//!   the merge lands on an empty deepest level.
//!
//! Input directories are removed only after the replacement run is fully
//! written and synced; their cached blocks are evicted along with them.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::block::BlockManager;
use crate::clock;
use crate::sstable::{self, Entry, SSTableError};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by compaction.
#[derive(Debug, Error)]
pub enum CompactionError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// SSTable read or write failure.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Block-level failure while dropping cached blocks.
    #[error("block error: {0}")]
    Block(#[from] crate::block::BlockError),
}

/// Thresholds steering [`auto_compact`].
#[derive(Debug, Clone, Copy)]
pub struct LevelPolicy {
    /// Number of levels; runs can land on `0..max_levels`.
    pub max_levels: u32,

    /// A level holding more runs than this is compacted.
    pub sstables_per_level: usize,
}

// ------------------------------------------------------------------------------------------------
// Full merge
// ------------------------------------------------------------------------------------------------

/// Merges every run under `root` into one fresh level-0 run.
///
/// Keeps the entry with the largest timestamp per key and drops
/// tombstones. Does nothing (returns `false`) when fewer than two runs
/// exist.
pub fn compact_all(root: &Path, block_mgr: &BlockManager) -> Result<bool, CompactionError> {
    let runs = sstable::list_runs(root)?;
    if runs.len() < 2 {
        debug!(runs = runs.len(), "full compaction skipped");
        return Ok(false);
    }

    let mut merged: HashMap<Vec<u8>, Entry> = HashMap::new();
    for dir in &runs {
        for entry in sstable::load_run_entries(dir, block_mgr)? {
            match merged.get(&entry.key) {
                Some(existing) if existing.timestamp >= entry.timestamp => {}
                _ => {
                    merged.insert(entry.key.clone(), entry);
                }
            }
        }
    }

    let survivors: Vec<Entry> = merged.into_values().filter(|e| !e.tombstone).collect();

    let new_dir = root.join(sstable::run_dir_name(0, clock::now_nanos()));
    fs::create_dir_all(&new_dir)?;
    sstable::write_all_files(&new_dir, survivors, block_mgr)?;

    remove_runs(&runs, block_mgr)?;

    info!(
        merged_runs = runs.len(),
        new_run = %new_dir.display(),
        "full compaction complete"
    );
    Ok(true)
}

// ------------------------------------------------------------------------------------------------
// Leveled compaction
// ------------------------------------------------------------------------------------------------

/// Walks levels `0..max_levels − 1`, merging any level that exceeds its
/// run budget into a single run one level deeper.
///
/// Returns the number of level merges performed.
pub fn auto_compact(
    root: &Path,
    block_mgr: &BlockManager,
    policy: LevelPolicy,
) -> Result<usize, CompactionError> {
    let mut merges = 0;
    for level in 0..policy.max_levels.saturating_sub(1) {
        if compact_level(root, block_mgr, level, policy)? {
            merges += 1;
        }
    }
    Ok(merges)
}

/// Merges every run on `level` into one run on `level + 1` when the level
/// holds more than `sstables_per_level` runs.
fn compact_level(
    root: &Path,
    block_mgr: &BlockManager,
    level: u32,
    policy: LevelPolicy,
) -> Result<bool, CompactionError> {
    let runs = sstable::runs_at_level(root, level)?;
    if runs.len() <= policy.sstables_per_level {
        return Ok(false);
    }

    let target_level = level + 1;
    // A tombstone may only die once nothing older can resurface its key:
    // the merge must land on the deepest level, and that level must not
    // already hold runs (they are older than everything being merged).
    let drop_tombstones = target_level == policy.max_levels - 1
        && sstable::runs_at_level(root, target_level)?.is_empty();

    debug!(level, runs = runs.len(), drop_tombstones, "compacting level");

    let mut merged: HashMap<Vec<u8>, Entry> = HashMap::new();
    for dir in &runs {
        for entry in sstable::load_run_entries(dir, block_mgr)? {
            match merged.get(&entry.key) {
                Some(existing) if existing.timestamp >= entry.timestamp => {}
                _ => {
                    merged.insert(entry.key.clone(), entry);
                }
            }
        }
    }

    let survivors: Vec<Entry> = merged
        .into_values()
        .filter(|e| !(drop_tombstones && e.tombstone))
        .collect();

    let new_dir = root.join(sstable::run_dir_name(target_level, clock::now_nanos()));
    fs::create_dir_all(&new_dir)?;
    sstable::write_all_files(&new_dir, survivors, block_mgr)?;

    remove_runs(&runs, block_mgr)?;

    info!(
        level,
        target_level,
        merged_runs = runs.len(),
        "level compaction complete"
    );
    Ok(true)
}

/// Deletes consumed run directories and their cached blocks.
fn remove_runs(runs: &[std::path::PathBuf], block_mgr: &BlockManager) -> Result<(), CompactionError> {
    for dir in runs {
        for file in [sstable::DATA_FILE, sstable::INDEX_FILE, sstable::SUMMARY_FILE] {
            block_mgr.evict_file(&dir.join(file))?;
        }
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}
