//! Run writer: materializes an entry slice as a complete SSTable
//! directory.

use std::fs::{self, File};
use std::path::Path;

use tracing::info;

use crate::block::BlockManager;
use crate::encoding::encode_to_vec;
use crate::filter::BloomFilter;

use super::{
    BLOOM_FALSE_POSITIVE_RATE, BLOOM_FILE, DATA_FILE, Entry, INDEX_FILE, MERKLE_FILE, META_FILE,
    SSTableError, SUMMARY_FILE, SUMMARY_SAMPLING_RATE, encode_index_block, merkle_root,
};

/// Writes a full run — `data`, `meta`, `index`, `summary`, `bloom`,
/// `merkle` — into `dir`, then syncs every file.
///
/// Entries are sorted by key before anything touches the disk; callers may
/// pass them in any order. Tombstoned entries are written like any other:
/// dropping them is compaction's decision, not the writer's.
///
/// The bloom filter covers **every** key of the run, tombstoned ones
/// included, so a filtered point lookup still surfaces the authoritative
/// tombstone instead of falling through to an older run.
pub fn write_all_files(
    dir: &Path,
    mut entries: Vec<Entry>,
    block_mgr: &BlockManager,
) -> Result<(), SSTableError> {
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    // Touch the block files so an empty run still reads as
    // end-of-file rather than file-not-found.
    let data_path = dir.join(DATA_FILE);
    let index_path = dir.join(INDEX_FILE);
    let summary_path = dir.join(SUMMARY_FILE);
    for path in [&data_path, &index_path, &summary_path] {
        File::create(path)?;
    }

    // data: one entry per block, in key order.
    for (block_num, entry) in entries.iter().enumerate() {
        let block = entry.encode_block()?;
        block_mgr.write_block(&data_path, block_num as u64, &block)?;
    }

    // meta: the entry count.
    let meta_path = dir.join(META_FILE);
    fs::write(&meta_path, encode_to_vec(&(entries.len() as i64))?)?;

    // index: one block per entry, pointing at its data block.
    for (block_num, entry) in entries.iter().enumerate() {
        let block = encode_index_block(&entry.key, block_num as u64)?;
        block_mgr.write_block(&index_path, block_num as u64, &block)?;
    }

    // summary: every SUMMARY_SAMPLING_RATE-th index entry's key and that
    // index entry's byte offset.
    let block_size = block_mgr.block_size() as u64;
    let mut summary_block = 0u64;
    for (index_block, entry) in entries.iter().enumerate() {
        if index_block % SUMMARY_SAMPLING_RATE != 0 {
            continue;
        }
        let byte_offset = index_block as u64 * block_size;
        let block = encode_index_block(&entry.key, byte_offset)?;
        block_mgr.write_block(&summary_path, summary_block, &block)?;
        summary_block += 1;
    }

    // bloom: all keys of the run.
    let mut bloom = BloomFilter::new(entries.len(), BLOOM_FALSE_POSITIVE_RATE);
    for entry in &entries {
        bloom.add(&entry.key);
    }
    let bloom_path = dir.join(BLOOM_FILE);
    bloom.save(&bloom_path)?;

    // merkle: hex root over the sorted entries.
    let merkle_path = dir.join(MERKLE_FILE);
    fs::write(&merkle_path, merkle_root(&entries))?;

    // The run only counts as durable once every file has hit the disk.
    for path in [
        &data_path,
        &index_path,
        &summary_path,
        &meta_path,
        &bloom_path,
        &merkle_path,
    ] {
        File::open(path)?.sync_all()?;
    }

    info!(dir = %dir.display(), entries = entries.len(), "SSTable run complete");
    Ok(())
}
