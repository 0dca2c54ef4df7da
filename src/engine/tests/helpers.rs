use std::path::Path;

use crate::config::StoreConfig;
use crate::engine::Engine;

/// A small-store configuration with explicit rotation knobs.
pub fn config(mem_cap: usize, max_tables: usize) -> StoreConfig {
    StoreConfig {
        memtable_type: "skiplist".into(),
        memtable_max_entries: mem_cap,
        memtable_max_tables: max_tables,
        wal_segment_size: 8,
        max_sstable_files: 100,
        max_levels: 4,
        sstable_files_per_level: 4,
        block_size_kb: 4,
        cache_capacity: 64,
    }
}

/// Opens an engine with a bucket large enough that tests never trip the
/// rate limiter by accident.
pub fn open_unlimited(root: &Path, config: StoreConfig) -> Engine {
    let engine = Engine::open(root, config).unwrap();
    engine.set_rate_limit(1_000_000, 1_000).unwrap();
    engine
}

/// Bulk-loads `count` keys shaped `key000`, `key001`, … with values
/// `value0`, `value1`, …
pub fn load_keys(engine: &Engine, count: usize) {
    for i in 0..count {
        engine
            .put(
                format!("key{i:03}").into_bytes(),
                format!("value{i}").into_bytes(),
            )
            .unwrap();
    }
}
