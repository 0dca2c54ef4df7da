#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::engine::tests::helpers::{config, load_keys, open_unlimited};

    #[test]
    fn test_stats_track_counters_and_structure() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(3, 1));

        load_keys(&engine, 7);
        engine.get(b"key001").unwrap();
        engine.get(b"key002").unwrap();
        engine.get(b"absent").unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.put_count, 7);
        assert_eq!(stats.get_count, 2);
        assert!(stats.sstable_runs >= 1);
        assert!(stats.active_entries <= 3);
    }

    #[test]
    fn test_wal_state_reports_position() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), {
            let mut cfg = config(100, 2);
            cfg.wal_segment_size = 4;
            cfg
        });

        load_keys(&engine, 6);

        let state = engine.wal_state().unwrap();
        assert_eq!(state.segment_index, 2);
        assert_eq!(state.records_in_segment, 2);
        assert_eq!(state.segment_file, "wal_segment_2.log");
    }

    #[test]
    fn test_memtable_state_lists_live_entries() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));

        engine.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        engine.put(b"b".to_vec(), b"2".to_vec()).unwrap();
        engine.delete(b"b".to_vec()).unwrap();

        let state = engine.memtable_state().unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state[b"a".as_slice()], b"1".to_vec());
    }

    #[test]
    fn test_cache_state_follows_reads_and_writes() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));

        engine.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        engine.put(b"b".to_vec(), b"2".to_vec()).unwrap();
        engine.delete(b"a".to_vec()).unwrap();

        let items = engine.cache_state().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0], (b"b".to_vec(), b"2".to_vec()));
    }

    #[test]
    fn test_config_round_trips_through_engine() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(42, 3);
        let engine = open_unlimited(tmp.path(), cfg.clone());

        let got = engine.config().unwrap();
        assert_eq!(got.memtable_max_entries, 42);
        assert_eq!(got.memtable_max_tables, 3);
        assert_eq!(got.memtable_type, cfg.memtable_type);
    }

    #[test]
    fn test_set_rate_limit_takes_effect_and_persists() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));

        engine.set_rate_limit(1, 60_000).unwrap();
        engine.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        assert!(engine.put(b"b".to_vec(), b"2".to_vec()).is_err());

        assert!(tmp.path().join("ratelimit.bucket").exists());
    }

    #[test]
    fn test_block_cache_fills_during_reads() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 1));

        for i in 0..8 {
            engine.put(vec![b'k', i], vec![i]).unwrap();
        }
        let stats = engine.stats().unwrap();
        assert!(stats.cached_blocks > 0);
    }
}
