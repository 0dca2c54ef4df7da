#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::engine::tests::helpers::{config, open_unlimited};
    use crate::engine::{Engine, EngineError};

    #[test]
    fn test_put_get_delete() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));

        engine.put(b"k".to_vec(), b"v".to_vec()).unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));

        engine.delete(b"k".to_vec()).unwrap();
        assert_eq!(engine.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_get_of_never_written_key() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        assert_eq!(engine.get(b"ghost").unwrap(), None);
    }

    #[test]
    fn test_overwrite_returns_latest() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));

        engine.put(b"k".to_vec(), b"v1".to_vec()).unwrap();
        engine.put(b"k".to_vec(), b"v2".to_vec()).unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_reads_survive_rotation_and_flush() {
        let tmp = TempDir::new().unwrap();
        // Tiny tables force every third put through rotation + flush.
        let engine = open_unlimited(tmp.path(), config(2, 1));

        for i in 0..20 {
            engine
                .put(format!("key{i:02}").into_bytes(), vec![i as u8])
                .unwrap();
        }

        for i in 0..20 {
            assert_eq!(
                engine.get(format!("key{i:02}").as_bytes()).unwrap(),
                Some(vec![i as u8]),
                "key{i:02}"
            );
        }
    }

    #[test]
    fn test_delete_shadows_flushed_value() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 1));

        // Push "victim" into an SSTable, then delete it; the tombstone in
        // the memtable chain must win over the on-disk value.
        engine.put(b"victim".to_vec(), b"alive".to_vec()).unwrap();
        for i in 0..6 {
            engine.put(vec![b'f', i], vec![i]).unwrap();
        }
        let stats = engine.stats().unwrap();
        assert!(stats.sstable_runs > 0, "setup needs at least one flush");

        engine.delete(b"victim".to_vec()).unwrap();
        assert_eq!(engine.get(b"victim").unwrap(), None);
    }

    #[test]
    fn test_tombstone_shadows_through_sstables() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 1));

        // Value and its tombstone both end up flushed, in separate runs.
        engine.put(b"victim".to_vec(), b"alive".to_vec()).unwrap();
        for i in 0..6 {
            engine.put(vec![b'f', i], vec![i]).unwrap();
        }
        engine.delete(b"victim".to_vec()).unwrap();
        for i in 6..12 {
            engine.put(vec![b'f', i], vec![i]).unwrap();
        }
        engine.flush_all_memtables().unwrap();

        assert_eq!(engine.get(b"victim").unwrap(), None);
    }

    #[test]
    fn test_put_after_delete_revives_across_layers() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 1));

        engine.put(b"k".to_vec(), b"v1".to_vec()).unwrap();
        engine.delete(b"k".to_vec()).unwrap();
        for i in 0..6 {
            engine.put(vec![b'f', i], vec![i]).unwrap();
        }
        engine.put(b"k".to_vec(), b"v2".to_vec()).unwrap();

        assert_eq!(engine.get(b"k").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_rate_limiter_denies_when_empty() {
        let tmp = TempDir::new().unwrap();
        let engine = Engine::open(tmp.path(), config(100, 2)).unwrap();
        engine.set_rate_limit(2, 60_000).unwrap();

        engine.put(b"a".to_vec(), b"1".to_vec()).unwrap();
        engine.put(b"b".to_vec(), b"2".to_vec()).unwrap();

        let err = engine.put(b"c".to_vec(), b"3".to_vec()).unwrap_err();
        assert!(matches!(err, EngineError::RateLimited));

        // Reads are gated by the same bucket.
        let err = engine.get(b"a").unwrap_err();
        assert!(matches!(err, EngineError::RateLimited));
    }

    #[test]
    fn test_oversized_record_is_rejected_up_front() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));

        // 4 KiB blocks hold at most 4096 − 29 bytes of key + value.
        let err = engine
            .put(b"k".to_vec(), vec![0xAB; 5000])
            .unwrap_err();
        assert!(matches!(err, EngineError::Wal(_)));

        // The failed put left no trace.
        assert_eq!(engine.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_flush_all_memtables_drains_read_only_tables() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 5));

        for i in 0..9 {
            engine.put(vec![b'k', i], vec![i]).unwrap();
        }
        let before = engine.stats().unwrap();
        assert!(before.read_only_tables > 0);

        engine.flush_all_memtables().unwrap();

        let after = engine.stats().unwrap();
        assert_eq!(after.read_only_tables, 0);
        assert_eq!(after.sstable_runs, before.sstable_runs + before.read_only_tables);

        for i in 0..9 {
            assert_eq!(engine.get(&[b'k', i]).unwrap(), Some(vec![i]));
        }
    }

    #[test]
    fn test_hashmap_engine_behaves_identically() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = config(2, 1);
        cfg.memtable_type = "hashmap".into();
        let engine = open_unlimited(tmp.path(), cfg);

        for i in 0..10 {
            engine.put(vec![b'k', i], vec![i]).unwrap();
        }
        engine.delete(vec![b'k', 3]).unwrap();

        for i in 0..10 {
            let expected = if i == 3 { None } else { Some(vec![i]) };
            assert_eq!(engine.get(&[b'k', i]).unwrap(), expected);
        }
    }
}
