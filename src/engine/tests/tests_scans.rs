#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::engine::tests::helpers::{config, load_keys, open_unlimited};

    #[test]
    fn test_range_scan_is_sorted_and_inclusive() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 20);

        let scan = engine.range_scan(b"key005", b"key010").unwrap();
        let keys: Vec<Vec<u8>> = scan.keys().cloned().collect();
        assert_eq!(
            keys,
            (5..=10)
                .map(|i| format!("key{i:03}").into_bytes())
                .collect::<Vec<_>>()
        );
        assert_eq!(scan[b"key007".as_slice()], b"value7".to_vec());
    }

    #[test]
    fn test_range_scan_merges_memtables_and_sstables() {
        let tmp = TempDir::new().unwrap();
        // Rotation every 3 puts spreads the keys over runs and tables.
        let engine = open_unlimited(tmp.path(), config(3, 1));
        load_keys(&engine, 30);

        let scan = engine.range_scan(b"key000", b"key999").unwrap();
        assert_eq!(scan.len(), 30);
    }

    #[test]
    fn test_range_scan_prefers_newest_version() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 1));

        engine.put(b"k".to_vec(), b"old".to_vec()).unwrap();
        for i in 0..6 {
            engine.put(vec![b'f', i], vec![i]).unwrap();
        }
        engine.put(b"k".to_vec(), b"new".to_vec()).unwrap();

        let scan = engine.range_scan(b"k", b"k").unwrap();
        assert_eq!(scan[b"k".as_slice()], b"new".to_vec());
    }

    #[test]
    fn test_range_scan_hides_deleted_keys() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(2, 1));

        // "gone" reaches an SSTable, its tombstone stays in memory.
        engine.put(b"gone".to_vec(), b"x".to_vec()).unwrap();
        engine.put(b"kept".to_vec(), b"y".to_vec()).unwrap();
        for i in 0..6 {
            engine.put(vec![b'f', i], vec![i]).unwrap();
        }
        engine.delete(b"gone".to_vec()).unwrap();

        let scan = engine.range_scan(b"a", b"z").unwrap();
        assert!(!scan.contains_key(b"gone".as_slice()));
        assert!(scan.contains_key(b"kept".as_slice()));
    }

    #[test]
    fn test_range_scan_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(3, 1));
        load_keys(&engine, 25);

        let first = engine.range_scan(b"key000", b"key020").unwrap();
        let second = engine.range_scan(b"key000", b"key020").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_range_scan_pagination_slices() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 30);

        let page0 = engine
            .range_scan_paginated(b"key000", b"key999", 0, 10)
            .unwrap();
        let page1 = engine
            .range_scan_paginated(b"key000", b"key999", 1, 10)
            .unwrap();
        assert_eq!(page0.len(), 10);
        assert_eq!(page0[0].0, b"key000".to_vec());
        assert_eq!(page1[0].0, b"key010".to_vec());

        // A page past the end is empty, a partial page is short.
        let page2 = engine
            .range_scan_paginated(b"key000", b"key024", 2, 10)
            .unwrap();
        assert_eq!(page2.len(), 5);
        let page9 = engine
            .range_scan_paginated(b"key000", b"key999", 9, 10)
            .unwrap();
        assert!(page9.is_empty());
    }

    #[test]
    fn test_prefix_scan_all() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 100);

        let scan = engine.prefix_scan_all(b"key09").unwrap();
        let keys: Vec<Vec<u8>> = scan.keys().cloned().collect();
        assert_eq!(
            keys,
            (90..100)
                .map(|i| format!("key{i:03}").into_bytes())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_prefix_scan_paginated() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 100);

        let page = engine.prefix_scan_paginated(b"key09", 0, 5).unwrap();
        let keys: Vec<Vec<u8>> = page.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            (90..95)
                .map(|i| format!("key{i:03}").into_bytes())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_prefix_scan_with_no_matches() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 10);

        assert!(engine.prefix_scan_all(b"zzz").unwrap().is_empty());
    }

    #[test]
    fn test_range_iterator_walks_and_stops() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 10);

        let mut iter = engine.new_range_iterator(b"key002", b"key005").unwrap();
        assert_eq!(iter.remaining(), 4);

        let (key, value) = iter.next().unwrap();
        assert_eq!(key, b"key002".to_vec());
        assert_eq!(value, b"value2".to_vec());
        assert_eq!(iter.next().unwrap().0, b"key003".to_vec());

        iter.stop();
        assert!(iter.next().is_none());
        assert_eq!(iter.remaining(), 0);
    }

    #[test]
    fn test_range_iterator_exhausts() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 3);

        let mut iter = engine.new_range_iterator(b"key000", b"key999").unwrap();
        let mut seen = 0;
        while iter.next().is_some() {
            seen += 1;
        }
        assert_eq!(seen, 3);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_prefix_iterator() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 25);

        let mut iter = engine.new_prefix_iterator(b"key01").unwrap();
        let mut keys = Vec::new();
        while let Some((key, _)) = iter.next() {
            keys.push(key);
        }
        assert_eq!(
            keys,
            (10..20)
                .map(|i| format!("key{i:03}").into_bytes())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_iterator_snapshot_ignores_later_writes() {
        let tmp = TempDir::new().unwrap();
        let engine = open_unlimited(tmp.path(), config(100, 2));
        load_keys(&engine, 5);

        let mut iter = engine.new_range_iterator(b"key000", b"key999").unwrap();
        engine.put(b"key900".to_vec(), b"late".to_vec()).unwrap();

        // Materialized at creation: the late write is not in this cursor.
        let mut count = 0;
        while iter.next().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }
}
