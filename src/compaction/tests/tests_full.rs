#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use crate::block::BlockManager;
    use crate::compaction::compact_all;
    use crate::sstable::{self, Entry};

    fn write_run(root: &Path, level: u32, nanos: u64, entries: Vec<Entry>, bm: &BlockManager) {
        let dir = root.join(sstable::run_dir_name(level, nanos));
        std::fs::create_dir_all(&dir).unwrap();
        sstable::write_all_files(&dir, entries, bm).unwrap();
    }

    fn entry(key: &str, value: &str, ts: u64) -> Entry {
        Entry {
            key: key.as_bytes().to_vec(),
            value: value.as_bytes().to_vec(),
            tombstone: false,
            timestamp: ts,
        }
    }

    fn tombstone(key: &str, ts: u64) -> Entry {
        Entry {
            key: key.as_bytes().to_vec(),
            value: Vec::new(),
            tombstone: true,
            timestamp: ts,
        }
    }

    #[test]
    fn test_fewer_than_two_runs_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let bm = BlockManager::new(4, 64);

        assert!(!compact_all(tmp.path(), &bm).unwrap());

        write_run(tmp.path(), 0, 1, vec![entry("a", "1", 1)], &bm);
        assert!(!compact_all(tmp.path(), &bm).unwrap());
        assert_eq!(sstable::list_runs(tmp.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_merge_keeps_newest_version_per_key() {
        let tmp = TempDir::new().unwrap();
        let bm = BlockManager::new(4, 64);

        write_run(
            tmp.path(),
            0,
            1,
            vec![entry("a", "old", 10), entry("b", "b1", 11)],
            &bm,
        );
        write_run(
            tmp.path(),
            0,
            2,
            vec![entry("a", "new", 20), entry("c", "c1", 12)],
            &bm,
        );

        assert!(compact_all(tmp.path(), &bm).unwrap());

        let runs = sstable::list_runs(tmp.path()).unwrap();
        assert_eq!(runs.len(), 1);

        let entries = sstable::load_run_entries(&runs[0], &bm).unwrap();
        assert_eq!(entries.len(), 3);
        let a = entries.iter().find(|e| e.key == b"a").unwrap();
        assert_eq!(a.value, b"new");
    }

    #[test]
    fn test_merge_drops_tombstones() {
        let tmp = TempDir::new().unwrap();
        let bm = BlockManager::new(4, 64);

        write_run(
            tmp.path(),
            0,
            1,
            vec![entry("kept", "v", 10), entry("deleted", "v", 11)],
            &bm,
        );
        write_run(tmp.path(), 0, 2, vec![tombstone("deleted", 20)], &bm);

        assert!(compact_all(tmp.path(), &bm).unwrap());

        let runs = sstable::list_runs(tmp.path()).unwrap();
        let entries = sstable::load_run_entries(&runs[0], &bm).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, b"kept");
    }

    #[test]
    fn test_stale_tombstone_does_not_erase_newer_put() {
        let tmp = TempDir::new().unwrap();
        let bm = BlockManager::new(4, 64);

        write_run(tmp.path(), 0, 1, vec![tombstone("k", 10)], &bm);
        write_run(tmp.path(), 0, 2, vec![entry("k", "revived", 20)], &bm);

        assert!(compact_all(tmp.path(), &bm).unwrap());

        let runs = sstable::list_runs(tmp.path()).unwrap();
        let entries = sstable::load_run_entries(&runs[0], &bm).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, b"revived");
    }

    #[test]
    fn test_output_is_a_fresh_level_zero_run() {
        let tmp = TempDir::new().unwrap();
        let bm = BlockManager::new(4, 64);

        write_run(tmp.path(), 0, 1, vec![entry("a", "1", 1)], &bm);
        write_run(tmp.path(), 1, 2, vec![entry("b", "2", 2)], &bm);

        assert!(compact_all(tmp.path(), &bm).unwrap());

        let runs = sstable::list_runs(tmp.path()).unwrap();
        assert_eq!(runs.len(), 1);
        let name = runs[0].file_name().unwrap().to_str().unwrap().to_string();
        let (level, _) = sstable::parse_run_name(&name).unwrap();
        assert_eq!(level, 0);

        // Old directories are gone.
        assert!(!tmp.path().join("sstable_L0_1").exists());
        assert!(!tmp.path().join("sstable_L1_2").exists());
    }

    #[test]
    fn test_merged_run_is_internally_consistent() {
        let tmp = TempDir::new().unwrap();
        let bm = BlockManager::new(4, 64);

        let first: Vec<Entry> = (0..20)
            .map(|i| entry(&format!("k{i:02}"), &format!("a{i}"), i))
            .collect();
        let second: Vec<Entry> = (10..30)
            .map(|i| entry(&format!("k{i:02}"), &format!("b{i}"), 100 + i))
            .collect();
        write_run(tmp.path(), 0, 1, first, &bm);
        write_run(tmp.path(), 0, 2, second, &bm);

        assert!(compact_all(tmp.path(), &bm).unwrap());

        let runs = sstable::list_runs(tmp.path()).unwrap();
        let entries = sstable::load_run_entries(&runs[0], &bm).unwrap();
        assert_eq!(entries.len(), 30);

        // Sorted, overlap resolved toward the newer run, merkle valid.
        let keys: Vec<Vec<u8>> = entries.iter().map(|e| e.key.clone()).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        let k15 = entries.iter().find(|e| e.key == b"k15").unwrap();
        assert_eq!(k15.value, b"b15");
        assert!(sstable::validate_merkle(&runs[0], &bm).unwrap());
    }
}
