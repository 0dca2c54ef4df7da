#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::block::BlockManager;
    use crate::wal::{Record, WalError, WalWriter, read_all_records};

    fn record(i: u64) -> Record {
        Record {
            timestamp: i,
            tombstone: false,
            key: format!("key{i}").into_bytes(),
            value: format!("value{i}").into_bytes(),
        }
    }

    /// Flips one byte at `offset` of `path`.
    fn flip_byte(path: &std::path::Path, offset: u64) {
        let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(offset)).unwrap();
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte).unwrap();
        file.seek(SeekFrom::Start(offset)).unwrap();
        file.write_all(&[byte[0] ^ 0xFF]).unwrap();
    }

    #[test]
    fn test_flipped_body_byte_fails_crc() {
        let tmp = TempDir::new().unwrap();
        let bm = Arc::new(BlockManager::new(1, 16));
        let path;
        {
            let mut wal = WalWriter::open(tmp.path(), 10, Arc::clone(&bm)).unwrap();
            wal.append(&record(1)).unwrap();
            path = wal.current_segment_path();
        }

        // Corrupt a key byte (offset 29 is the first key byte of block 0),
        // then bypass the warm cache with a fresh manager.
        flip_byte(&path, 29);
        let cold = BlockManager::new(1, 16);

        let err = read_all_records(&cold, &path).unwrap_err();
        assert!(matches!(err, WalError::CorruptRecord(_)));
    }

    #[test]
    fn test_flipped_crc_byte_fails() {
        let tmp = TempDir::new().unwrap();
        let bm = Arc::new(BlockManager::new(1, 16));
        let path;
        {
            let mut wal = WalWriter::open(tmp.path(), 10, Arc::clone(&bm)).unwrap();
            wal.append(&record(1)).unwrap();
            path = wal.current_segment_path();
        }

        flip_byte(&path, 0);
        let cold = BlockManager::new(1, 16);

        let err = read_all_records(&cold, &path).unwrap_err();
        assert!(matches!(err, WalError::CorruptRecord(_)));
    }

    #[test]
    fn test_records_before_corruption_survive() {
        let tmp = TempDir::new().unwrap();
        let bm = Arc::new(BlockManager::new(1, 16));
        let path;
        {
            let mut wal = WalWriter::open(tmp.path(), 10, Arc::clone(&bm)).unwrap();
            for i in 0..3 {
                wal.append(&record(i)).unwrap();
            }
            path = wal.current_segment_path();
        }

        // Corrupt the value area of block 2 only.
        flip_byte(&path, 2 * 1024 + 35);
        let cold = BlockManager::new(1, 16);

        let mut collected = Vec::new();
        let mut failure = None;
        for item in crate::wal::SegmentIter::new(&cold, &path) {
            match item {
                Ok(rec) => collected.push(rec),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].key, b"key0");
        assert_eq!(collected[1].key, b"key1");
        assert!(matches!(failure, Some(WalError::CorruptRecord(_))));
    }

    #[test]
    fn test_oversized_length_field_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let bm = Arc::new(BlockManager::new(1, 16));
        let path;
        {
            let mut wal = WalWriter::open(tmp.path(), 10, Arc::clone(&bm)).unwrap();
            wal.append(&record(1)).unwrap();
            path = wal.current_segment_path();
        }

        // Overwrite key_size (offset 13) with a size no block can hold.
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(13)).unwrap();
        file.write_all(&u64::MAX.to_le_bytes()).unwrap();
        let cold = BlockManager::new(1, 16);

        let err = read_all_records(&cold, &path).unwrap_err();
        assert!(matches!(err, WalError::CorruptRecord(_)));
    }

    #[test]
    fn test_all_zero_block_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let bm = Arc::new(BlockManager::new(1, 16));
        let mut wal = WalWriter::open(tmp.path(), 10, Arc::clone(&bm)).unwrap();
        let path = wal.current_segment_path();

        // Leave block 0 as an empty slot by writing only block 1.
        wal.append(&record(0)).unwrap();
        wal.append(&record(1)).unwrap();
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&vec![0u8; 1024]).unwrap();
        let cold = BlockManager::new(1, 16);

        let records = read_all_records(&cold, &path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, b"key1");
    }

    #[test]
    fn test_pad_zero_flips_do_not_corrupt() {
        let tmp = TempDir::new().unwrap();
        let bm = Arc::new(BlockManager::new(1, 16));
        let path;
        {
            let mut wal = WalWriter::open(tmp.path(), 10, Arc::clone(&bm)).unwrap();
            wal.append(&record(1)).unwrap();
            wal.append(&record(2)).unwrap();
            path = wal.current_segment_path();
        }

        // Write into block 0's padding, past the record's last byte. The
        // CRC does not cover padding, so the record still reads back.
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(600)).unwrap();
        file.write_all(&[0x55]).unwrap();
        let cold = BlockManager::new(1, 16);

        let records = read_all_records(&cold, &path).unwrap();
        assert_eq!(records.len(), 2);
    }
}
