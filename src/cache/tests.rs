#[cfg(test)]
mod tests {
    use crate::cache::LruMap;

    #[test]
    fn test_put_and_get() {
        let mut cache: LruMap<String, Vec<u8>> = LruMap::new(4);
        cache.put("a".into(), b"1".to_vec());
        assert_eq!(cache.get(&"a".to_string()), Some(b"1".to_vec()));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[test]
    fn test_put_replaces_existing_value() {
        let mut cache: LruMap<String, Vec<u8>> = LruMap::new(4);
        cache.put("a".into(), b"1".to_vec());
        cache.put("a".into(), b"2".to_vec());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(b"2".to_vec()));
    }

    #[test]
    fn test_overflow_evicts_least_recently_used() {
        let mut cache: LruMap<String, u32> = LruMap::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("c".into(), 3);

        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"b".to_string()), Some(2));
        assert_eq!(cache.get(&"c".to_string()), Some(3));
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut cache: LruMap<String, u32> = LruMap::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get(&"a".to_string()), Some(1));
        cache.put("c".into(), 3);

        assert_eq!(cache.get(&"a".to_string()), Some(1));
        assert_eq!(cache.get(&"b".to_string()), None);
    }

    #[test]
    fn test_remove() {
        let mut cache: LruMap<String, u32> = LruMap::new(2);
        cache.put("a".into(), 1);
        assert_eq!(cache.remove(&"a".to_string()), Some(1));
        assert_eq!(cache.remove(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_items_snapshot_is_mru_first() {
        let mut cache: LruMap<String, u32> = LruMap::new(3);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("c".into(), 3);
        cache.get(&"a".to_string());

        let items = cache.items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], ("a".to_string(), 1));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache: LruMap<String, u32> = LruMap::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put("a".into(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn test_byte_keys() {
        let mut cache: LruMap<Vec<u8>, Vec<u8>> = LruMap::new(2);
        cache.put(b"k1".to_vec(), b"v1".to_vec());
        assert_eq!(cache.get(&b"k1".to_vec()), Some(b"v1".to_vec()));
    }
}
