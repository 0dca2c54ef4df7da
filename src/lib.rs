//! # StrataDB
//!
//! An embeddable, persistent, ordered key-value store built on a
//! **Log-Structured Merge Tree (LSM-tree)** with block-aligned storage.
//! Keys and values are opaque byte strings.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       Engine                           │
//! │  ┌────────────┐  ┌──────────────┐  ┌───────────────┐   │
//! │  │  Active    │  │  Read-only   │  │  SSTable runs │   │
//! │  │  memtable  │  │  memtables   │  │  (on disk)    │   │
//! │  │  + WAL     │  │              │  │               │   │
//! │  └─────┬──────┘  └──────┬───────┘  └───────┬───────┘   │
//! │        │   rotate       │   flush          │           │
//! │        └─────────►      └────────►         │           │
//! │                                            │           │
//! │  ┌─────────────────────────────────────────┘           │
//! │  │  Compaction (leveled / full merge)                  │
//! │  └─────────────────────────────────────────────────────┤
//! │                                                        │
//! │  Block manager + LRU block cache ── all file I/O       │
//! │  Token bucket ── admission gate for every operation    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Core storage engine — open, read, write, scan, flush, compact |
//! | [`memtable`] | In-memory ordered write buffer (hash map or skip list) |
//! | [`wal`] | Segmented, block-framed, CRC-protected write-ahead log |
//! | [`sstable`] | Immutable sorted runs with index/summary/bloom/merkle sidecars |
//! | [`compaction`] | Leveled compaction and full (size-tiered) merge |
//! | [`block`] | Fixed-size block I/O with a shared LRU block cache |
//! | [`cache`] | Bounded LRU map used by the block manager and the key cache |
//! | [`filter`] | Seeded-MD5 Bloom filter sidecar |
//! | [`limiter`] | Persistent token-bucket admission control |
//! | [`config`] | JSON configuration loading and validation |
//! | [`encoding`] | Deterministic little-endian wire primitives |
//!
//! ## Key Features
//!
//! - **Write-ahead logging** — every mutation lands in a block-framed,
//!   CRC32-protected WAL segment before it is applied in memory.
//! - **Crash recovery** — on startup the WAL is replayed (or a memtable
//!   snapshot is loaded) to reconstruct the last durable state.
//! - **Tombstone deletes** — deletions shadow older entries across the
//!   whole memtable/SSTable hierarchy until compaction can drop them.
//! - **Ordered scans** — range and prefix scans with pagination and
//!   cursor-style iterators.
//! - **Block-addressed reads** — summary → index → data lookups, one
//!   record per block, backed by a shared LRU block cache.
//! - **Leveled compaction** — runs promote level by level; a full merge
//!   collapses everything into a single level-0 run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratadb::config::StoreConfig;
//! use stratadb::engine::Engine;
//!
//! let config = StoreConfig::default();
//! let engine = Engine::open("/tmp/my_db", config).unwrap();
//!
//! // Write
//! engine.put(b"hello".to_vec(), b"world".to_vec()).unwrap();
//!
//! // Read
//! assert_eq!(engine.get(b"hello").unwrap(), Some(b"world".to_vec()));
//!
//! // Delete
//! engine.delete(b"hello".to_vec()).unwrap();
//! assert_eq!(engine.get(b"hello").unwrap(), None);
//!
//! // Ordered scan
//! engine.put(b"a".to_vec(), b"1".to_vec()).unwrap();
//! engine.put(b"b".to_vec(), b"2".to_vec()).unwrap();
//! let pairs = engine.range_scan(b"a", b"z").unwrap();
//!
//! // Graceful shutdown
//! engine.close().unwrap();
//! ```

pub mod block;
pub mod cache;
pub mod clock;
pub mod compaction;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod filter;
pub mod limiter;
pub mod memtable;
pub mod sstable;
pub mod wal;
