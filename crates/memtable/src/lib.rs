//! # Memtable
//!
//! An in-memory, sorted, mutable write buffer for the RiptideKV storage
//! engine, backed by the probabilistic ordered index in [`skiplist`].
//!
//! The memtable is the first point of contact for every write operation.
//! It buffers recent `SET`/`DELETE` operations before they are flushed to
//! an immutable on-disk SSTable, tracking an approximate byte size so the
//! engine can decide when to rotate and flush.
//!
//! ## Example
//!
//! ```rust
//! use memtable::Memtable;
//! use storage::Provider;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let mut provider = Provider::new(dir.path()).unwrap();
//! let wal_file = provider.prepare_new_wal_file();
//!
//! let mut m = Memtable::new(4096, wal_file);
//! m.insert(b"hello", b"world");
//! assert_eq!(m.get(b"hello").unwrap().as_bytes(), Some(b"world".as_slice()));
//!
//! m.insert_tombstone(b"hello");
//! assert!(m.get(b"hello").unwrap().is_tombstone());
//! ```

mod skiplist;

use skiplist::SkipList;
use storage::{FileMetadata, Value};

/// An ordered, in-memory write buffer backed by a skip list.
///
/// `sizeUsed` only ever grows: repeated writes to the same key are not
/// netted against each other. This is a deliberate, conservative bias (see
/// the crate's design notes) — it forces earlier rotation under a
/// write-heavy-on-one-key workload rather than risk under-estimating
/// memtable size.
pub struct Memtable {
    index: SkipList,
    size_limit: usize,
    size_used: usize,
    wal_file: FileMetadata,
}

impl Memtable {
    /// Creates a new, empty memtable bounded by `size_limit` bytes and
    /// backed by `wal_file`.
    pub fn new(size_limit: usize, wal_file: FileMetadata) -> Self {
        Self {
            index: SkipList::new(),
            size_limit,
            size_used: 0,
            wal_file,
        }
    }

    /// Returns `true` if inserting `key`/`val` (one extra byte for the
    /// op-kind tag) would still fit within `size_limit`.
    pub fn has_room_for_write(&self, key: &[u8], val: &[u8]) -> bool {
        let needed = key.len() + val.len() + 1;
        let available = self.size_limit.saturating_sub(self.size_used);
        needed <= available
    }

    /// Inserts a live value for `key`.
    pub fn insert(&mut self, key: &[u8], val: &[u8]) {
        let encoded = storage::encode(&Value::Set(val.to_vec()));
        self.index.insert(key.to_vec(), encoded);
        self.size_used += key.len() + val.len() + 1;
    }

    /// Inserts a tombstone for `key`. Contributes exactly one byte to
    /// `sizeUsed`, regardless of the key's length.
    pub fn insert_tombstone(&mut self, key: &[u8]) {
        let encoded = storage::encode(&Value::Delete);
        self.index.insert(key.to_vec(), encoded);
        self.size_used += 1;
    }

    /// Looks up `key`, returning its decoded [`Value`] (live or tombstone)
    /// if present.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.index
            .find(key)
            .map(|bytes| storage::decode(bytes).expect("memtable values are always well-formed"))
    }

    /// Returns an iterator over `(key, encodedValue)` pairs in ascending
    /// key order, including tombstones.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.index.iter()
    }

    /// The approximate byte size tracked so far.
    pub fn size(&self) -> usize {
        self.size_used
    }

    /// The WAL file metadata backing this memtable.
    pub fn wal_file(&self) -> FileMetadata {
        self.wal_file
    }

    /// `true` if no entry (live or tombstone) has been inserted.
    pub fn is_empty(&self) -> bool {
        self.size_used == 0
    }
}
