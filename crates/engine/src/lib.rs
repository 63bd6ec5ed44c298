//! # Engine — the RiptideKV storage façade
//!
//! Ties the [`memtable`], [`wal`], and [`sstable`] crates together into a
//! single embedded, single-node, ordered key-value store.
//!
//! ## Write path
//!
//! 1. Append the record to the write-ahead log (crash-safe durability).
//! 2. If the active memtable has no room for the new entry, rotate: open a
//!    fresh WAL segment and push a fresh, empty memtable onto the queue.
//! 3. Apply the mutation to the now-active memtable.
//! 4. If the queued (not-yet-flushed) memtables' total size exceeds the
//!    configured threshold, flush every queued memtable but the active one
//!    to a new SSTable and delete its now-redundant WAL segment.
//!
//! ## Read path
//!
//! Check the queued memtables newest-first (the active one first), then
//! every SSTable newest-first. The first match — live value or tombstone —
//! wins.
//!
//! ## Recovery
//!
//! Opening an [`Engine`] replays every WAL segment left on disk by a prior
//! run, in ascending file-number order, flushing the reconstructed memtables
//! to SSTables before accepting new writes.

mod read;
mod recovery;
mod write;

use std::collections::VecDeque;
use std::io;
use std::path::Path;

use memtable::Memtable;
use storage::{FileMetadata, Provider, StorageError};
use thiserror::Error;
use wal::{WalError, WalWriter};

/// Tunable knobs for an [`Engine`] instance.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum approximate byte size a single memtable may grow to before
    /// it is rotated out of the write path.
    pub memtable_size_limit: usize,
    /// Total size, summed across every queued (not-yet-flushed) memtable,
    /// that triggers a flush to SSTable.
    pub memtable_flush_threshold: usize,
}

impl Default for EngineConfig {
    /// Five 3 KiB memtables' worth of headroom before rotation, and a flush
    /// as soon as anything is queued behind the active memtable.
    fn default() -> Self {
        Self {
            memtable_size_limit: 5 * 3 * 1024,
            memtable_flush_threshold: 1,
        }
    }
}

/// Errors produced by the storage engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A failure opening, listing, or deleting a data file.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// A failure writing or replaying the write-ahead log.
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
    /// A failure writing an SSTable during a flush.
    #[error("sstable write error: {0}")]
    Writer(#[from] sstable::WriterError),
    /// A failure reading an SSTable during a lookup.
    #[error("sstable read error: {0}")]
    Reader(#[from] sstable::ReaderError),
    /// An underlying I/O error not covered by the above.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// The embedded, single-node, ordered key-value store.
///
/// Every queued memtable, including the currently active one, lives in
/// `queue`; the active memtable is always its last entry. `sstables` holds
/// the file metadata of every flushed SSTable, oldest first, so scanning
/// newest-first is simply `sstables.iter().rev()`.
pub struct Engine {
    provider: Provider,
    config: EngineConfig,
    wal: WalWriter,
    wal_file: FileMetadata,
    queue: VecDeque<Memtable>,
    sstables: Vec<FileMetadata>,
}

impl Engine {
    /// Opens (creating if necessary) the database rooted at `data_dir`,
    /// replaying any WAL segments left behind by a prior run.
    pub fn open<P: AsRef<Path>>(data_dir: P, config: EngineConfig) -> Result<Self, EngineError> {
        recovery::open(data_dir, config)
    }

    /// Opens the database at `data_dir` with [`EngineConfig::default`].
    pub fn open_default<P: AsRef<Path>>(data_dir: P) -> Result<Self, EngineError> {
        Self::open(data_dir, EngineConfig::default())
    }

    fn mutable(&mut self) -> &mut Memtable {
        self.queue
            .back_mut()
            .expect("the engine always keeps one mutable memtable")
    }

    fn mutable_ref(&self) -> &Memtable {
        self.queue
            .back()
            .expect("the engine always keeps one mutable memtable")
    }

    /// Closes the engine's current WAL segment cleanly.
    ///
    /// Does not flush the active memtable — an unflushed memtable is
    /// recovered from its WAL on the next `open`, exactly as if the process
    /// had been killed without calling `close` at all.
    pub fn close(self) -> Result<(), EngineError> {
        self.wal.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
