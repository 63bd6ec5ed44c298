//! Write path: [`Engine::set`], [`Engine::delete`], [`Engine::force_flush`],
//! and the rotation/flush machinery they share.
//!
//! Every mutation is appended to the write-ahead log before it touches the
//! active memtable, so a crash can never lose an acknowledged write. When
//! the active memtable has no room left for the incoming entry, both the
//! WAL and the memtable are rotated before the write is applied.

use memtable::Memtable;
use tracing::{debug, info};
use wal::WalWriter;

use crate::{Engine, EngineError};

impl Engine {
    /// Inserts a value for `key` (the `SET` command).
    pub fn set(&mut self, key: &[u8], val: &[u8]) -> Result<(), EngineError> {
        self.wal.record_insertion(key, val)?;
        self.prep_memtable_for_kv(key, val)?;
        self.mutable().insert(key, val);
        self.maybe_schedule_flush()?;
        Ok(())
    }

    /// Inserts a tombstone for `key` (the `DEL` command).
    pub fn delete(&mut self, key: &[u8]) -> Result<(), EngineError> {
        self.wal.record_deletion(key)?;
        self.prep_memtable_for_kv(key, &[])?;
        self.mutable().insert_tombstone(key);
        self.maybe_schedule_flush()?;
        Ok(())
    }

    /// Flushes every queued memtable to SSTable, including the currently
    /// active one, and rotates in a fresh WAL segment and empty memtable to
    /// resume writes. Unlike the flush triggered automatically by `set`/
    /// `delete`, this never leaves the active memtable behind.
    pub fn force_flush(&mut self) -> Result<(), EngineError> {
        if self.mutable_ref().is_empty() && self.queue.len() == 1 {
            return Ok(());
        }
        self.rotate_memtables()?;
        self.flush_queue(1)
    }

    /// Rotates the WAL and the active memtable if the incoming write would
    /// not fit in the current one.
    fn prep_memtable_for_kv(&mut self, key: &[u8], val: &[u8]) -> Result<(), EngineError> {
        if !self.mutable_ref().has_room_for_write(key, val) {
            debug!(
                key_len = key.len(),
                "active memtable has no room, rotating"
            );
            self.rotate_memtables()?;
        }
        Ok(())
    }

    /// Opens a new WAL segment, closing the old one, and pushes a fresh
    /// empty memtable backed by it onto the queue. The memtable just
    /// rotated out stays in the queue awaiting flush.
    pub(crate) fn rotate_memtables(&mut self) -> Result<(), EngineError> {
        self.rotate_wal()?;
        let mem = Memtable::new(self.config.memtable_size_limit, self.wal_file);
        self.queue.push_back(mem);
        Ok(())
    }

    fn rotate_wal(&mut self) -> Result<(), EngineError> {
        let new_file = self.provider.prepare_new_wal_file();
        let file = self.provider.open_for_writing(new_file)?;
        let new_writer = WalWriter::new(file);
        let old_writer = std::mem::replace(&mut self.wal, new_writer);
        old_writer.close()?;
        self.wal_file = new_file;
        Ok(())
    }

    /// Flushes every queued memtable but the active one to a new SSTable if
    /// the queued (not-yet-flushed) bytes exceed the configured threshold.
    fn maybe_schedule_flush(&mut self) -> Result<(), EngineError> {
        let queued: usize = self.queue.iter().map(Memtable::size).sum();
        if queued > self.config.memtable_flush_threshold {
            self.flush_queue(1)?;
        }
        Ok(())
    }

    /// Flushes up to `keep_back` memtables from the front of the queue to
    /// SSTable, oldest first, deleting each one's WAL segment once its data
    /// is safely on disk. A `keep_back` of `0` flushes the whole queue.
    fn flush_queue(&mut self, keep_back: usize) -> Result<(), EngineError> {
        while self.queue.len() > keep_back {
            let mem = self
                .queue
                .pop_front()
                .expect("loop condition guarantees a front entry");
            if !mem.is_empty() {
                self.flush_one(&mem)?;
            }
            self.provider.delete_file(mem.wal_file())?;
        }
        Ok(())
    }

    fn flush_one(&mut self, mem: &Memtable) -> Result<(), EngineError> {
        let sst_file = self.provider.prepare_new_sst_file();
        let path = self.provider.path_for(sst_file);
        info!(file_num = sst_file.file_num(), "flushing memtable to sstable");
        let mut writer = sstable::SSTableWriter::create(&path)?;
        writer.process(mem.iter())?;
        writer.close()?;
        self.sstables.push(sst_file);
        Ok(())
    }
}
