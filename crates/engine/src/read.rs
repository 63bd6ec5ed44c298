//! Read path: [`Engine::get`].
//!
//! A point lookup checks the queued memtables newest-first — the active
//! memtable, then each memtable still waiting to be flushed — then every
//! SSTable newest-first, opening a fresh reader per lookup. The first match,
//! live value or tombstone, wins: a tombstone shadows any older value
//! without the caller ever seeing it.

use storage::Value;

use crate::{Engine, EngineError};

impl Engine {
    /// Looks up `key`, returning its live value if present, or `None` if the
    /// key was never written or the most recent write was a deletion.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        for mem in self.queue.iter().rev() {
            if let Some(value) = mem.get(key) {
                return Ok(value.as_bytes().map(|b| b.to_vec()));
            }
        }

        for &sst_file in self.sstables.iter().rev() {
            let path = self.provider.path_for(sst_file);
            let mut reader = sstable::SSTableReader::open(&path)?;
            match reader.get(key)? {
                Some(Value::Set(bytes)) => return Ok(Some(bytes)),
                Some(Value::Delete) => return Ok(None),
                None => continue,
            }
        }

        Ok(None)
    }
}
