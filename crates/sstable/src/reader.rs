//! Point lookups against an immutable SSTable file.
//!
//! A lookup does two binary searches — one over the index block's restart
//! array to find the right data block, one over that data block's own
//! restart array to find the right chunk — followed by a short linear scan
//! over at most [`format::DATA_BLOCK_CHUNK_SIZE`] entries.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use snap::raw::Decoder as SnappyDecoder;
use thiserror::Error;

use crate::format::{BlockReader, SearchCondition, FOOTER_SIZE};
use storage::Value;

/// Errors produced while reading an SSTable.
#[derive(Debug, Error)]
pub enum SsTableError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Snappy failed to decompress a data block.
    #[error("decompression error: {0}")]
    Decompression(#[from] snap::Error),
    /// The encoded value stored in the SSTable could not be decoded.
    #[error("corrupt sstable entry: {0}")]
    Codec(#[from] storage::CodecError),
}

/// Opens an SSTable for point lookups.
///
/// Every [`get`](SSTableReader::get) call re-reads the index block from
/// disk; the engine opens a fresh reader per `Get` and drops it before
/// returning (see the engine façade's read path), so no index caching is
/// attempted here.
pub struct SSTableReader {
    file: File,
    file_size: u64,
}

impl SSTableReader {
    /// Opens the SSTable at `path` and learns its size via `stat`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SsTableError> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        Ok(Self { file, file_size })
    }

    fn read_index_block(&mut self) -> Result<Vec<u8>, SsTableError> {
        let mut footer = [0u8; FOOTER_SIZE];
        self.file.seek(SeekFrom::Start(self.file_size - FOOTER_SIZE as u64))?;
        self.file.read_exact(&mut footer)?;
        let index_len = u32::from_le_bytes(footer[0..4].try_into().unwrap()) as u64;

        let mut buf = vec![0u8; index_len as usize];
        self.file.seek(SeekFrom::Start(self.file_size - index_len))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_data_block(&mut self, block_offset: u32, block_len: u32) -> Result<Vec<u8>, SsTableError> {
        let mut compressed = vec![0u8; block_len as usize];
        self.file.seek(SeekFrom::Start(block_offset as u64))?;
        self.file.read_exact(&mut compressed)?;
        Ok(SnappyDecoder::new().decompress_vec(&compressed)?)
    }

    /// Looks up `key`, returning its decoded [`Value`] if this SSTable
    /// contains it, or `Ok(None)` if `key` is absent.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Value>, SsTableError> {
        let index_buf = self.read_index_block()?;
        let index = BlockReader::new(&index_buf);

        // Step 1: which data block could hold `key`? The index stores each
        // block's largest key, so advance while `key` is strictly greater.
        let pos = index.search(key, SearchCondition::MoveUpWhenKeyGt);
        if pos >= index.num_offsets() {
            // `key` exceeds the largest key in this SSTable.
            return Ok(None);
        }
        // The index block's chunk size is 1: every restart point is its own
        // entry, so no further scan within the index is needed.
        let (_largest_key, index_value) = index.restart_entry(pos);
        let Value::Set(payload) = storage::decode(index_value)? else {
            unreachable!("index entries are always encoded as Set")
        };
        let block_offset = u32::from_le_bytes(payload[0..4].try_into().unwrap());
        let block_len = u32::from_le_bytes(payload[4..8].try_into().unwrap());

        let data_buf = self.read_data_block(block_offset, block_len)?;
        let data = BlockReader::new(&data_buf);

        // Step 2: which chunk within the data block? Restarts delimit
        // ranges beginning at a restart key, so advance while `key >= key`.
        let pos = data.search(key, SearchCondition::MoveUpWhenKeyGte);
        if pos == 0 {
            // `key` is smaller than the block's first key.
            return Ok(None);
        }
        let chunk_start = data.offset_at(pos - 1);
        let chunk_end = data.chunk_end(pos - 1);

        match data.scan_chunk(chunk_start, chunk_end, key) {
            Some(encoded) => Ok(Some(storage::decode(encoded)?)),
            None => Ok(None),
        }
    }
}
