//! Streams a sealed memtable into an immutable, on-disk SSTable.
//!
//! Keys are consumed in ascending order from the memtable's iterator and
//! packed into prefix-compressed data blocks. A block is flushed (Snappy
//! compressed and written) once its uncompressed size passes
//! [`format::BLOCK_FLUSH_THRESHOLD`]; the block's largest key and its
//! `(offset, length)` become one entry in the index block, which is written
//! uncompressed once every data block has been flushed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use snap::raw::Encoder as SnappyEncoder;
use thiserror::Error;

use crate::format::{BlockWriter, BLOCK_FLUSH_THRESHOLD, DATA_BLOCK_CHUNK_SIZE, INDEX_BLOCK_CHUNK_SIZE};
use storage::Value;

/// Errors produced while writing an SSTable.
#[derive(Debug, Error)]
pub enum SsTableError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Snappy failed to compress a data block.
    #[error("compression error: {0}")]
    Compression(#[from] snap::Error),
}

/// Writes one SSTable file from a sorted `(key, encodedValue)` sequence.
pub struct SSTableWriter {
    bw: BufWriter<File>,
    data_block: BlockWriter,
    index_block: BlockWriter,
    encoder: SnappyEncoder,
    compression_buf: Vec<u8>,

    offset: u32,
    bytes_written: usize,
    last_key: Vec<u8>,
}

impl SSTableWriter {
    /// Creates a new SSTable at `path`, truncating any existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SsTableError> {
        let file = File::create(path)?;
        Ok(Self {
            bw: BufWriter::new(file),
            data_block: BlockWriter::new(DATA_BLOCK_CHUNK_SIZE),
            index_block: BlockWriter::new(INDEX_BLOCK_CHUNK_SIZE),
            encoder: SnappyEncoder::new(),
            compression_buf: Vec::new(),
            offset: 0,
            bytes_written: 0,
            last_key: Vec::new(),
        })
    }

    /// Streams every `(key, encodedValue)` pair from `iter`, flushing data
    /// blocks as they fill, then writes the index block.
    ///
    /// `iter` must yield keys in ascending order — the caller (a sealed
    /// memtable's iterator) already guarantees this.
    pub fn process<'a, I>(&mut self, iter: I) -> Result<(), SsTableError>
    where
        I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
    {
        for (key, val) in iter {
            let n = self.data_block.add(key, val);
            self.bytes_written += n;
            self.last_key = key.to_vec();

            if self.bytes_written > BLOCK_FLUSH_THRESHOLD {
                self.flush_data_block()?;
            }
        }
        self.flush_data_block()?;
        self.index_block.finish();
        self.bw.write_all(self.index_block.bytes())?;
        Ok(())
    }

    fn flush_data_block(&mut self) -> Result<(), SsTableError> {
        if self.bytes_written == 0 {
            return Ok(());
        }
        self.data_block.finish();
        self.compression_buf = self.encoder.compress_vec(self.data_block.bytes())?;
        self.data_block.reset();
        self.bw.write_all(&self.compression_buf)?;
        self.add_index_entry();
        self.offset += self.compression_buf.len() as u32;
        self.bytes_written = 0;
        Ok(())
    }

    fn add_index_entry(&mut self) {
        let mut payload = [0u8; 8];
        payload[0..4].copy_from_slice(&self.offset.to_le_bytes());
        payload[4..8].copy_from_slice(&(self.compression_buf.len() as u32).to_le_bytes());
        let encoded = storage::encode(&Value::Set(payload.to_vec()));
        let last_key = std::mem::take(&mut self.last_key);
        self.index_block.add(&last_key, &encoded);
        self.last_key = last_key;
    }

    /// Flushes the buffered writer, fsyncs, and closes the file.
    pub fn close(mut self) -> Result<(), SsTableError> {
        self.bw.flush()?;
        self.bw.get_ref().sync_all()?;
        Ok(())
    }
}
