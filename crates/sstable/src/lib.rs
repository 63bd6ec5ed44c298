//! # SSTable — Sorted String Table
//!
//! The immutable, on-disk layer of the storage engine. When a memtable is
//! sealed the engine streams it through [`SSTableWriter`] into a new file;
//! reads that miss every memtable fall through to [`SSTableReader::get`]
//! against each SSTable, newest first.
//!
//! ## File layout
//!
//! ```text
//! [data block]* [index block] [u32 indexBlockTotalLen][u32 numRestarts]
//! ```
//!
//! Data blocks are Snappy-compressed; the index block is written
//! uncompressed and its own internal footer doubles as the file's trailer.
//! See [`format`] for the block layout shared by both.

mod format;
mod reader;
mod writer;

pub use format::{BlockReader, BlockWriter, SearchCondition, BLOCK_FLUSH_THRESHOLD, DATA_BLOCK_CHUNK_SIZE, INDEX_BLOCK_CHUNK_SIZE};
pub use reader::{SSTableReader, SsTableError as ReaderError};
pub use writer::{SSTableWriter, SsTableError as WriterError};

#[cfg(test)]
mod tests;
