//! # Storage
//!
//! The durable-state foundation shared by the WAL, memtable, and SSTable
//! crates: the data-directory file naming scheme ([`Provider`],
//! [`FileMetadata`]) and the one-byte-prefixed value encoding
//! ([`codec::Value`]) that every on-disk and in-memory representation of a
//! value is built on.

mod codec;
mod provider;

pub use codec::{decode, encode, CodecError, Value};
pub use provider::{FileMetadata, FileType, Provider, StorageError};
