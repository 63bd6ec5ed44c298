//! Value encoding shared by the WAL, memtable, and SSTable layers.
//!
//! Every value stored anywhere in the engine — in a WAL record, a memtable
//! entry, or an SSTable index entry — carries a one-byte `opKind` prefix
//! ahead of its payload, so a single tagged variant can travel unchanged
//! through every layer instead of each one inventing its own tombstone
//! convention.
//!
//! ```text
//! [opKind: u8][payload ...]
//! opKind = 0 -> Delete (tombstone), payload is empty
//! opKind = 1 -> Set, payload is the value bytes
//! ```

use thiserror::Error;

/// A decoded value: either a live payload or a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A live value.
    Set(Vec<u8>),
    /// A deletion marker.
    Delete,
}

impl Value {
    /// Returns `true` if this value is a tombstone.
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Value::Delete)
    }

    /// Returns the payload bytes, or `None` for a tombstone.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Set(bytes) => Some(bytes),
            Value::Delete => None,
        }
    }
}

/// Errors produced while decoding an encoded value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer was empty — there was no `opKind` byte to read.
    #[error("encoded value is empty")]
    Empty,
    /// The `opKind` byte did not match a known variant.
    #[error("unknown opKind byte: {0}")]
    UnknownOpKind(u8),
}

/// Encodes `value` into its one-byte-prefixed wire representation.
pub fn encode(value: &Value) -> Vec<u8> {
    match value {
        Value::Delete => vec![0u8],
        Value::Set(bytes) => {
            let mut buf = Vec::with_capacity(1 + bytes.len());
            buf.push(1u8);
            buf.extend_from_slice(bytes);
            buf
        }
    }
}

/// Parses a buffer produced by [`encode`] back into a [`Value`].
pub fn decode(buf: &[u8]) -> Result<Value, CodecError> {
    match buf.first() {
        None => Err(CodecError::Empty),
        Some(0) => Ok(Value::Delete),
        Some(1) => Ok(Value::Set(buf[1..].to_vec())),
        Some(other) => Err(CodecError::UnknownOpKind(*other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_set_value() {
        let encoded = encode(&Value::Set(b"world".to_vec()));
        assert_eq!(encoded, b"\x01world");
        assert_eq!(decode(&encoded).unwrap(), Value::Set(b"world".to_vec()));
    }

    #[test]
    fn round_trips_a_tombstone() {
        let encoded = encode(&Value::Delete);
        assert_eq!(encoded, b"\x00");
        assert_eq!(decode(&encoded).unwrap(), Value::Delete);
    }

    #[test]
    fn empty_value_is_a_live_set_with_no_bytes() {
        let encoded = encode(&Value::Set(Vec::new()));
        assert_eq!(encoded, b"\x01");
        assert_eq!(decode(&encoded).unwrap(), Value::Set(Vec::new()));
    }

    #[test]
    fn rejects_an_empty_buffer() {
        assert_eq!(decode(&[]).unwrap_err(), CodecError::Empty);
    }

    #[test]
    fn rejects_an_unknown_op_kind() {
        assert_eq!(decode(&[7, 1, 2]).unwrap_err(), CodecError::UnknownOpKind(7));
    }
}
