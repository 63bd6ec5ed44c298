//! SSTable block format: prefix-compressed entries, restart points, and the
//! block footer shared by data blocks and the index block.
//!
//! A block is a sequence of chunks, each holding up to `chunk_size` entries
//! that share a common key prefix (the chunk's first key). Every chunk's
//! starting offset is recorded as a "restart point" so a reader can binary
//! search straight to the right chunk without decoding the whole block.
//!
//! ```text
//! entry: uvarint(sharedLen) uvarint(unsharedLen) uvarint(valLen) keyTail value
//! block: entry* restartOffset:u32[numRestarts] totalBlockLen:u32 numRestarts:u32
//! ```
//!
//! Data blocks use a chunk size of 16; the index block uses a chunk size of
//! 1, so every index entry is its own restart point (prefix compression is
//! effectively disabled for the index).

use integer_encoding::VarInt;

/// Size of a data block before a flush is triggered: `floor(4096 * 0.9)`.
pub const BLOCK_FLUSH_THRESHOLD: usize = 3686;
/// Number of entries per restart point in a data block.
pub const DATA_BLOCK_CHUNK_SIZE: usize = 16;
/// Number of entries per restart point in the index block (disables prefix
/// sharing — every entry restarts).
pub const INDEX_BLOCK_CHUNK_SIZE: usize = 1;
/// Size of one restart-offset entry in the trailer.
pub const OFFSET_SIZE: usize = 4;
/// Size of a block's internal footer: `totalBlockLen: u32` + `numRestarts: u32`.
pub const FOOTER_SIZE: usize = 8;

/// Builds a single block's payload: prefix-compressed entries followed by
/// the restart-offset trailer and footer.
///
/// Mirrors the teacher's `blockWriter`: a reusable buffer is grown on
/// demand rather than reallocated per entry.
pub struct BlockWriter {
    buf: Vec<u8>,
    offsets: Vec<u32>,
    curr_offset: u32,
    next_offset: u32,
    chunk_size: usize,
    num_entries: usize,
    prefix_key: Option<Vec<u8>>,
}

impl BlockWriter {
    /// Creates a writer that starts a new restart point every `chunk_size`
    /// entries.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(4096),
            offsets: Vec::new(),
            curr_offset: 0,
            next_offset: 0,
            chunk_size,
            num_entries: 0,
            prefix_key: None,
        }
    }

    /// The block's buffered bytes so far (entries only, no trailer yet).
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    fn shared_len(&self, key: &[u8]) -> usize {
        let Some(prefix) = &self.prefix_key else {
            return 0;
        };
        key.iter().zip(prefix.iter()).take_while(|(a, b)| a == b).count()
    }

    /// Appends one key/value entry, prefix-compressed against the current
    /// chunk's first key. Returns the number of bytes written.
    pub fn add(&mut self, key: &[u8], val: &[u8]) -> usize {
        let shared_len = self.shared_len(key);
        if self.prefix_key.is_none() {
            self.prefix_key = Some(key.to_vec());
        }
        let unshared_len = key.len() - shared_len;

        let start = self.buf.len();
        let mut varint_buf = [0u8; 10];
        for value in [shared_len as u64, unshared_len as u64, val.len() as u64] {
            let n = value.encode_var(&mut varint_buf);
            self.buf.extend_from_slice(&varint_buf[..n]);
        }
        self.buf.extend_from_slice(&key[shared_len..]);
        self.buf.extend_from_slice(val);

        let written = self.buf.len() - start;
        self.num_entries += 1;
        self.track_offset(written as u32);
        written
    }

    fn track_offset(&mut self, n: u32) {
        self.next_offset += n;
        if self.num_entries == self.chunk_size {
            self.offsets.push(self.curr_offset);
            self.curr_offset = self.next_offset;
            self.num_entries = 0;
            self.prefix_key = None;
        }
    }

    /// `true` if no entry has been added since the last `finish`/`reset`.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends the restart-offset trailer and footer to the buffered
    /// entries, completing the block.
    pub fn finish(&mut self) {
        if self.prefix_key.is_some() {
            self.offsets.push(self.curr_offset);
        }
        for offset in &self.offsets {
            self.buf.extend_from_slice(&offset.to_le_bytes());
        }
        let total_len = (self.buf.len() + FOOTER_SIZE) as u32;
        let num_offsets = self.offsets.len() as u32;
        self.buf.extend_from_slice(&total_len.to_le_bytes());
        self.buf.extend_from_slice(&num_offsets.to_le_bytes());
    }

    /// Clears all writer state so the buffer can be reused for the next
    /// block.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.offsets.clear();
        self.curr_offset = 0;
        self.next_offset = 0;
        self.num_entries = 0;
        self.prefix_key = None;
    }
}

impl Default for BlockWriter {
    fn default() -> Self {
        Self::new(DATA_BLOCK_CHUNK_SIZE)
    }
}

/// Which direction a restart-array binary search advances: the index block
/// stores each block's *largest* key (advance while `search > key`), while a
/// data block's restarts delimit ranges beginning at a restart key (advance
/// while `search >= key`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCondition {
    /// Advance while `search_key >= key` (data block restarts).
    MoveUpWhenKeyGte,
    /// Advance while `search_key > key` (index block restarts).
    MoveUpWhenKeyGt,
}

/// A read-only view over one block's bytes: entries plus the restart array
/// and footer parsed out of the tail.
pub struct BlockReader<'a> {
    buf: &'a [u8],
    offsets: &'a [u8],
    offsets_start: usize,
    num_offsets: usize,
}

impl<'a> BlockReader<'a> {
    /// Wraps `buf`, a block's full uncompressed bytes (entries + trailer +
    /// footer), by parsing the footer to locate the restart array.
    pub fn new(buf: &'a [u8]) -> Self {
        let len = buf.len();
        let num_offsets =
            u32::from_le_bytes(buf[len - FOOTER_SIZE..len - OFFSET_SIZE].try_into().unwrap())
                as usize;
        let offsets_start = len - FOOTER_SIZE - num_offsets * OFFSET_SIZE;
        Self {
            buf,
            offsets: &buf[offsets_start..len - FOOTER_SIZE],
            offsets_start,
            num_offsets,
        }
    }

    /// Number of restart points in this block.
    pub fn num_offsets(&self) -> usize {
        self.num_offsets
    }

    /// The restart offset recorded at position `pos`.
    pub fn offset_at(&self, pos: usize) -> usize {
        u32::from_le_bytes(
            self.offsets[pos * OFFSET_SIZE..pos * OFFSET_SIZE + OFFSET_SIZE]
                .try_into()
                .unwrap(),
        ) as usize
    }

    /// The byte offset one past the end of the entries area — either the
    /// next restart point, or the start of the trailer if `pos` is the last
    /// restart point.
    pub fn chunk_end(&self, pos: usize) -> usize {
        if pos + 1 < self.num_offsets {
            self.offset_at(pos + 1)
        } else {
            self.offsets_start
        }
    }

    /// Reads the full key and raw value of the entry at restart point
    /// `pos`. Restart entries always have `sharedLen = 0`.
    pub fn restart_entry(&self, pos: usize) -> (Vec<u8>, &'a [u8]) {
        let offset = self.offset_at(pos);
        let (key, val, _) = self.entry_at(offset, &[]);
        (key, val)
    }

    /// Reconstructs the full key and raw value at the entry beginning at
    /// byte `offset`, re-applying `sharedLen` against the chunk's first key.
    fn entry_at(&self, offset: usize, chunk_prefix: &[u8]) -> (Vec<u8>, &'a [u8], usize) {
        let mut pos = offset;
        let (shared_len, n) = u64::decode_var(&self.buf[pos..]).expect("malformed shared_len");
        pos += n;
        let (unshared_len, n) = u64::decode_var(&self.buf[pos..]).expect("malformed unshared_len");
        pos += n;
        let (val_len, n) = u64::decode_var(&self.buf[pos..]).expect("malformed val_len");
        pos += n;
        let shared_len = shared_len as usize;
        let unshared_len = unshared_len as usize;
        let val_len = val_len as usize;

        let mut key = Vec::with_capacity(shared_len + unshared_len);
        key.extend_from_slice(&chunk_prefix[..shared_len]);
        key.extend_from_slice(&self.buf[pos..pos + unshared_len]);
        pos += unshared_len;
        let val = &self.buf[pos..pos + val_len];
        pos += val_len;
        (key, val, pos)
    }

    /// Reads the key at restart position `pos` (the chunk's first key, so
    /// `sharedLen` is always 0 there).
    fn key_at_restart(&self, pos: usize) -> Vec<u8> {
        let offset = self.offset_at(pos);
        let (key, _, _) = self.entry_at(offset, &[]);
        key
    }

    /// Binary searches the restart array for the first position satisfying
    /// `condition`, returning that position (which may equal `num_offsets`).
    pub fn search(&self, search_key: &[u8], condition: SearchCondition) -> usize {
        let threshold: i32 = match condition {
            SearchCondition::MoveUpWhenKeyGte => 0,
            SearchCondition::MoveUpWhenKeyGt => 1,
        };
        let (mut low, mut high) = (0usize, self.num_offsets);
        while low < high {
            let mid = (low + high) / 2;
            let key = self.key_at_restart(mid);
            let cmp = match search_key.cmp(key.as_slice()) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            };
            if cmp >= threshold {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    /// Sequentially scans the chunk `[start, end)` of raw block bytes for
    /// `search_key`, returning its value on an exact match. Stops early once
    /// a reconstructed key exceeds `search_key`.
    pub fn scan_chunk(&self, start: usize, end: usize, search_key: &[u8]) -> Option<&'a [u8]> {
        let mut pos = start;
        let mut chunk_prefix: Vec<u8> = Vec::new();
        let mut first = true;
        while pos < end {
            let (key, val, next_pos) = self.entry_at(pos, &chunk_prefix);
            if first {
                chunk_prefix = key.clone();
                first = false;
            }
            match search_key.cmp(key.as_slice()) {
                std::cmp::Ordering::Equal => return Some(val),
                std::cmp::Ordering::Less => return None,
                std::cmp::Ordering::Greater => {}
            }
            pos = next_pos;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_entries_through_a_single_chunk() {
        let mut w = BlockWriter::new(16);
        w.add(b"apple", b"1");
        w.add(b"apricot", b"2");
        w.add(b"banana", b"3");
        w.finish();

        let r = BlockReader::new(w.bytes());
        assert_eq!(r.num_offsets(), 1);
        let start = r.offset_at(0);
        let end = r.chunk_end(0);
        assert_eq!(r.scan_chunk(start, end, b"apricot"), Some(b"2".as_slice()));
        assert_eq!(r.scan_chunk(start, end, b"missing"), None);
    }

    #[test]
    fn restart_points_break_prefix_sharing_across_chunks() {
        let mut w = BlockWriter::new(2);
        for (k, v) in [("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")] {
            w.add(k.as_bytes(), v.as_bytes());
        }
        w.finish();
        let r = BlockReader::new(w.bytes());
        // 5 entries, chunk size 2 -> 3 restart points (2, 2, 1).
        assert_eq!(r.num_offsets(), 3);
    }
}
