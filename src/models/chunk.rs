// file: src/models/chunk.rs
// description: raw byte chunk pulled from a source
// reference: internal data structures

/// A buffer of bytes as delivered by the source, tagged with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Zero-based index of this chunk within the stream.
    pub sequence: u64,
    /// Byte offset of the first byte of this chunk within the stream.
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl RawChunk {
    pub fn new(sequence: u64, offset: u64, bytes: Vec<u8>) -> Self {
        Self {
            sequence,
            offset,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset one past the last byte of this chunk.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }
}
