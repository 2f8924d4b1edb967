// file: src/source/reader.rs
// description: pulls bounded raw chunks from a source, one at a time
// reference: leaf stage of the ingestion pipeline

use super::Source;
use crate::error::{PipelineError, Result};
use crate::models::RawChunk;
use tracing::{debug, warn};

pub struct ChunkReader {
    source: Box<dyn Source>,
    chunk_size: usize,
    sequence: u64,
    offset: u64,
    finished: bool,
}

impl ChunkReader {
    pub fn new(source: Box<dyn Source>, chunk_size: usize) -> Self {
        Self {
            source,
            chunk_size: chunk_size.max(1),
            sequence: 0,
            offset: 0,
            finished: false,
        }
    }

    /// Next chunk, or `None` exactly once at end of stream.
    ///
    /// Calling again after `None` yields [`PipelineError::ReadAfterEnd`].
    pub async fn next(&mut self) -> Result<Option<RawChunk>> {
        if self.finished {
            return Err(PipelineError::ReadAfterEnd);
        }

        loop {
            match self
                .source
                .read(self.chunk_size)
                .await
                .map_err(PipelineError::Source)?
            {
                None => {
                    self.finished = true;
                    debug!(
                        "End of stream from {} after {} chunks ({} bytes)",
                        self.source.describe(),
                        self.sequence,
                        self.offset
                    );
                    return Ok(None);
                }
                Some(bytes) if bytes.is_empty() => continue,
                Some(bytes) => {
                    let chunk = RawChunk::new(self.sequence, self.offset, bytes);
                    self.sequence += 1;
                    self.offset = chunk.end_offset();
                    return Ok(Some(chunk));
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn bytes_read(&self) -> u64 {
        self.offset
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }

    pub async fn close(&mut self) {
        if let Err(e) = self.source.close().await {
            warn!("Failed to close source {}: {}", self.source.describe(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_chunks_carry_positions() {
        let source = MemorySource::from_chunks(vec!["abc", "", "de"]);
        let mut reader = ChunkReader::new(Box::new(source), 16);

        let first = reader.next().await.unwrap().unwrap();
        assert_eq!((first.sequence, first.offset, first.len()), (0, 0, 3));

        let second = reader.next().await.unwrap().unwrap();
        assert_eq!((second.sequence, second.offset, second.len()), (1, 3, 2));

        assert!(reader.next().await.unwrap().is_none());
        assert!(reader.is_finished());
        assert_eq!(reader.bytes_read(), 5);
    }

    #[tokio::test]
    async fn test_read_after_end_is_an_error() {
        let mut reader = ChunkReader::new(Box::new(MemorySource::default()), 16);
        assert!(reader.next().await.unwrap().is_none());
        assert!(matches!(
            reader.next().await,
            Err(PipelineError::ReadAfterEnd)
        ));
    }

    #[tokio::test]
    async fn test_source_errors_propagate() {
        let source = MemorySource::from_chunks(vec!["a"]).fail_after_chunks("disk gone");
        let mut reader = ChunkReader::new(Box::new(source), 16);
        assert!(reader.next().await.unwrap().is_some());
        match reader.next().await {
            Err(PipelineError::Source(e)) => assert_eq!(e.to_string(), "disk gone"),
            other => panic!("expected source error, got {:?}", other),
        }
    }
}
