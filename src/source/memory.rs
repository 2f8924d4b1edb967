// file: src/source/memory.rs
// description: in-memory source with caller-controlled chunk boundaries
// reference: test fixtures and dry runs

use super::Source;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;

/// Replays predefined chunks, optionally failing once they run out.
#[derive(Debug, Default)]
pub struct MemorySource {
    chunks: VecDeque<Vec<u8>>,
    failure: Option<String>,
    closed: bool,
}

impl MemorySource {
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            failure: None,
            closed: false,
        }
    }

    /// Splits `data` into pieces of `size` bytes; boundaries may fall anywhere.
    pub fn split_every(data: impl AsRef<[u8]>, size: usize) -> Self {
        let size = size.max(1);
        Self::from_chunks(data.as_ref().chunks(size).map(<[u8]>::to_vec))
    }

    /// After the chunks are drained, the next read fails with `message`.
    pub fn fail_after_chunks(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl Source for MemorySource {
    async fn read(&mut self, max_bytes: usize) -> io::Result<Option<Vec<u8>>> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return match self.failure.take() {
                Some(message) => Err(io::Error::other(message)),
                None => Ok(None),
            };
        };

        if chunk.len() > max_bytes {
            let rest = chunk.split_off(max_bytes);
            self.chunks.push_front(rest);
        }
        Ok(Some(chunk))
    }

    async fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_oversized_chunks_respect_max_bytes() {
        let mut source = MemorySource::from_chunks(vec![b"abcdef".to_vec()]);
        assert_eq!(source.read(4).await.unwrap(), Some(b"abcd".to_vec()));
        assert_eq!(source.read(4).await.unwrap(), Some(b"ef".to_vec()));
        assert_eq!(source.read(4).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_after_chunks() {
        let mut source = MemorySource::split_every("ab", 1).fail_after_chunks("connection reset");
        assert!(source.read(8).await.unwrap().is_some());
        assert!(source.read(8).await.unwrap().is_some());
        let err = source.read(8).await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }
}
