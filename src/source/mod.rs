// file: src/source/mod.rs
// description: byte sources feeding the pipeline and the chunk reader over them
// reference: sequential byte-producing collaborators

mod memory;
mod reader;

pub use memory::MemorySource;
pub use reader::ChunkReader;

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Sequential producer of raw bytes.
#[async_trait]
pub trait Source: Send {
    /// Read at most `max_bytes`. `Ok(None)` marks the end of the stream.
    async fn read(&mut self, max_bytes: usize) -> io::Result<Option<Vec<u8>>>;

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}

/// Adapts any tokio reader (file, stdin, socket) into a [`Source`].
pub struct AsyncReadSource<R> {
    reader: R,
    label: String,
}

impl<R> AsyncReadSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
        }
    }
}

impl AsyncReadSource<tokio::fs::File> {
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file, path.display().to_string()))
    }
}

impl AsyncReadSource<tokio::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin(), "<stdin>")
    }
}

#[async_trait]
impl<R> Source for AsyncReadSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, max_bytes: usize) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; max_bytes];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_file_source_reads_bounded_chunks() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut source = AsyncReadSource::open(file.path()).await.unwrap();
        let mut collected = Vec::new();
        while let Some(bytes) = source.read(4).await.unwrap() {
            assert!(bytes.len() <= 4);
            collected.extend(bytes);
        }
        assert_eq!(collected, b"0123456789".to_vec());
        assert_eq!(source.describe(), file.path().display().to_string());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = AsyncReadSource::open(Path::new("/nonexistent/evidence.csv")).await;
        assert!(result.is_err());
    }
}
