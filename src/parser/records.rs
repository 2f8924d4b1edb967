// file: src/parser/records.rs
// description: lazy header-aware record parser over a chunk reader
// reference: turns raw chunks into typed-by-header raw records

use crate::error::{PipelineError, Result};
use crate::models::{Header, RawRecord};
use crate::parser::LineSplitter;
use crate::source::ChunkReader;
use futures::Stream;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RecordParser {
    reader: ChunkReader,
    splitter: LineSplitter,
    field_delimiter: char,
    header: Option<Arc<Header>>,
    lines_seen: u64,
    exhausted: bool,
}

impl RecordParser {
    pub fn new(reader: ChunkReader, line_delimiter: u8, field_delimiter: char) -> Self {
        Self {
            reader,
            splitter: LineSplitter::new(line_delimiter),
            field_delimiter,
            header: None,
            lines_seen: 0,
            exhausted: false,
        }
    }

    /// Next record, pulling chunks from the reader only when no complete
    /// line is buffered. Blank lines are skipped.
    pub async fn next_record(&mut self) -> Result<Option<RawRecord>> {
        loop {
            let line = match self.splitter.next_line() {
                Some(line) => line,
                None if self.exhausted => return self.end_of_stream(),
                None => match self.reader.next().await? {
                    Some(chunk) => {
                        self.splitter.push(&chunk.bytes);
                        continue;
                    }
                    None => {
                        self.exhausted = true;
                        match self.splitter.finish() {
                            Some(residual) => residual,
                            None => return self.end_of_stream(),
                        }
                    }
                },
            };

            self.lines_seen += 1;
            let text = String::from_utf8_lossy(&line);
            if text.trim().is_empty() {
                continue;
            }

            match &self.header {
                Some(header) => {
                    return Ok(Some(RawRecord::from_line(
                        Arc::clone(header),
                        &text,
                        self.field_delimiter,
                        self.lines_seen,
                    )));
                }
                None => {
                    let header = Header::parse(&text, self.field_delimiter)?;
                    info!(
                        "Parsed header with {} fields from {}: {}",
                        header.len(),
                        self.reader.describe(),
                        header.names().join(", ")
                    );
                    self.header = Some(Arc::new(header));
                }
            }
        }
    }

    fn end_of_stream(&self) -> Result<Option<RawRecord>> {
        if self.header.is_none() {
            return Err(PipelineError::MalformedHeader(
                "input ended before a header line was found".to_string(),
            ));
        }
        debug!(
            "Parser reached end of stream after {} lines",
            self.lines_seen
        );
        Ok(None)
    }

    pub fn header(&self) -> Option<&Arc<Header>> {
        self.header.as_ref()
    }

    pub fn bytes_read(&self) -> u64 {
        self.reader.bytes_read()
    }

    pub fn describe(&self) -> String {
        self.reader.describe()
    }

    pub async fn close(&mut self) {
        self.reader.close().await;
    }

    /// Consume the parser as a stream of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<RawRecord>> {
        futures::stream::try_unfold(self, |mut parser| async move {
            let next = parser.next_record().await?;
            Ok::<_, PipelineError>(next.map(|record| (record, parser)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;

    const INPUT: &str = "controlId,resourceId,collectedAt,data\n\
                         c1,r1,2024-01-01T00:00:00Z,{\"k\":1}\n\
                         \n\
                         c2,,bad-date,{}\n\
                         c3,r3";

    fn parser(source: MemorySource) -> RecordParser {
        RecordParser::new(ChunkReader::new(Box::new(source), 1024), b'\n', ',')
    }

    async fn collect(source: MemorySource) -> Result<Vec<Vec<(String, String)>>> {
        let records: Vec<RawRecord> = parser(source).into_stream().try_collect().await?;
        Ok(records
            .iter()
            .map(|r| {
                r.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect())
    }

    #[tokio::test]
    async fn test_parses_records_against_header() {
        let mut parser = parser(MemorySource::from_chunks(vec![INPUT]));

        let first = parser.next_record().await.unwrap().unwrap();
        assert_eq!(first.get("controlId"), Some("c1"));
        assert_eq!(first.get("data"), Some("{\"k\":1}"));
        assert_eq!(first.line_number(), 2);

        let second = parser.next_record().await.unwrap().unwrap();
        assert_eq!(second.get("resourceId"), Some(""));
        assert_eq!(second.line_number(), 4);

        let third = parser.next_record().await.unwrap().unwrap();
        assert_eq!(third.get("resourceId"), Some("r3"));
        assert_eq!(third.get("collectedAt"), Some(""));

        assert!(parser.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_records_independent_of_chunk_boundaries() {
        let expected = collect(MemorySource::from_chunks(vec![INPUT])).await.unwrap();
        assert_eq!(expected.len(), 3);

        for size in 1..INPUT.len() {
            let actual = collect(MemorySource::split_every(INPUT, size)).await.unwrap();
            assert_eq!(actual, expected, "chunk size {}", size);
        }
    }

    #[tokio::test]
    async fn test_leading_blank_lines_before_header() {
        let source = MemorySource::from_chunks(vec!["\n\r\na,b\n1,2\n"]);
        let records = collect(source).await.unwrap();
        assert_eq!(
            records,
            vec![vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]]
        );
    }

    #[tokio::test]
    async fn test_header_only_is_empty_run() {
        let records = collect(MemorySource::from_chunks(vec!["a,b,c"])).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_header_is_fatal() {
        let result = collect(MemorySource::from_chunks(vec!["a,,c\n1,2,3\n"])).await;
        assert!(matches!(result, Err(PipelineError::MalformedHeader(_))));
    }

    #[tokio::test]
    async fn test_empty_input_has_no_header() {
        let result = collect(MemorySource::default()).await;
        assert!(matches!(result, Err(PipelineError::MalformedHeader(_))));
    }

    #[tokio::test]
    async fn test_custom_delimiters() {
        let source = MemorySource::from_chunks(vec!["x;y|1;2|3;4"]);
        let parser = RecordParser::new(ChunkReader::new(Box::new(source), 2), b'|', ';');
        let records: Vec<RawRecord> = parser.into_stream().try_collect().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("y"), Some("4"));
    }

    #[tokio::test]
    async fn test_multibyte_and_invalid_utf8_across_boundaries() {
        let mut input = "\u{feff}controlId,resourceId\né漢,r\nc".as_bytes().to_vec();
        input.extend_from_slice(b"\xff,r\n");

        for size in 1..input.len() {
            let mut parser = parser(MemorySource::split_every(&input, size));

            let first = parser.next_record().await.unwrap().unwrap();
            assert_eq!(first.get("controlId"), Some("é漢"), "chunk size {}", size);

            let second = parser.next_record().await.unwrap().unwrap();
            assert_eq!(second.get("controlId"), Some("c\u{FFFD}"), "chunk size {}", size);
            assert_eq!(second.get("resourceId"), Some("r"));

            assert!(parser.next_record().await.unwrap().is_none());
        }
    }
}
