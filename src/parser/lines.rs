// file: src/parser/lines.rs
// description: reassembles delimited lines from arbitrarily split byte chunks
// reference: carry-over buffering across chunk boundaries

/// Incremental line splitter.
///
/// Only the bytes after the last delimiter seen are retained between chunks,
/// so the carry-over is at most one partial line.
#[derive(Debug)]
pub struct LineSplitter {
    delimiter: u8,
    strip_cr: bool,
    buffer: Vec<u8>,
    start: usize,
    scan: usize,
}

impl LineSplitter {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            strip_cr: delimiter == b'\n',
            buffer: Vec::new(),
            start: 0,
            scan: 0,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scan -= self.start;
            self.start = 0;
        }
        self.buffer.extend_from_slice(bytes);
    }

    /// Next complete line with its delimiter removed, if one is buffered.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let found = self.buffer[self.scan..]
            .iter()
            .position(|&b| b == self.delimiter);

        match found {
            Some(rel) => {
                let end = self.scan + rel;
                let line = self.trim_cr(&self.buffer[self.start..end]).to_vec();
                self.start = end + 1;
                self.scan = self.start;
                Some(line)
            }
            None => {
                self.scan = self.buffer.len();
                None
            }
        }
    }

    /// Residual bytes of an unterminated final line, consuming the buffer.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        let residual = self.trim_cr(&self.buffer[self.start..]).to_vec();
        self.buffer.clear();
        self.start = 0;
        self.scan = 0;

        if residual.is_empty() {
            None
        } else {
            Some(residual)
        }
    }

    /// Bytes currently held for a line that has not been terminated yet.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() - self.start
    }

    fn trim_cr<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        match line.split_last() {
            Some((b'\r', rest)) if self.strip_cr => rest,
            _ => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split_all(chunks: &[&str]) -> Vec<String> {
        let mut splitter = LineSplitter::new(b'\n');
        let mut lines = Vec::new();
        for chunk in chunks {
            splitter.push(chunk.as_bytes());
            while let Some(line) = splitter.next_line() {
                lines.push(String::from_utf8(line).unwrap());
            }
        }
        if let Some(rest) = splitter.finish() {
            lines.push(String::from_utf8(rest).unwrap());
        }
        lines
    }

    #[test]
    fn test_single_chunk() {
        assert_eq!(split_all(&["a,b\nc,d\n"]), vec!["a,b", "c,d"]);
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        assert_eq!(split_all(&["a,b", "\nc,", "d\r", "\n"]), vec!["a,b", "c,d"]);
    }

    #[test]
    fn test_unterminated_final_line() {
        assert_eq!(split_all(&["a\nb"]), vec!["a", "b"]);
    }

    #[test]
    fn test_every_split_point_matches_single_chunk() {
        let input = "h1,h2\r\nx,y\n\nlong line here,z\nlast";
        let expected = split_all(&[input]);
        for cut in 0..=input.len() {
            let (left, right) = input.split_at(cut);
            assert_eq!(split_all(&[left, right]), expected, "cut at {}", cut);
        }
        let bytes: Vec<&str> = (0..input.len()).map(|i| &input[i..i + 1]).collect();
        assert_eq!(split_all(&bytes), expected);
    }

    #[test]
    fn test_carry_over_is_one_partial_line() {
        let mut splitter = LineSplitter::new(b'\n');
        splitter.push(b"first\nsecond\nthi");
        while splitter.next_line().is_some() {}
        assert_eq!(splitter.pending_len(), 3);
    }

    #[test]
    fn test_custom_delimiter_keeps_carriage_returns() {
        let mut splitter = LineSplitter::new(b';');
        splitter.push(b"a\r;b");
        assert_eq!(splitter.next_line(), Some(b"a\r".to_vec()));
        assert_eq!(splitter.finish(), Some(b"b".to_vec()));
    }
}
