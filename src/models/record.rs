// file: src/models/record.rs
// description: header vocabulary and raw delimited records
// reference: internal data structures

use crate::error::{PipelineError, Result};
use std::sync::Arc;

/// Ordered, unique field names taken from the first line of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(PipelineError::MalformedHeader(
                "header declares no fields".to_string(),
            ));
        }

        for (idx, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(PipelineError::MalformedHeader(format!(
                    "field {} has an empty name",
                    idx + 1
                )));
            }
            if names[..idx].contains(name) {
                return Err(PipelineError::MalformedHeader(format!(
                    "duplicate field name '{}'",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    /// A leading UTF-8 byte order mark is dropped before splitting.
    pub fn parse(line: &str, field_delimiter: char) -> Result<Self> {
        let line = line.strip_prefix('\u{feff}').unwrap_or(line);
        let names = line
            .split(field_delimiter)
            .map(|name| name.trim().to_string())
            .collect();
        Self::new(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// One complete line, mapped onto the header's field names.
///
/// Every header field has a value; fields missing from a short line are
/// empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    header: Arc<Header>,
    values: Vec<String>,
    line_number: u64,
}

impl RawRecord {
    /// Split `line` against `header`. Surplus tokens are folded back into the
    /// last field together with their separators.
    pub fn from_line(
        header: Arc<Header>,
        line: &str,
        field_delimiter: char,
        line_number: u64,
    ) -> Self {
        let width = header.len();
        let mut values: Vec<String> = line
            .splitn(width, field_delimiter)
            .map(str::to_string)
            .collect();
        values.resize(width, String::new());

        Self {
            header,
            values,
            line_number,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.header
            .position(name)
            .map(|idx| self.values[idx].as_str())
    }

    /// Field value, or the empty string when the header does not declare it.
    pub fn field(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.header
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn header(&self) -> &Arc<Header> {
        &self.header
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }
}
