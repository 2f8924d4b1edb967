// file: src/error.rs
// description: Custom error types, error tiers and run failure reporting
// reference: https://docs.rs/thiserror

use crate::pipeline::RunSummary;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Which layer of the pipeline an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorTier {
    /// Malformed field, timestamp or payload. Never aborts a run.
    Record,
    /// A sink commit that could not be completed.
    Batch,
    /// Source I/O or header failure.
    Stream,
}

impl fmt::Display for ErrorTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTier::Record => write!(f, "record"),
            ErrorTier::Batch => write!(f, "batch"),
            ErrorTier::Stream => write!(f, "stream"),
        }
    }
}

/// A record that was part of a failed batch and never reached the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LostRecord {
    pub line_number: u64,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub batch_sequence: u64,
    pub attempts: u32,
    pub retryable: bool,
    pub message: String,
    pub lost: Vec<LostRecord>,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source read failed: {0}")]
    Source(#[source] std::io::Error),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Chunk reader polled after end of stream")]
    ReadAfterEnd,

    #[error(
        "Batch {} failed after {} attempt(s): {} ({} record(s) not committed)",
        .0.batch_sequence,
        .0.attempts,
        .0.message,
        .0.lost.len()
    )]
    BatchCommit(Box<BatchFailure>),

    #[error("Pipeline run cancelled")]
    Cancelled,

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PipelineError {
    pub fn tier(&self) -> ErrorTier {
        match self {
            PipelineError::BatchCommit(_) | PipelineError::Database(_) => ErrorTier::Batch,
            _ => ErrorTier::Stream,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }

    /// Records from the in-flight batch that were never committed.
    pub fn lost_records(&self) -> &[LostRecord] {
        match self {
            PipelineError::BatchCommit(failure) => &failure.lost,
            _ => &[],
        }
    }
}

/// Fatal outcome of a pipeline run, with counters as they stood at the abort.
#[derive(Error, Debug)]
#[error("{tier}-level failure: {error}")]
pub struct RunFailure {
    #[source]
    pub error: PipelineError,
    pub tier: ErrorTier,
    pub partial: RunSummary,
}

impl RunFailure {
    pub fn new(error: PipelineError, partial: RunSummary) -> Self {
        let tier = error.tier();
        Self {
            error,
            tier,
            partial,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.is_cancelled()
    }
}
