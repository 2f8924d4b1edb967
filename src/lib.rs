// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns

//! Streaming ingestion of delimited compliance evidence.
//!
//! Bytes flow from a [`source::Source`] through line reassembly, record
//! parsing, validation and progress tracking into fixed-size batches that a
//! [`sink::Sink`] commits with bounded retry. Every stage runs on one
//! cooperative task per input, so a slow sink throttles reading.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod utils;
pub mod validator;

pub use config::{Config, DatabaseConfig, PipelineConfig};
pub use database::{LanceDbClient, LanceDbSink, SchemaManager};
pub use error::{ErrorTier, PipelineError, Result, RunFailure};
pub use models::{Header, RawChunk, RawRecord, ValidatedEvidence};
pub use parser::{LineSplitter, RecordParser};
pub use pipeline::{
    Pipeline, PipelineStats, ProgressBarObserver, ProgressEvent, ProgressObserver,
    ProgressTracker, RunSummary, TracingObserver,
};
pub use sink::{BatchWriter, CommitResult, CountingSink, MemorySink, RetryPolicy, Sink};
pub use source::{AsyncReadSource, ChunkReader, MemorySource, Source};
pub use utils::OperationTimer;
pub use validator::{EvidenceValidator, RecordIssue, compute_fingerprint};
