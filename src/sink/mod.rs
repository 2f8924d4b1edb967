// file: src/sink/mod.rs
// description: batched-insert sink contract and the batch writer driving it
// reference: terminal stage of the ingestion pipeline

mod counting;
mod memory;
mod writer;

pub use counting::CountingSink;
pub use memory::MemorySink;
pub use writer::{BatchWriter, RetryPolicy};

use crate::models::ValidatedEvidence;
use async_trait::async_trait;

/// Outcome of one batched insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    Success,
    Failure { retryable: bool, message: String },
}

impl CommitResult {
    pub fn retryable(message: impl Into<String>) -> Self {
        CommitResult::Failure {
            retryable: true,
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        CommitResult::Failure {
            retryable: false,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommitResult::Success)
    }
}

/// Persistent store for evidence.
///
/// Implementations must upsert on [`ValidatedEvidence::fingerprint`]: the
/// writer re-sends a whole batch after a retryable failure, and separate runs
/// may deliver the same records again.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn commit_batch(&self, records: &[ValidatedEvidence]) -> CommitResult;

    fn name(&self) -> &str;
}
