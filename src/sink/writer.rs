// file: src/sink/writer.rs
// description: accumulates evidence into fixed-size batches and commits them with retry
// reference: batch commit state machine with exponential backoff

use super::{CommitResult, Sink};
use crate::config::PipelineConfig;
use crate::error::{BatchFailure, LostRecord, PipelineError, Result};
use crate::models::ValidatedEvidence;
use crate::pipeline::PipelineStats;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Exponential backoff for retryable commit failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retry_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl From<&PipelineConfig> for RetryPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_retry_attempts: config.max_retry_attempts,
            base_delay: config.base_retry_delay(),
        }
    }
}

/// Per-batch commit phases. The writer itself sits in `Accumulating` between
/// commits; these are the states a full batch moves through.
#[derive(Debug)]
enum CommitPhase {
    Committing { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Committed { attempts: u32 },
    Failed { attempts: u32, retryable: bool, message: String },
}

pub struct BatchWriter {
    sink: Arc<dyn Sink>,
    batch_size: usize,
    retry: RetryPolicy,
    commit_timeout: Option<Duration>,
    cancel: CancellationToken,
    batch: Vec<ValidatedEvidence>,
    batch_sequence: u64,
    stats: PipelineStats,
}

impl BatchWriter {
    pub fn new(
        sink: Arc<dyn Sink>,
        batch_size: usize,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch_size,
            retry,
            commit_timeout: None,
            cancel,
            batch: Vec::with_capacity(batch_size),
            batch_sequence: 0,
            stats: PipelineStats::new(),
        }
    }

    pub fn from_config(
        sink: Arc<dyn Sink>,
        config: &PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(sink, config.batch_size, RetryPolicy::from(config), cancel)
            .with_commit_timeout(config.commit_timeout())
    }

    /// A commit that runs past `timeout` counts as a retryable failure.
    pub fn with_commit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.commit_timeout = timeout;
        self
    }

    /// Accept one unit; commits when the batch reaches capacity.
    ///
    /// Does not return until that commit has finished, which is what holds
    /// the upstream stages back while the sink is slow.
    pub async fn push(&mut self, evidence: ValidatedEvidence) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        self.stats.records_seen += 1;
        self.batch.push(evidence);

        if self.batch.len() >= self.batch_size {
            self.commit_current().await?;
        }
        Ok(())
    }

    /// Commit the trailing partial batch, if any.
    pub async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        debug!("Flushing final batch of {} records", self.batch.len());
        self.commit_current().await
    }

    /// Drop the in-flight batch without committing it.
    pub fn abandon(&mut self) -> usize {
        let dropped = self.batch.len();
        if dropped > 0 {
            warn!(
                "Abandoning batch {} with {} uncommitted records",
                self.batch_sequence + 1,
                dropped
            );
        }
        self.batch.clear();
        dropped
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    async fn commit_current(&mut self) -> Result<()> {
        self.batch_sequence += 1;
        let mut phase = CommitPhase::Committing { attempt: 1 };

        loop {
            phase = match phase {
                CommitPhase::Committing { attempt } => match self.attempt_commit().await? {
                    CommitResult::Success => CommitPhase::Committed { attempts: attempt },
                    CommitResult::Failure {
                        retryable: true,
                        message,
                    } if attempt <= self.retry.max_retry_attempts => {
                        let delay = self.retry.delay_for(attempt);
                        warn!(
                            "Batch {} attempt {} failed ({}), retrying in {:?}",
                            self.batch_sequence, attempt, message, delay
                        );
                        CommitPhase::Retrying { attempt, delay }
                    }
                    CommitResult::Failure { retryable, message } => CommitPhase::Failed {
                        attempts: attempt,
                        retryable,
                        message,
                    },
                },
                CommitPhase::Retrying { attempt, delay } => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    self.stats.retries += 1;
                    CommitPhase::Committing {
                        attempt: attempt + 1,
                    }
                }
                CommitPhase::Committed { attempts } => {
                    self.record_commit(attempts);
                    return Ok(());
                }
                CommitPhase::Failed {
                    attempts,
                    retryable,
                    message,
                } => return Err(self.record_failure(attempts, retryable, message)),
            };
        }
    }

    async fn attempt_commit(&self) -> Result<CommitResult> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let commit = self.sink.commit_batch(&self.batch);
        let outcome = match self.commit_timeout {
            Some(limit) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                    result = tokio::time::timeout(limit, commit) => result.unwrap_or_else(|_| {
                        CommitResult::retryable(format!("commit timed out after {:?}", limit))
                    }),
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                    result = commit => result,
                }
            }
        };
        Ok(outcome)
    }

    fn record_commit(&mut self, attempts: u32) {
        let invalid = self.batch.iter().filter(|e| !e.is_valid()).count() as u64;
        let valid = self.batch.len() as u64 - invalid;

        self.stats.committed_valid += valid;
        self.stats.committed_invalid += invalid;
        self.stats.batches_committed += 1;

        debug!(
            "Committed batch {} to {} ({} valid, {} invalid, {} attempt(s))",
            self.batch_sequence,
            self.sink.name(),
            valid,
            invalid,
            attempts
        );
        self.batch.clear();
    }

    fn record_failure(&mut self, attempts: u32, retryable: bool, message: String) -> PipelineError {
        let lost: Vec<LostRecord> = self
            .batch
            .drain(..)
            .map(|e| LostRecord {
                line_number: e.line_number(),
                fingerprint: e.fingerprint().to_string(),
            })
            .collect();

        error!(
            "Batch {} failed permanently after {} attempt(s): {} ({} records not committed)",
            self.batch_sequence,
            attempts,
            message,
            lost.len()
        );
        if retryable {
            info!("Retry budget of {} exhausted", self.retry.max_retry_attempts);
        }

        PipelineError::BatchCommit(Box::new(BatchFailure {
            batch_sequence: self.batch_sequence,
            attempts,
            retryable,
            message,
            lost,
        }))
    }
}
