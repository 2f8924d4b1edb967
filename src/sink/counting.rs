// file: src/sink/counting.rs
// description: dry-run sink that accepts every batch and keeps only counters
// reference: validate and batch without a store

use super::{CommitResult, Sink};
use crate::models::ValidatedEvidence;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Accepts every commit and tallies it. No evidence is retained, so memory
/// stays flat however much input passes through.
#[derive(Debug, Default)]
pub struct CountingSink {
    batches: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn valid(&self) -> u64 {
        self.valid.load(Ordering::Relaxed)
    }

    pub fn invalid(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.valid() + self.invalid()
    }
}

#[async_trait]
impl Sink for CountingSink {
    async fn commit_batch(&self, records: &[ValidatedEvidence]) -> CommitResult {
        let invalid = records.iter().filter(|e| !e.is_valid()).count() as u64;
        self.invalid.fetch_add(invalid, Ordering::Relaxed);
        self.valid
            .fetch_add(records.len() as u64 - invalid, Ordering::Relaxed);
        self.batches.fetch_add(1, Ordering::Relaxed);
        CommitResult::Success
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
