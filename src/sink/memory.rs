// file: src/sink/memory.rs
// description: in-memory upserting sink for dry runs and tests
// reference: fingerprint-keyed upsert semantics

use super::{CommitResult, Sink};
use crate::models::ValidatedEvidence;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct MemorySinkState {
    records: HashMap<String, ValidatedEvidence>,
    attempts: Vec<usize>,
    committed: Vec<usize>,
    scripted: VecDeque<CommitResult>,
}

/// Keeps evidence keyed by fingerprint.
///
/// Scripted results are consumed one per commit call before falling back to
/// success, which makes retry behaviour reproducible.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemorySinkState>,
    delay: Option<Duration>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every commit sleeps for `delay` before touching the store.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_scripted_results(self, results: impl IntoIterator<Item = CommitResult>) -> Self {
        self.lock().scripted.extend(results);
        self
    }

    /// Number of distinct fingerprints stored.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, fingerprint: &str) -> Option<ValidatedEvidence> {
        self.lock().records.get(fingerprint).cloned()
    }

    pub fn records(&self) -> Vec<ValidatedEvidence> {
        let mut records: Vec<_> = self.lock().records.values().cloned().collect();
        records.sort_by_key(ValidatedEvidence::line_number);
        records
    }

    /// Batch size of every commit call, including failed ones.
    pub fn attempt_sizes(&self) -> Vec<usize> {
        self.lock().attempts.clone()
    }

    /// Batch size of every successful commit.
    pub fn committed_sizes(&self) -> Vec<usize> {
        self.lock().committed.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn commit_batch(&self, records: &[ValidatedEvidence]) -> CommitResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.attempts.push(records.len());

        if let Some(result @ CommitResult::Failure { .. }) = state.scripted.pop_front() {
            return result;
        }

        for record in records {
            state
                .records
                .insert(record.fingerprint().to_string(), record.clone());
        }
        state.committed.push(records.len());
        CommitResult::Success
    }

    fn name(&self) -> &str {
        "memory"
    }
}
