// file: src/pipeline/progress.rs
// description: run counters, pass-through progress tracking and progress observers
// reference: uses indicatif for progress display and tracing for progress logs

use crate::models::ValidatedEvidence;
use crate::utils::telemetry::throughput;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Cumulative counters for one run, owned by the batch writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub records_seen: u64,
    pub committed_valid: u64,
    pub committed_invalid: u64,
    pub batches_committed: u64,
    pub retries: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_committed(&self) -> u64 {
        self.committed_valid + self.committed_invalid
    }

    pub fn summary(&self, duration: Duration) -> RunSummary {
        RunSummary {
            total_processed: self.records_seen,
            total_committed: self.committed_valid,
            total_invalid: self.committed_invalid,
            batches_committed: self.batches_committed,
            retries: self.retries,
            duration,
        }
    }
}

/// Terminal report of a run. `total_committed` counts valid records and
/// `total_invalid` counts invalid records that were committed for audit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_processed: u64,
    pub total_committed: u64,
    pub total_invalid: u64,
    pub batches_committed: u64,
    pub retries: u64,
    pub duration: Duration,
}

impl RunSummary {
    /// Records accepted by the writer but never committed.
    pub fn uncommitted(&self) -> u64 {
        self.total_processed
            .saturating_sub(self.total_committed + self.total_invalid)
    }

    pub fn records_per_second(&self) -> f64 {
        throughput(self.total_processed, self.duration)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub records_processed: u64,
    pub elapsed_millis: u64,
    pub records_per_second: f64,
}

/// Subscriber to pipeline progress.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    fn on_complete(&self, _summary: &RunSummary) {}
}

/// One-in-one-out stage that counts records and notifies observers every
/// `interval` records.
pub struct ProgressTracker {
    interval: u64,
    records_processed: u64,
    start_time: Instant,
    observers: Vec<Arc<dyn ProgressObserver>>,
}

impl ProgressTracker {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            records_processed: 0,
            start_time: Instant::now(),
            observers: Vec::new(),
        }
    }

    pub fn register(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observers.push(observer);
    }

    pub fn track(&mut self, evidence: ValidatedEvidence) -> ValidatedEvidence {
        self.records_processed += 1;
        if self.records_processed % self.interval == 0 && !self.observers.is_empty() {
            let event = self.event();
            for observer in &self.observers {
                observer.on_progress(&event);
            }
        }
        evidence
    }

    pub fn complete(&self, summary: &RunSummary) {
        for observer in &self.observers {
            observer.on_complete(summary);
        }
    }

    pub fn records_processed(&self) -> u64 {
        self.records_processed
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn event(&self) -> ProgressEvent {
        let elapsed = self.start_time.elapsed();
        ProgressEvent {
            records_processed: self.records_processed,
            elapsed_millis: elapsed.as_millis() as u64,
            records_per_second: throughput(self.records_processed, elapsed),
        }
    }
}

/// Logs progress through `tracing`.
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        info!(
            "[{}] {} records in {}ms ({:.1} records/sec)",
            self.label, event.records_processed, event.elapsed_millis, event.records_per_second
        );
    }

    fn on_complete(&self, summary: &RunSummary) {
        info!(
            "[{}] processed {} records: {} committed, {} invalid, {} batches, {} retries in {:.2}s",
            self.label,
            summary.total_processed,
            summary.total_committed,
            summary.total_invalid,
            summary.batches_committed,
            summary.retries,
            summary.duration.as_secs_f64()
        );
    }
}

/// Terminal spinner for interactive runs.
pub struct ProgressBarObserver {
    bar: ProgressBar,
    colored: bool,
}

impl ProgressBarObserver {
    pub fn new(label: &str, colored: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template(spinner_template(colored)) {
            bar.set_style(style);
        }
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar, colored }
    }
}

fn spinner_template(colored: bool) -> &'static str {
    if colored {
        "{spinner:.green} [{elapsed_precise}] {prefix:.cyan} {msg}"
    } else {
        "{spinner} [{elapsed_precise}] {prefix} {msg}"
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_message(format!(
            "{} records ({:.0}/s)",
            event.records_processed, event.records_per_second
        ));
    }

    fn on_complete(&self, summary: &RunSummary) {
        let message = format!(
            "{} records | committed: {} | invalid: {}",
            summary.total_processed, summary.total_committed, summary.total_invalid
        );
        if self.colored {
            self.bar.finish_with_message(message.green().to_string());
        } else {
            self.bar.finish_with_message(message);
        }
    }
}

impl Drop for ProgressBarObserver {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Header, RawRecord};
    use crate::validator::EvidenceValidator;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<u64>>,
        summaries: Mutex<Vec<RunSummary>>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, event: &ProgressEvent) {
            self.events.lock().unwrap().push(event.records_processed);
        }

        fn on_complete(&self, summary: &RunSummary) {
            self.summaries.lock().unwrap().push(summary.clone());
        }
    }

    fn evidence(n: u64) -> ValidatedEvidence {
        let header = Arc::new(Header::parse("controlId,resourceId,collectedAt", ',').unwrap());
        let line = format!("c{},r,2024-01-01T00:00:00Z", n);
        EvidenceValidator::new().validate(&RawRecord::from_line(header, &line, ',', n))
    }

    #[test]
    fn test_tracker_passes_records_through_unchanged() {
        let mut tracker = ProgressTracker::new(1000);
        let input = evidence(1);
        let output = tracker.track(input.clone());
        assert_eq!(output, input);
        assert_eq!(tracker.records_processed(), 1);
    }

    #[test]
    fn test_tracker_emits_every_interval() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(3);
        tracker.register(recorder.clone());

        for n in 0..10 {
            tracker.track(evidence(n));
        }

        assert_eq!(*recorder.events.lock().unwrap(), vec![3, 6, 9]);
    }

    #[test]
    fn test_complete_reaches_observers() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(10);
        tracker.register(recorder.clone());

        let stats = PipelineStats {
            records_seen: 4,
            committed_valid: 3,
            committed_invalid: 1,
            batches_committed: 2,
            retries: 0,
        };
        tracker.complete(&stats.summary(Duration::from_secs(2)));

        let summaries = recorder.summaries.lock().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_committed, 3);
        assert_eq!(summaries[0].total_invalid, 1);
        assert_eq!(summaries[0].records_per_second(), 2.0);
        assert_eq!(summaries[0].uncommitted(), 0);
    }

    #[test]
    fn test_stats_zero_duration() {
        let summary = PipelineStats::new().summary(Duration::ZERO);
        assert_eq!(summary.records_per_second(), 0.0);
    }

    #[test]
    fn test_plain_spinner_has_no_styles() {
        assert!(!spinner_template(false).contains(":."));
        assert!(spinner_template(true).contains("{prefix:.cyan}"));

        let observer = ProgressBarObserver::new("plain", false);
        assert!(!observer.colored);
    }
}
