// file: src/utils/telemetry.rs
// description: timing of whole cli operations
// reference: throughput logged at completion

use std::time::{Duration, Instant};
use tracing::info;

/// Operation timer for performance tracking
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting operation: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Finish and log `count` items together with the rate.
    pub fn finish_with_count(self, count: u64) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed operation: {} - {} records in {:.2}s ({:.2} records/sec)",
            self.operation,
            count,
            elapsed.as_secs_f64(),
            throughput(count, elapsed)
        );
        elapsed
    }
}

/// Items per second, 0 when no time has elapsed.
pub fn throughput(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { 0.0 }
}
