//! Cumulative counters for a whole benchmark run
//!
//! The batch runner updates these after each batch barrier, so they never sit
//! on the hot path of concurrently running operations.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use super::OperationOutcome;

/// Counters accumulated over every batch of a run
#[derive(Debug, Default)]
pub struct BenchMetrics {
    pub operations: AtomicU64,
    pub successful_operations: AtomicU64,
    pub failed_operations: AtomicU64,
    pub bytes_transferred: AtomicU64,
    pub batches_completed: AtomicU64,
    pub trials_completed: AtomicU64,
}

impl BenchMetrics {
    /// Record one finished operation
    pub fn record_outcome(&self, outcome: &OperationOutcome) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.successful_operations.fetch_add(1, Ordering::Relaxed);
            self.bytes_transferred.fetch_add(outcome.bytes(), Ordering::Relaxed);
        } else {
            self.failed_operations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_batch_completed(&self) {
        self.batches_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trial_completed(&self) {
        self.trials_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: self.operations.load(Ordering::Relaxed),
            successful_operations: self.successful_operations.load(Ordering::Relaxed),
            failed_operations: self.failed_operations.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            trials_completed: self.trials_completed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of run metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub operations: u64,
    pub successful_operations: u64,
    pub failed_operations: u64,
    pub bytes_transferred: u64,
    pub batches_completed: u64,
    pub trials_completed: u64,
}

impl MetricsSnapshot {
    /// Success rate as a fraction (0.0 to 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.operations == 0 {
            0.0
        } else {
            self.successful_operations as f64 / self.operations as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::core::{BenchError, OperationSpec};
    use std::time::Duration;

    #[test]
    fn records_successes_and_failures() {
        let metrics = BenchMetrics::default();
        let spec = OperationSpec::read("file_0.txt");

        metrics.record_outcome(&OperationOutcome::succeeded(&spec, Duration::ZERO, 512, None));
        metrics.record_outcome(&OperationOutcome::failed(
            &spec,
            Duration::ZERO,
            BenchError::scheduling("test"),
        ));
        metrics.record_batch_completed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.operations, 2);
        assert_eq!(snapshot.successful_operations, 1);
        assert_eq!(snapshot.failed_operations, 1);
        assert_eq!(snapshot.bytes_transferred, 512);
        assert_eq!(snapshot.batches_completed, 1);
        assert!((snapshot.success_rate() - 0.5).abs() < f64::EPSILON);
    }
}
