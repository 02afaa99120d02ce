//! Batch execution and per-batch results

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info_span, Instrument};

use crate::bench::controller::{ConcurrencyController, ConcurrencyPolicy};
use crate::bench::core::{BenchError, BenchMetrics, OperationSpec, Result};

/// One failed operation, kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub target: String,
    pub category: &'static str,
    pub message: String,
}

/// Result of one batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub label: String,
    /// Wall-clock time around the whole batch
    #[serde(rename = "duration_secs", serialize_with = "serialize_secs")]
    pub duration: Duration,
    pub success_count: usize,
    pub failure_count: usize,
    /// Durations of successful operations, in completion order
    #[serde(rename = "success_durations_secs", serialize_with = "serialize_secs_vec")]
    pub success_durations: Vec<Duration>,
    /// Bytes moved by successful operations
    pub bytes: u64,
    pub failures: Vec<FailureSummary>,
}

impl BatchResult {
    /// Result of a batch with nothing in it
    pub fn empty<S: Into<String>>(label: S) -> Self {
        Self {
            label: label.into(),
            duration: Duration::ZERO,
            success_count: 0,
            failure_count: 0,
            success_durations: Vec::new(),
            bytes: 0,
            failures: Vec::new(),
        }
    }

    /// Number of operations submitted
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// Successful operations per second of wall-clock time
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.success_count as f64 / secs
        } else {
            0.0
        }
    }

    /// Mean duration of the successful operations
    pub fn mean_latency(&self) -> Option<Duration> {
        if self.success_durations.is_empty() {
            return None;
        }
        let total: Duration = self.success_durations.iter().sum();
        Some(total / self.success_durations.len() as u32)
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

fn serialize_secs_vec<S: Serializer>(durations: &[Duration], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(durations.iter().map(Duration::as_secs_f64))
}

/// Runs one batch at a time through a controller
pub struct BatchRunner {
    controller: ConcurrencyController,
    metrics: Arc<BenchMetrics>,
}

impl BatchRunner {
    pub fn new(controller: ConcurrencyController, metrics: Arc<BenchMetrics>) -> Self {
        Self { controller, metrics }
    }

    /// Execute `specs` as one batch and summarize the outcomes
    ///
    /// The clock runs around the single controller call, so the duration
    /// includes the completion barrier but not spec planning.
    pub async fn run_batch(
        &self,
        label: &str,
        specs: Vec<OperationSpec>,
        policy: ConcurrencyPolicy,
    ) -> Result<BatchResult> {
        if specs.is_empty() {
            debug!("Batch '{}' has no operations", label);
            return Ok(BatchResult::empty(label));
        }

        let submitted = specs.len();
        let span = info_span!("batch", label = %label, operations = submitted, policy = %policy);

        let start = Instant::now();
        let outcomes = self
            .controller
            .run_concurrently(specs, policy)
            .instrument(span)
            .await?;
        let duration = start.elapsed();

        let mut result = BatchResult::empty(label);
        result.duration = duration;

        for outcome in outcomes {
            self.metrics.record_outcome(&outcome);
            match outcome.error() {
                None => {
                    result.success_count += 1;
                    result.bytes += outcome.bytes();
                    result.success_durations.push(outcome.elapsed());
                }
                Some(error) => {
                    result.failure_count += 1;
                    let message = error.to_string();
                    debug!("Operation on {} failed: {}", outcome.target(), message);
                    result.failures.push(FailureSummary {
                        target: outcome.target().to_string(),
                        category: error.category(),
                        message,
                    });
                }
            }
        }

        if result.total() != submitted {
            return Err(BenchError::scheduling(format!(
                "batch '{}' accounted for {} of {} operations",
                label,
                result.total(),
                submitted
            )));
        }

        self.metrics.record_batch_completed();
        debug!(
            "Batch '{}' finished in {:.6}s ({}/{} successful)",
            label,
            duration.as_secs_f64(),
            result.success_count,
            submitted
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_has_no_rates() {
        let result = BatchResult::empty("read");
        assert_eq!(result.total(), 0);
        assert_eq!(result.throughput(), 0.0);
        assert!(result.mean_latency().is_none());
    }

    #[test]
    fn throughput_and_latency() {
        let mut result = BatchResult::empty("request");
        result.duration = Duration::from_secs(2);
        result.success_count = 4;
        result.success_durations = vec![
            Duration::from_millis(10),
            Duration::from_millis(20),
            Duration::from_millis(30),
            Duration::from_millis(40),
        ];

        assert!((result.throughput() - 2.0).abs() < 1e-9);
        assert_eq!(result.mean_latency(), Some(Duration::from_millis(25)));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let mut result = BatchResult::empty("write");
        result.duration = Duration::from_millis(1500);
        result.success_count = 1;
        result.success_durations = vec![Duration::from_millis(500)];

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration_secs"], 1.5);
        assert_eq!(json["success_durations_secs"][0], 0.5);
    }
}
