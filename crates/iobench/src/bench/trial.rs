//! Repeated trials and their summary statistics

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bench::batch::BatchResult;
use crate::bench::config::BenchConfig;
use crate::bench::core::{BenchError, BenchEvent, BenchMetrics, ReportCallback, Result};

/// Which number each trial contributes to the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialMetric {
    /// Wall-clock seconds of the whole trial
    #[default]
    BatchDuration,
    /// Successful operations per second over the trial
    Throughput,
    /// Mean seconds per successful operation over the trial
    ///
    /// A trial without a single success records `0.0`, which reads as the
    /// best latency in the series; the harness warns when that happens.
    MeanLatency,
}

impl TrialMetric {
    pub fn unit(&self) -> &'static str {
        match self {
            TrialMetric::BatchDuration | TrialMetric::MeanLatency => "seconds",
            TrialMetric::Throughput => "operations/second",
        }
    }

    /// Whether `measure` has nothing real to report for these batches
    pub fn is_vacuous(&self, batches: &[BatchResult]) -> bool {
        *self == TrialMetric::MeanLatency && batches.iter().all(|b| b.success_count == 0)
    }

    /// Reduce the batches of one trial to this metric
    pub fn measure(&self, elapsed: Duration, batches: &[BatchResult]) -> f64 {
        let successes: usize = batches.iter().map(|b| b.success_count).sum();
        match self {
            TrialMetric::BatchDuration => elapsed.as_secs_f64(),
            TrialMetric::Throughput => {
                let secs = elapsed.as_secs_f64();
                if secs > 0.0 { successes as f64 / secs } else { 0.0 }
            }
            TrialMetric::MeanLatency => {
                if successes == 0 {
                    return 0.0;
                }
                let total: Duration = batches.iter().flat_map(|b| b.success_durations.iter()).sum();
                total.as_secs_f64() / successes as f64
            }
        }
    }
}

impl fmt::Display for TrialMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialMetric::BatchDuration => f.write_str("duration"),
            TrialMetric::Throughput => f.write_str("throughput"),
            TrialMetric::MeanLatency => f.write_str("latency"),
        }
    }
}

impl FromStr for TrialMetric {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duration" => Ok(TrialMetric::BatchDuration),
            "throughput" => Ok(TrialMetric::Throughput),
            "latency" => Ok(TrialMetric::MeanLatency),
            other => Err(BenchError::config(
                "metric",
                format!("unknown metric '{}' (expected duration, throughput or latency)", other),
            )),
        }
    }
}

/// Per-trial measurements in the order the trials ran
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSeries {
    values: Vec<f64>,
    expected: usize,
}

impl TrialSeries {
    pub fn new(expected: usize) -> Self {
        Self {
            values: Vec::with_capacity(expected),
            expected,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether every expected trial has been recorded
    pub fn is_complete(&self) -> bool {
        self.expected > 0 && self.values.len() == self.expected
    }

    /// Summary statistics; refuses partial series
    pub fn compute_statistics(&self) -> Result<Statistics> {
        if !self.is_complete() {
            return Err(BenchError::IncompleteSeries {
                recorded: self.values.len(),
                expected: self.expected,
            });
        }

        Statistics::from_samples(&self.values).ok_or(BenchError::IncompleteSeries {
            recorded: 0,
            expected: self.expected,
        })
    }
}

/// Summary of a trial series
///
/// `std_dev` is the population standard deviation (divides by N): it
/// describes the spread of the runs that were observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
    pub sum: f64,
}

impl Statistics {
    /// `None` for an empty slice
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len();
        let sum: f64 = samples.iter().sum();
        let mean = sum / count as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
            sum,
        })
    }
}

/// Runs trials strictly one after another
pub struct TrialAggregator {
    pacing: Duration,
    reporter: Option<ReportCallback>,
    metrics: Option<Arc<BenchMetrics>>,
    cancel: CancellationToken,
}

impl TrialAggregator {
    pub fn new() -> Self {
        Self {
            pacing: Duration::ZERO,
            reporter: None,
            metrics: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new().with_pacing(config.pacing)
    }

    /// Sleep this long between trials; never part of a measurement
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_reporter(mut self, reporter: ReportCallback) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<BenchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn report(&self, event: BenchEvent) {
        if let Some(ref reporter) = self.reporter {
            reporter(event);
        }
    }

    /// Call `trial_fn` exactly `trial_count` times and collect what it returns
    ///
    /// `trial_fn` receives the 1-based trial number. The first error stops the
    /// run: nothing is recorded for the failing trial and the error comes back
    /// wrapped in `TrialAborted`, so a partial series is never returned.
    pub async fn run_trials<F, Fut>(&self, trial_count: usize, mut trial_fn: F) -> Result<TrialSeries>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<f64>>,
    {
        if trial_count == 0 {
            return Err(BenchError::config("trial_count", "at least one trial is required"));
        }

        let mut series = TrialSeries::new(trial_count);

        for trial in 1..=trial_count {
            if trial > 1 && !self.pacing.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        return Err(self.abort(trial, trial_count, BenchError::Cancelled {
                            reason: "cancelled between trials".to_string(),
                        }));
                    }
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }

            match trial_fn(trial).await {
                Ok(value) => {
                    series.push(value);
                    if let Some(ref metrics) = self.metrics {
                        metrics.record_trial_completed();
                    }
                    self.report(BenchEvent::TrialCompleted {
                        trial,
                        trial_count,
                        value,
                    });
                }
                Err(e) => return Err(self.abort(trial, trial_count, e)),
            }
        }

        info!("Completed {} trials", trial_count);
        Ok(series)
    }

    fn abort(&self, trial: usize, trial_count: usize, error: BenchError) -> BenchError {
        warn!("Trial {} of {} aborted: {}", trial, trial_count, error);
        self.report(BenchEvent::TrialAborted {
            trial,
            trial_count,
            error: error.to_string(),
        });
        BenchError::TrialAborted {
            trial,
            trial_count,
            source: Box::new(error),
        }
    }
}

impl Default for TrialAggregator {
    fn default() -> Self {
        Self::new()
    }
}
