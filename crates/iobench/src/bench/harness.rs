//! Top-level benchmark driver
//!
//! A `Harness` owns one validated `BenchConfig` and turns it into a complete
//! run: resolve the workload, run the trials phase by phase, clean up the
//! write artifacts and summarize. Cleanup runs whether or not the trials
//! finished, and the run's error (if any) is returned after it.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::bench::batch::{BatchResult, BatchRunner};
use crate::bench::cleanup::cleanup;
use crate::bench::config::{BenchConfig, ClientMode};
use crate::bench::controller::{ConcurrencyController, ConcurrencyPolicy};
use crate::bench::core::{
    BenchEvent, BenchMetrics, MetricsSnapshot, OperationKind, ReportCallback, Result, Target,
};
use crate::bench::transport::TransportRegistry;
use crate::bench::trial::{Statistics, TrialAggregator, TrialMetric, TrialSeries};
use crate::bench::workload::{plan_batch, WorkloadSource};

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Name of the series, e.g. `files/bounded:100`
    pub label: String,
    pub workload: String,
    pub policy: ConcurrencyPolicy,
    pub metric: TrialMetric,
    pub unit: &'static str,
    /// One value per trial, in the order they ran
    pub trials: Vec<f64>,
    pub statistics: Statistics,
    /// Batches of the final trial
    pub last_batches: Vec<BatchResult>,
    /// Artifacts removed after the trials
    pub cleaned: usize,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

enum Registry {
    /// Built from the configuration, once per run or once per batch
    FromConfig,
    /// Supplied by the caller and used for every batch
    Fixed(Arc<TransportRegistry>),
}

/// Drives a full benchmark run
pub struct Harness {
    config: BenchConfig,
    registry: Registry,
    metrics: Arc<BenchMetrics>,
    reporter: Option<ReportCallback>,
    cancel: CancellationToken,
}

impl Harness {
    /// Create a harness; fails on invalid configuration
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Registry::FromConfig,
            metrics: Arc::new(BenchMetrics::default()),
            reporter: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Route every operation through `registry` instead of the configured transports
    ///
    /// The client mode has no effect once a registry is supplied.
    pub fn with_registry(mut self, registry: TransportRegistry) -> Self {
        self.registry = Registry::Fixed(Arc::new(registry));
        self
    }

    pub fn with_reporter(mut self, reporter: ReportCallback) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<BenchMetrics> {
        self.metrics.clone()
    }

    /// Label used for the series in reports
    pub fn label(&self) -> String {
        let prefix = match self.config.workload_source {
            WorkloadSource::Directory(_) => "files",
            _ => "http",
        };
        format!("{}/{}", prefix, self.config.policy)
    }

    fn report(&self, event: BenchEvent) {
        if let Some(ref reporter) = self.reporter {
            reporter(event);
        }
    }

    /// Run every trial, then clean up
    ///
    /// A workload that cannot be resolved fails before any trial runs. Once
    /// the trials have started, cleanup always runs; a cleanup failure is
    /// reported but never hides the error that stopped the trials.
    pub async fn run(&self) -> Result<RunReport> {
        let span = info_span!(
            "run",
            workload = %self.config.workload_source,
            policy = %self.config.policy,
            trials = self.config.trial_count,
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<RunReport> {
        let targets = self
            .config
            .workload_source
            .resolve(&self.config.artifact_suffix)
            .await?;
        info!("Workload resolved to {} targets", targets.len());

        let outcome = self.run_trials(&targets).await;
        self.conclude(&targets, outcome).await
    }

    /// Clean up after the trials and turn their outcome into a report
    async fn conclude(
        &self,
        targets: &[Target],
        outcome: Result<(TrialSeries, Vec<BatchResult>)>,
    ) -> Result<RunReport> {
        let cleaned = match cleanup(targets, &self.config.artifact_suffix).await {
            Ok(removed) => {
                self.report(BenchEvent::CleanupCompleted { removed });
                removed
            }
            Err(e) => {
                warn!("Cleanup failed: {}", e);
                self.report(BenchEvent::Warning {
                    message: format!("cleanup failed: {}", e),
                });
                if outcome.is_ok() {
                    return Err(e);
                }
                0
            }
        };

        let (series, last_batches) = outcome?;
        let statistics = series.compute_statistics()?;
        let label = self.label();
        self.report(BenchEvent::SeriesCompleted {
            label: label.clone(),
            unit: self.config.metric.unit(),
            statistics,
        });

        Ok(RunReport {
            label,
            workload: self.config.workload_source.to_string(),
            policy: self.config.policy,
            metric: self.config.metric,
            unit: self.config.metric.unit(),
            trials: series.values().to_vec(),
            statistics,
            last_batches,
            cleaned,
            metrics: self.metrics.snapshot(),
        })
    }

    async fn run_trials(&self, targets: &[Target]) -> Result<(TrialSeries, Vec<BatchResult>)> {
        let phases = self.config.effective_phases();
        let payload: Arc<[u8]> = Arc::from(self.config.write_payload.as_slice());
        let shared = match (&self.registry, self.config.client_mode) {
            (Registry::Fixed(registry), _) => Some(registry.clone()),
            (Registry::FromConfig, ClientMode::Shared) => {
                Some(Arc::new(TransportRegistry::from_config(&self.config)?))
            }
            (Registry::FromConfig, ClientMode::PerBatch) => None,
        };

        let mut aggregator = TrialAggregator::from_config(&self.config)
            .with_metrics(self.metrics.clone())
            .with_cancellation_token(self.cancel.clone());
        if let Some(ref reporter) = self.reporter {
            aggregator = aggregator.with_reporter(reporter.clone());
        }

        let last_batches = Mutex::new(Vec::new());
        let series = aggregator
            .run_trials(self.config.trial_count, |trial| {
                let (phases, payload, shared, last_batches) = (&phases, &payload, &shared, &last_batches);
                async move {
                    let (value, batches) = self
                        .run_trial(trial, targets, phases, payload, shared.as_ref())
                        .await?;
                    *last_batches.lock().unwrap_or_else(PoisonError::into_inner) = batches;
                    Ok(value)
                }
            })
            .await?;

        Ok((series, last_batches.into_inner().unwrap_or_else(PoisonError::into_inner)))
    }

    /// One trial: every phase as its own batch, timed end to end
    async fn run_trial(
        &self,
        trial: usize,
        targets: &[Target],
        phases: &[OperationKind],
        payload: &Arc<[u8]>,
        shared: Option<&Arc<TransportRegistry>>,
    ) -> Result<(f64, Vec<BatchResult>)> {
        let start = Instant::now();
        let mut batches = Vec::with_capacity(phases.len());

        for &kind in phases {
            let specs = plan_batch(
                targets,
                kind,
                self.config.batch_size,
                payload,
                &self.config.artifact_suffix,
            )?;

            let registry = match shared {
                Some(registry) => registry.clone(),
                None => Arc::new(TransportRegistry::from_config(&self.config)?),
            };
            let controller = ConcurrencyController::new(registry).with_cancellation_token(self.cancel.clone());
            let runner = BatchRunner::new(controller, self.metrics.clone());

            let result = runner.run_batch(kind.label(), specs, self.config.policy).await?;
            self.report(BenchEvent::BatchCompleted {
                trial,
                label: result.label.clone(),
                total: result.total(),
                successful: result.success_count,
                duration_secs: result.duration.as_secs_f64(),
            });
            batches.push(result);
        }

        let elapsed = start.elapsed();
        if self.config.metric.is_vacuous(&batches) {
            warn!("Trial {} had no successful operations; recording 0 latency", trial);
            self.report(BenchEvent::Warning {
                message: format!("trial {} had no successful operations, latency recorded as 0", trial),
            });
        }
        Ok((self.config.metric.measure(elapsed, &batches), batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::core::{BenchError, ErrorKind};
    use crate::bench::fixtures::generate_in_tempdir;
    use crate::bench::transport::Transport;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn capture() -> (ReportCallback, Arc<Mutex<Vec<BenchEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = events.clone();
        let callback: ReportCallback = Arc::new(move |event| captured.lock().unwrap().push(event));
        (callback, events)
    }

    fn artifacts_in(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("_out"))
            .count()
    }

    /// Answers every request with a 503
    struct Unavailable;

    #[async_trait]
    impl Transport for Unavailable {
        fn supports(&self, kind: OperationKind) -> bool {
            kind == OperationKind::Request
        }

        async fn get(&self, url: &str) -> Result<u16> {
            Err(BenchError::HttpStatus {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = BenchConfig {
            trial_count: 0,
            ..BenchConfig::default()
        };
        assert!(matches!(Harness::new(config), Err(BenchError::Configuration { .. })));
    }

    #[test]
    fn label_names_workload_and_policy() {
        let config = BenchConfig::builder()
            .urls(["http://localhost:1337"])
            .policy(ConcurrencyPolicy::BoundedCapacity { limit: 100 })
            .build()
            .unwrap();
        let harness = Harness::new(config).unwrap();
        assert_eq!(harness.label(), "http/bounded:100");
    }

    #[tokio::test]
    async fn missing_workload_fails_before_any_trial() {
        let config = BenchConfig::builder()
            .directory("/nonexistent/iobench/workload")
            .trial_count(3)
            .build()
            .unwrap();
        let harness = Harness::new(config).unwrap();

        let err = harness.run().await.unwrap_err();
        assert!(matches!(err, BenchError::WorkloadUnavailable { .. }));
        assert_eq!(harness.metrics().snapshot().trials_completed, 0);
    }

    #[tokio::test]
    async fn scheduling_failure_on_third_trial_still_cleans_up() {
        let (dir, _paths) = generate_in_tempdir(3, 1).await.unwrap();
        let config = BenchConfig::builder()
            .directory(dir.path())
            .trial_count(5)
            .build()
            .unwrap();
        let (reporter, events) = capture();
        let harness = Harness::new(config).unwrap().with_reporter(reporter.clone());

        let targets = harness.config().workload_source.resolve("_out").await.unwrap();
        let phases = harness.config().effective_phases();
        let payload: Arc<[u8]> = Arc::from(&b"Test data"[..]);
        let registry = Arc::new(TransportRegistry::from_config(harness.config()).unwrap());
        let calls = AtomicUsize::new(0);

        let outcome = TrialAggregator::new()
            .with_reporter(reporter)
            .run_trials(5, |trial| {
                let (harness, targets, phases, payload, registry, calls) =
                    (&harness, &targets, &phases, &payload, &registry, &calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if trial == 3 {
                        return Err(BenchError::scheduling("injected fault"));
                    }
                    let (value, _) = harness
                        .run_trial(trial, targets, phases, payload, Some(registry))
                        .await?;
                    Ok(value)
                }
            })
            .await
            .map(|series| (series, Vec::new()));

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(artifacts_in(dir.path()), 3);

        let err = harness.conclude(&targets, outcome).await.unwrap_err();
        match &err {
            BenchError::TrialAborted { trial, trial_count, source } => {
                assert_eq!(*trial, 3);
                assert_eq!(*trial_count, 5);
                assert!(matches!(**source, BenchError::Scheduling { .. }));
            }
            other => panic!("Expected TrialAborted, got {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::SchedulingFailure);
        assert_eq!(artifacts_in(dir.path()), 0);

        let events = events.lock().unwrap();
        assert!(events.iter().any(|e| matches!(e, BenchEvent::TrialAborted { trial: 3, .. })));
        assert!(events.iter().any(|e| matches!(e, BenchEvent::CleanupCompleted { removed: 3 })));
        assert!(!events.iter().any(|e| matches!(e, BenchEvent::SeriesCompleted { .. })));
    }

    #[tokio::test]
    async fn latency_of_a_trial_without_successes_is_flagged() {
        let config = BenchConfig::builder()
            .workload_source(WorkloadSource::RepeatedUrl {
                url: "http://unavailable.test/".to_string(),
                count: 3,
            })
            .metric(TrialMetric::MeanLatency)
            .trial_count(2)
            .build()
            .unwrap();
        let (reporter, events) = capture();
        let report = Harness::new(config)
            .unwrap()
            .with_registry(TransportRegistry::new().register(Unavailable))
            .with_reporter(reporter)
            .run()
            .await
            .unwrap();

        assert_eq!(report.trials, vec![0.0, 0.0]);
        let warnings = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, BenchEvent::Warning { message } if message.contains("no successful operations")))
            .count();
        assert_eq!(warnings, 2);
    }
}
