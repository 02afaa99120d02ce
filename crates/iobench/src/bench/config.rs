//! Configuration types for benchmark runs

use std::path::PathBuf;
use std::time::Duration;

use crate::bench::controller::ConcurrencyPolicy;
use crate::bench::core::{BenchError, OperationKind, Result};
use crate::bench::trial::TrialMetric;
use crate::bench::workload::WorkloadSource;

/// How HTTP clients are reused across batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientMode {
    /// One client (and connection pool) for the whole run
    #[default]
    Shared,
    /// A fresh client for every batch
    PerBatch,
}

/// Configuration for a benchmark run
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub workload_source: WorkloadSource,
    pub policy: ConcurrencyPolicy,
    /// Number of sequential trials, at least 1
    pub trial_count: usize,
    /// Operations per batch; `None` means one per workload target
    pub batch_size: Option<usize>,
    /// Batches making up one trial, in order; empty picks the workload's default
    pub phases: Vec<OperationKind>,
    /// Number recorded per trial
    pub metric: TrialMetric,
    /// Delay between trials, excluded from every measurement
    pub pacing: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub client_mode: ClientMode,
    /// Data written by each write operation
    pub write_payload: Vec<u8>,
    /// Appended to a file name to derive its write artifact
    pub artifact_suffix: String,
}

impl BenchConfig {
    pub fn builder() -> BenchConfigBuilder {
        BenchConfigBuilder::new()
    }

    /// Batches run per trial
    ///
    /// Directory workloads read every file and then write every artifact;
    /// URL workloads issue one request batch.
    pub fn effective_phases(&self) -> Vec<OperationKind> {
        if !self.phases.is_empty() {
            return self.phases.clone();
        }

        match self.workload_source {
            WorkloadSource::Directory(_) => vec![OperationKind::Read, OperationKind::Write],
            WorkloadSource::Urls(_) | WorkloadSource::RepeatedUrl { .. } => vec![OperationKind::Request],
        }
    }

    /// Check the configuration for values the harness cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.trial_count == 0 {
            return Err(BenchError::config("trial_count", "at least one trial is required"));
        }

        if let ConcurrencyPolicy::BoundedCapacity { limit: 0 } = self.policy {
            return Err(BenchError::config("policy", "bounded capacity limit must be positive"));
        }

        if self.batch_size == Some(0) {
            return Err(BenchError::config("batch_size", "batch size must be positive"));
        }

        if self.artifact_suffix.is_empty() {
            return Err(BenchError::config(
                "artifact_suffix",
                "an empty suffix would make write artifacts overwrite their sources",
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(BenchError::config("request_timeout", "timeout must be non-zero"));
        }

        let is_directory = matches!(self.workload_source, WorkloadSource::Directory(_));
        for phase in self.effective_phases() {
            let fits = match phase {
                OperationKind::Read | OperationKind::Write => is_directory,
                OperationKind::Request => !is_directory,
            };
            if !fits {
                return Err(BenchError::config(
                    "phases",
                    format!("{} operations do not apply to workload {}", phase, self.workload_source),
                ));
            }
        }

        Ok(())
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            workload_source: WorkloadSource::Directory(PathBuf::from("test_files")),
            policy: ConcurrencyPolicy::Unbounded,
            trial_count: 20,
            batch_size: None,
            phases: Vec::new(),
            metric: TrialMetric::BatchDuration,
            pacing: Duration::ZERO,
            request_timeout: Duration::from_secs(10),
            user_agent: "iobench/0.1.0".to_string(),
            client_mode: ClientMode::Shared,
            write_payload: b"Test data".to_vec(),
            artifact_suffix: "_out".to_string(),
        }
    }
}

/// Fluent builder for `BenchConfig`
#[derive(Debug, Clone, Default)]
pub struct BenchConfigBuilder {
    config: BenchConfig,
}

impl BenchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workload_source(mut self, source: WorkloadSource) -> Self {
        self.config.workload_source = source;
        self
    }

    pub fn directory<P: Into<PathBuf>>(self, dir: P) -> Self {
        self.workload_source(WorkloadSource::Directory(dir.into()))
    }

    pub fn urls<I, S>(self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workload_source(WorkloadSource::Urls(urls.into_iter().map(Into::into).collect()))
    }

    pub fn policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn trial_count(mut self, trial_count: usize) -> Self {
        self.config.trial_count = trial_count;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = Some(batch_size);
        self
    }

    pub fn phases(mut self, phases: Vec<OperationKind>) -> Self {
        self.config.phases = phases;
        self
    }

    pub fn metric(mut self, metric: TrialMetric) -> Self {
        self.config.metric = metric;
        self
    }

    pub fn pacing(mut self, pacing: Duration) -> Self {
        self.config.pacing = pacing;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn client_mode(mut self, mode: ClientMode) -> Self {
        self.config.client_mode = mode;
        self
    }

    pub fn write_payload<B: Into<Vec<u8>>>(mut self, payload: B) -> Self {
        self.config.write_payload = payload.into();
        self
    }

    pub fn artifact_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.config.artifact_suffix = suffix.into();
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<BenchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BenchConfig::default().validate().is_ok());
    }

    #[test]
    fn directory_workload_reads_then_writes() {
        let config = BenchConfig::builder().directory("files").build().unwrap();
        assert_eq!(
            config.effective_phases(),
            vec![OperationKind::Read, OperationKind::Write]
        );
    }

    #[test]
    fn rejects_zero_trials() {
        let err = BenchConfig::builder().trial_count(0).build().unwrap_err();
        match err {
            BenchError::Configuration { field, .. } => assert_eq!(field.as_deref(), Some("trial_count")),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_zero_capacity() {
        let result = BenchConfig::builder()
            .policy(ConcurrencyPolicy::BoundedCapacity { limit: 0 })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_requests_against_directory() {
        let result = BenchConfig::builder()
            .directory("files")
            .phases(vec![OperationKind::Request])
            .build();
        assert!(matches!(result, Err(BenchError::Configuration { .. })));
    }

    #[test]
    fn url_workload_defaults_to_requests() {
        let config = BenchConfig::builder()
            .urls(["http://localhost:1337"])
            .batch_size(50)
            .build()
            .unwrap();
        assert_eq!(config.effective_phases(), vec![OperationKind::Request]);
        assert_eq!(config.batch_size, Some(50));
    }
}
