//! Benchmark module
//!
//! This module contains the whole measurement pipeline: transports, the
//! concurrency controller, batch and trial layers, cleanup and the harness
//! that ties them together.

pub mod core;
pub mod config;
pub mod transport;
pub mod workload;
pub mod executor;
pub mod controller;
pub mod batch;
pub mod trial;
pub mod cleanup;
pub mod fixtures;
pub mod harness;

// Re-export main types for convenience
pub use self::core::{
    OperationKind, OperationOutcome, OperationSpec, Target,
    BenchEvent, ReportCallback, Reporter, IntoReportCallback,
    ConsoleReporter, NullReporter, CompositeReporter,
    BenchMetrics, MetricsSnapshot,
    BenchError, ErrorKind, FileOperation, Result,
};
pub use config::{BenchConfig, BenchConfigBuilder, ClientMode};
pub use transport::{FileTransport, HttpTransport, Transport, TransportRegistry};
pub use workload::{artifact_path, plan_batch, WorkloadSource};
pub use executor::execute;
pub use controller::{ConcurrencyController, ConcurrencyPolicy};
pub use batch::{BatchResult, BatchRunner, FailureSummary};
pub use trial::{Statistics, TrialAggregator, TrialMetric, TrialSeries};
pub use cleanup::cleanup;
pub use fixtures::{generate_files, generate_in_tempdir};
pub use harness::{Harness, RunReport};
