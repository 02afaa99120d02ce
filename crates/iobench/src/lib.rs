//! I/O Benchmark Library
//!
//! This library measures the latency and throughput of concurrent I/O-bound
//! operations (file reads and writes, HTTP requests) under different
//! concurrency-control policies, and aggregates repeated trials into
//! summary statistics.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use iobench::{
//!     BenchConfig, ConcurrencyPolicy, ConsoleReporter, Harness, IntoReportCallback,
//! };
//!
//! # async fn example() -> iobench::Result<()> {
//! // Benchmark reading and rewriting every file in a directory
//! let config = BenchConfig::builder()
//!     .directory("test_files")
//!     .policy(ConcurrencyPolicy::BoundedCapacity { limit: 100 })
//!     .trial_count(20)
//!     .build()?;
//!
//! let harness = Harness::new(config)?
//!     .with_reporter(ConsoleReporter::new(false).into_callback());
//!
//! // Write artifacts are removed before `run` returns
//! let report = harness.run().await?;
//! println!("mean: {:.9} seconds", report.statistics.mean);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Concurrency policies**: unbounded fan-out, structured task groups, bounded capacity
//! - **Failure isolation**: failed or panicking operations become data, never abort a batch
//! - **Consistent timing**: per-operation, per-batch and per-trial clocks
//! - **Statistics**: mean, min, max, population standard deviation and total
//! - **Pluggable transports**: file system and HTTP, or your own `Transport`
//! - **Cooperative cancellation**: abort a run and reap every in-flight operation
//! - **Async/await**: Full async support with Tokio runtime

pub mod bench;

// Re-export commonly used types for convenience
pub use bench::{
    BatchResult, BenchConfig, BenchError, BenchEvent, ClientMode, ConcurrencyPolicy,
    ConsoleReporter, Harness, IntoReportCallback, OperationKind, ReportCallback, Reporter,
    Result, RunReport, Statistics, TrialMetric, WorkloadSource,
};
