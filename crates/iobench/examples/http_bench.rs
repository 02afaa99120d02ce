//! Example benchmarking HTTP requests with and without connection reuse
//!
//! Expects a server on `http://localhost:1337/` unless `IOBENCH_URL` is set.
//!
//! Run this example with:
//! ```
//! cargo run --example http_bench
//! ```

use iobench::{
    BenchConfig, ClientMode, ConcurrencyPolicy, ConsoleReporter, Harness, IntoReportCallback,
    TrialMetric, WorkloadSource,
};
use std::time::Duration;

#[tokio::main]
async fn main() -> iobench::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let url = std::env::var("IOBENCH_URL").unwrap_or_else(|_| "http://localhost:1337/".to_string());

    for mode in [ClientMode::Shared, ClientMode::PerBatch] {
        let config = BenchConfig::builder()
            .workload_source(WorkloadSource::RepeatedUrl {
                url: url.clone(),
                count: 1000,
            })
            .policy(ConcurrencyPolicy::BoundedCapacity { limit: 100 })
            .client_mode(mode)
            .metric(TrialMetric::Throughput)
            .request_timeout(Duration::from_secs(5))
            .pacing(Duration::from_secs(1))
            .trial_count(5)
            .build()?;

        let report = Harness::new(config)?
            .with_reporter(ConsoleReporter::new(true).into_callback())
            .run()
            .await?;

        println!(
            "{:?}: {:.1} {} on average",
            mode, report.statistics.mean, report.unit
        );
    }

    Ok(())
}
