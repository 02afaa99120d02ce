//! Example comparing concurrency policies on a file workload
//!
//! Generates dummy files in a temporary directory, then reads every file and
//! writes an `_out` artifact next to it, once per policy.
//!
//! Run this example with:
//! ```
//! cargo run --example file_io_bench
//! ```

use iobench::bench::generate_in_tempdir;
use iobench::{BenchConfig, ConcurrencyPolicy, ConsoleReporter, Harness, IntoReportCallback};

#[tokio::main]
async fn main() -> iobench::Result<()> {
    tracing_subscriber::fmt::init();

    let (dir, paths) = generate_in_tempdir(100, 10).await?;
    println!("Generated {} files in {}", paths.len(), dir.path().display());

    for policy in [
        ConcurrencyPolicy::Unbounded,
        ConcurrencyPolicy::StructuredGroup,
        ConcurrencyPolicy::BoundedCapacity { limit: 10 },
    ] {
        let config = BenchConfig::builder()
            .directory(dir.path())
            .policy(policy)
            .trial_count(5)
            .build()?;

        let report = Harness::new(config)?
            .with_reporter(ConsoleReporter::new(false).into_callback())
            .run()
            .await?;

        println!(
            "{}: {} operations, {:.1}% successful",
            report.label,
            report.metrics.operations,
            report.metrics.success_rate() * 100.0
        );
    }

    Ok(())
}
