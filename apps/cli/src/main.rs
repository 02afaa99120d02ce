//! Command-line driver for iobench
//!
//! Every option can also come from an `IOBENCH_*` environment variable or a
//! `.env` file in the working directory.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use iobench::bench::{cleanup, generate_files, Target};
use iobench::{
    BenchConfig, ClientMode, ConcurrencyPolicy, ConsoleReporter, Harness, IntoReportCallback,
    RunReport, TrialMetric, WorkloadSource,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "iobench", version, about = "Benchmark concurrent file and HTTP I/O")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the run report as JSON instead of the text summary
    #[arg(long, global = true, env = "IOBENCH_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read every file in a directory, then write an artifact for each
    Files {
        /// Directory holding the workload files
        #[arg(long, default_value = "test_files", env = "IOBENCH_DIR")]
        dir: PathBuf,

        /// Data written to each artifact
        #[arg(long, default_value = "Test data", env = "IOBENCH_PAYLOAD")]
        payload: String,

        /// Suffix naming the write artifacts
        #[arg(long, default_value = "_out", env = "IOBENCH_SUFFIX")]
        suffix: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Issue GET requests against one or more URLs
    Http {
        /// URL to request; repeat for several
        #[arg(long = "url", required = true, env = "IOBENCH_URLS", value_delimiter = ',')]
        urls: Vec<String>,

        /// Request the first URL this many times instead of the list
        #[arg(long, env = "IOBENCH_REPEAT")]
        repeat: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 10, env = "IOBENCH_TIMEOUT_SECS")]
        timeout_secs: u64,

        /// Reuse one client for the run or build one per batch
        #[arg(long, value_enum, default_value_t = ClientModeArg::Shared, env = "IOBENCH_CLIENT_MODE")]
        client_mode: ClientModeArg,

        #[arg(long, default_value = "iobench/0.1.0", env = "IOBENCH_USER_AGENT")]
        user_agent: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Create dummy files for the files benchmark
    Generate {
        #[arg(long, default_value = "test_files", env = "IOBENCH_DIR")]
        dir: PathBuf,

        #[arg(long, default_value_t = 100)]
        count: usize,

        /// Size of each file in KiB
        #[arg(long, default_value_t = 10)]
        size_kb: usize,
    },
    /// Remove artifacts left behind by an interrupted run
    Clean {
        #[arg(long, default_value = "test_files", env = "IOBENCH_DIR")]
        dir: PathBuf,

        #[arg(long, default_value = "_out", env = "IOBENCH_SUFFIX")]
        suffix: String,
    },
}

/// Options shared by every benchmark subcommand
#[derive(Args, Debug)]
struct RunArgs {
    /// unbounded, structured or bounded:<limit>
    #[arg(long, default_value = "unbounded", env = "IOBENCH_POLICY")]
    policy: ConcurrencyPolicy,

    #[arg(long, default_value_t = 20, env = "IOBENCH_TRIALS")]
    trials: usize,

    /// Operations per batch; defaults to one per target
    #[arg(long, env = "IOBENCH_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// duration, throughput or latency
    #[arg(long, default_value = "duration", env = "IOBENCH_METRIC")]
    metric: TrialMetric,

    /// Pause between trials in milliseconds
    #[arg(long, default_value_t = 0, env = "IOBENCH_PACING_MS")]
    pacing_ms: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ClientModeArg {
    Shared,
    PerBatch,
}

impl From<ClientModeArg> for ClientMode {
    fn from(mode: ClientModeArg) -> Self {
        match mode {
            ClientModeArg::Shared => ClientMode::Shared,
            ClientModeArg::PerBatch => ClientMode::PerBatch,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_run_args(builder: iobench::bench::BenchConfigBuilder, run: &RunArgs) -> iobench::bench::BenchConfigBuilder {
    let builder = builder
        .policy(run.policy)
        .trial_count(run.trials)
        .metric(run.metric)
        .pacing(Duration::from_millis(run.pacing_ms));
    match run.batch_size {
        Some(size) => builder.batch_size(size),
        None => builder,
    }
}

fn build_config(command: &Command) -> iobench::Result<Option<BenchConfig>> {
    let config = match command {
        Command::Files { dir, payload, suffix, run } => apply_run_args(
            BenchConfig::builder()
                .directory(dir.clone())
                .write_payload(payload.as_bytes())
                .artifact_suffix(suffix.clone()),
            run,
        )
        .build()?,
        Command::Http {
            urls,
            repeat,
            timeout_secs,
            client_mode,
            user_agent,
            run,
        } => {
            let source = match (repeat, urls.first()) {
                (Some(count), Some(url)) => WorkloadSource::RepeatedUrl {
                    url: url.clone(),
                    count: *count,
                },
                _ => WorkloadSource::Urls(urls.clone()),
            };
            apply_run_args(
                BenchConfig::builder()
                    .workload_source(source)
                    .request_timeout(Duration::from_secs(*timeout_secs))
                    .client_mode((*client_mode).into())
                    .user_agent(user_agent.clone()),
                run,
            )
            .build()?
        }
        Command::Generate { .. } | Command::Clean { .. } => return Ok(None),
    };
    Ok(Some(config))
}

fn print_summary(report: &RunReport) {
    for batch in &report.last_batches {
        if batch.total() == 0 {
            continue;
        }
        print!("{}: throughput {:.2} operations/second", batch.label, batch.throughput());
        match batch.mean_latency() {
            Some(latency) => println!(", mean latency {:.6} seconds", latency.as_secs_f64()),
            None => println!(),
        }
        for failure in batch.failures.iter().take(5) {
            println!("  failed {} ({}): {}", failure.target, failure.category, failure.message);
        }
    }
}

async fn run_benchmark(config: BenchConfig, json: bool, verbose: bool) -> Result<()> {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting the run");
            on_signal.cancel();
        }
    });

    let mut harness = Harness::new(config)?.with_cancellation_token(token);
    if !json {
        harness = harness.with_reporter(ConsoleReporter::new(verbose).into_callback());
    }

    let report = harness.run().await.map_err(|e| {
        error!("{}", e.detailed_report());
        e
    })?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Generate { dir, count, size_kb } => {
            let paths = generate_files(dir, *count, *size_kb)
                .await
                .with_context(|| format!("generating files in {}", dir.display()))?;
            println!("Generated {} files of {} KiB in {}", paths.len(), size_kb, dir.display());
        }
        Command::Clean { dir, suffix } => {
            let targets: Vec<Target> = WorkloadSource::Directory(dir.clone())
                .resolve(suffix)
                .await
                .with_context(|| format!("listing {}", dir.display()))?;
            let removed = cleanup(&targets, suffix).await?;
            println!("Removed {} artifacts", removed);
        }
        command => {
            let config = build_config(command)?.context("subcommand does not run a benchmark")?;
            info!("Running {} trials against {}", config.trial_count, config.workload_source);
            run_benchmark(config, cli.json, cli.verbose > 0).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
