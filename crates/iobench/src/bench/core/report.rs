//! Event reporting for benchmark runs

use std::sync::Arc;

use crate::bench::trial::Statistics;

/// Callback receiving every event of a run
pub type ReportCallback = Arc<dyn Fn(BenchEvent) + Send + Sync>;

/// Events emitted while a run progresses
#[derive(Debug, Clone)]
pub enum BenchEvent {
    BatchCompleted {
        trial: usize,
        label: String,
        total: usize,
        successful: usize,
        duration_secs: f64,
    },
    TrialCompleted {
        trial: usize,
        trial_count: usize,
        value: f64,
    },
    TrialAborted {
        trial: usize,
        trial_count: usize,
        error: String,
    },
    SeriesCompleted {
        label: String,
        unit: &'static str,
        statistics: Statistics,
    },
    CleanupCompleted {
        removed: usize,
    },
    Warning {
        message: String,
    },
}

/// Trait for reporting with per-event hooks
pub trait Reporter: Send + Sync {
    fn on_batch_completed(&self, _trial: usize, _label: &str, _total: usize, _successful: usize, _duration_secs: f64) {}
    fn on_trial_completed(&self, _trial: usize, _trial_count: usize, _value: f64) {}
    fn on_trial_aborted(&self, _trial: usize, _trial_count: usize, _error: &str) {}
    fn on_series_completed(&self, _label: &str, _unit: &str, _statistics: &Statistics) {}
    fn on_cleanup_completed(&self, _removed: usize) {}
    fn on_warning(&self, _message: &str) {}
}

/// Extension trait to convert a `Reporter` into a `ReportCallback`
pub trait IntoReportCallback {
    fn into_callback(self) -> ReportCallback;
}

impl<T: Reporter + 'static> IntoReportCallback for T {
    fn into_callback(self) -> ReportCallback {
        Arc::new(move |event| match event {
            BenchEvent::BatchCompleted { trial, label, total, successful, duration_secs } => {
                self.on_batch_completed(trial, &label, total, successful, duration_secs);
            }
            BenchEvent::TrialCompleted { trial, trial_count, value } => {
                self.on_trial_completed(trial, trial_count, value);
            }
            BenchEvent::TrialAborted { trial, trial_count, error } => {
                self.on_trial_aborted(trial, trial_count, &error);
            }
            BenchEvent::SeriesCompleted { label, unit, statistics } => {
                self.on_series_completed(&label, unit, &statistics);
            }
            BenchEvent::CleanupCompleted { removed } => {
                self.on_cleanup_completed(removed);
            }
            BenchEvent::Warning { message } => {
                self.on_warning(&message);
            }
        })
    }
}

/// Prints the report surface to stdout
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Reporter for ConsoleReporter {
    fn on_batch_completed(&self, trial: usize, label: &str, total: usize, successful: usize, duration_secs: f64) {
        println!(
            "[trial {}] {}: {} operations in {:.6} seconds (successful: {}/{})",
            trial, label, total, duration_secs, successful, total
        );
    }

    fn on_trial_completed(&self, trial: usize, trial_count: usize, value: f64) {
        if self.verbose {
            println!("trial {}/{} recorded {:.6}", trial, trial_count, value);
        }
    }

    fn on_trial_aborted(&self, trial: usize, trial_count: usize, error: &str) {
        eprintln!("trial {}/{} aborted: {}", trial, trial_count, error);
    }

    fn on_series_completed(&self, label: &str, unit: &str, statistics: &Statistics) {
        println!("--- Stats ({}) ---", label);
        println!("mean: {:.9} {}", statistics.mean, unit);
        println!("min: {:.9} {}", statistics.min, unit);
        println!("max: {:.9} {}", statistics.max, unit);
        println!("stddev: {:.9} {}", statistics.std_dev, unit);
        println!("total: {:.9} {}", statistics.sum, unit);
    }

    fn on_cleanup_completed(&self, removed: usize) {
        if self.verbose || removed > 0 {
            println!("cleanup: removed {} artifacts", removed);
        }
    }

    fn on_warning(&self, message: &str) {
        eprintln!("warning: {}", message);
    }
}

/// Swallows every event
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Fans events out to several reporters
#[derive(Default)]
pub struct CompositeReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reporter<R: Reporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl Reporter for CompositeReporter {
    fn on_batch_completed(&self, trial: usize, label: &str, total: usize, successful: usize, duration_secs: f64) {
        for reporter in &self.reporters {
            reporter.on_batch_completed(trial, label, total, successful, duration_secs);
        }
    }

    fn on_trial_completed(&self, trial: usize, trial_count: usize, value: f64) {
        for reporter in &self.reporters {
            reporter.on_trial_completed(trial, trial_count, value);
        }
    }

    fn on_trial_aborted(&self, trial: usize, trial_count: usize, error: &str) {
        for reporter in &self.reporters {
            reporter.on_trial_aborted(trial, trial_count, error);
        }
    }

    fn on_series_completed(&self, label: &str, unit: &str, statistics: &Statistics) {
        for reporter in &self.reporters {
            reporter.on_series_completed(label, unit, statistics);
        }
    }

    fn on_cleanup_completed(&self, removed: usize) {
        for reporter in &self.reporters {
            reporter.on_cleanup_completed(removed);
        }
    }

    fn on_warning(&self, message: &str) {
        for reporter in &self.reporters {
            reporter.on_warning(message);
        }
    }
}
