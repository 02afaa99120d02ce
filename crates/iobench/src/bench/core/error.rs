//! Error types for the benchmark harness with context and classification

use std::error::Error;
use std::path::PathBuf;
use thiserror::Error;

use super::OperationKind;

/// Every failure the harness can observe, from a single refused connection
/// up to a run that had to be aborted
#[derive(Error, Debug)]
pub enum BenchError {
    /// File system I/O errors with file context
    #[error("File operation failed on '{path}' while {operation}")]
    Io {
        path: PathBuf,
        operation: FileOperation,
        #[source]
        source: std::io::Error,
    },

    /// HTTP transport errors (connection refused, reset, DNS, ...)
    #[error("HTTP request to '{url}' failed")]
    HttpRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response arrived but did not carry a 2xx status
    #[error("HTTP request to '{url}' returned status {status}")]
    HttpStatus {
        url: String,
        status: u16,
    },

    /// Request exceeded the configured timeout
    #[error("Request to '{url}' timed out after {timeout_ms}ms")]
    RequestTimeout {
        url: String,
        timeout_ms: u64,
    },

    /// Request target is not a usable URL
    #[error("Invalid URL '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// No registered transport can perform this kind of operation
    #[error("No transport registered for {kind} operations")]
    UnsupportedOperation {
        kind: OperationKind,
    },

    /// The task running an operation panicked
    #[error("Operation on '{target}' panicked: {reason}")]
    OperationPanicked {
        target: String,
        reason: String,
    },

    /// The controller could not schedule or collect the batch
    #[error("Scheduling failure: {reason}")]
    Scheduling {
        reason: String,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },

    /// Workload could not be resolved into at least one target
    #[error("Workload '{source_description}' unavailable: {reason}")]
    WorkloadUnavailable {
        source_description: String,
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Run aborted through its cancellation token
    #[error("Run cancelled: {reason}")]
    Cancelled {
        reason: String,
    },

    /// A trial failed fatally and the remaining trials were not run
    #[error("Trial {trial} of {trial_count} aborted")]
    TrialAborted {
        trial: usize,
        trial_count: usize,
        #[source]
        source: Box<BenchError>,
    },

    /// Statistics requested over a series missing some trials
    #[error("Trial series incomplete: {recorded} of {expected} trials recorded")]
    IncompleteSeries {
        recorded: usize,
        expected: usize,
    },

    /// A run report could not be rendered as JSON
    #[error("Failed to serialize run report")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

/// File operations for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Read,
    Write,
    Create,
    Delete,
    CreateDir,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperation::Read => write!(f, "reading"),
            FileOperation::Write => write!(f, "writing"),
            FileOperation::Create => write!(f, "creating"),
            FileOperation::Delete => write!(f, "deleting"),
            FileOperation::CreateDir => write!(f, "creating directory"),
        }
    }
}

/// Coarse classification deciding how far an error propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recorded in the outcome, never propagated
    OperationFailure,
    /// Stops the run; cleanup still executes
    SchedulingFailure,
    /// Stops the process before any trial runs
    WorkloadUnavailable,
    Configuration,
    Cancelled,
    /// The run finished but its report could not be produced
    Reporting,
}

pub type Result<T> = std::result::Result<T, BenchError>;

impl BenchError {
    /// Classify the error; `TrialAborted` reports the error that caused it
    pub fn kind(&self) -> ErrorKind {
        match self {
            BenchError::Io { .. }
            | BenchError::HttpRequest { .. }
            | BenchError::HttpStatus { .. }
            | BenchError::RequestTimeout { .. }
            | BenchError::InvalidUrl { .. }
            | BenchError::UnsupportedOperation { .. }
            | BenchError::OperationPanicked { .. } => ErrorKind::OperationFailure,
            BenchError::Scheduling { .. } | BenchError::IncompleteSeries { .. } => {
                ErrorKind::SchedulingFailure
            }
            BenchError::WorkloadUnavailable { .. } => ErrorKind::WorkloadUnavailable,
            BenchError::Configuration { .. } => ErrorKind::Configuration,
            BenchError::Cancelled { .. } => ErrorKind::Cancelled,
            BenchError::TrialAborted { source, .. } => source.kind(),
            BenchError::Serialization { .. } => ErrorKind::Reporting,
        }
    }

    /// Whether this error must stop the whole run
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::OperationFailure
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            BenchError::Io { .. } => "io",
            BenchError::HttpRequest { .. } => "http_request",
            BenchError::HttpStatus { .. } => "http_status",
            BenchError::RequestTimeout { .. } => "request_timeout",
            BenchError::InvalidUrl { .. } => "invalid_url",
            BenchError::UnsupportedOperation { .. } => "unsupported_operation",
            BenchError::OperationPanicked { .. } => "operation_panicked",
            BenchError::Scheduling { .. } => "scheduling",
            BenchError::WorkloadUnavailable { .. } => "workload_unavailable",
            BenchError::Configuration { .. } => "configuration",
            BenchError::Cancelled { .. } => "cancelled",
            BenchError::TrialAborted { .. } => "trial_aborted",
            BenchError::IncompleteSeries { .. } => "incomplete_series",
            BenchError::Serialization { .. } => "serialization",
        }
    }

    /// Create a detailed error report for debugging
    pub fn detailed_report(&self) -> String {
        let mut report = format!("Error: {}\n", self);
        report.push_str(&format!("Category: {}\n", self.category()));
        report.push_str(&format!("Kind: {:?}\n", self.kind()));
        report.push_str(&format!("Fatal: {}\n", self.is_fatal()));

        let mut cause = self.source();
        while let Some(err) = cause {
            report.push_str(&format!("Caused by: {}\n", err));
            cause = err.source();
        }

        report
    }

    pub(crate) fn config<S: Into<String>>(field: &str, message: S) -> Self {
        BenchError::Configuration {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub(crate) fn scheduling<S: Into<String>>(reason: S) -> Self {
        BenchError::Scheduling {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn io<P: Into<PathBuf>>(path: P, operation: FileOperation, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            operation,
            source,
        }
    }
}

impl From<tokio::sync::AcquireError> for BenchError {
    fn from(error: tokio::sync::AcquireError) -> Self {
        BenchError::Scheduling {
            reason: "capacity semaphore closed".to_string(),
            source: Some(Box::new(error)),
        }
    }
}
