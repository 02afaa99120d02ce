//! Core types used throughout the benchmark harness
//!
//! This module contains the fundamental types that all other modules depend on:
//! what a single unit of work looks like, and what executing it produced.

pub mod error;
pub mod metrics;
pub mod report;

// Re-export main types for convenience
pub use error::{BenchError, ErrorKind, FileOperation, Result};
pub use metrics::{BenchMetrics, MetricsSnapshot};
pub use report::{
    BenchEvent, CompositeReporter, ConsoleReporter, IntoReportCallback, NullReporter,
    ReportCallback, Reporter,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The kind of I/O an operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Read,
    Write,
    Request,
}

impl OperationKind {
    /// Label used for batches of this kind in reports
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Write => "write",
            OperationKind::Request => "request",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What an operation acts on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Path(PathBuf),
    Url(String),
}

impl Target {
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Target::Path(path) => Some(path),
            Target::Url(_) => None,
        }
    }

    pub fn as_url(&self) -> Option<&str> {
        match self {
            Target::Url(url) => Some(url),
            Target::Path(_) => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Path(path) => write!(f, "{}", path.display()),
            Target::Url(url) => f.write_str(url),
        }
    }
}

/// One unit of work, immutable once built
///
/// Write payloads are shared between all specs of a batch through an `Arc`,
/// so cloning a spec never copies the data.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    kind: OperationKind,
    target: Target,
    payload: Option<Arc<[u8]>>,
}

impl OperationSpec {
    /// Read the file at `path`
    pub fn read<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            kind: OperationKind::Read,
            target: Target::Path(path.into()),
            payload: None,
        }
    }

    /// Create or overwrite the file at `path` with `payload`
    pub fn write<P: Into<PathBuf>>(path: P, payload: Arc<[u8]>) -> Self {
        Self {
            kind: OperationKind::Write,
            target: Target::Path(path.into()),
            payload: Some(payload),
        }
    }

    /// Issue a GET against `url`
    pub fn request<S: Into<String>>(url: S) -> Self {
        Self {
            kind: OperationKind::Request,
            target: Target::Url(url.into()),
            payload: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Data to write; empty for anything but writes
    pub fn payload(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or(&[])
    }
}

/// Result of executing one `OperationSpec`
///
/// An outcome succeeded exactly when it carries no error.
#[derive(Debug)]
pub struct OperationOutcome {
    kind: OperationKind,
    target: Target,
    elapsed: Duration,
    error: Option<BenchError>,
    bytes: u64,
    status: Option<u16>,
}

impl OperationOutcome {
    pub fn succeeded(spec: &OperationSpec, elapsed: Duration, bytes: u64, status: Option<u16>) -> Self {
        Self {
            kind: spec.kind,
            target: spec.target.clone(),
            elapsed,
            error: None,
            bytes,
            status,
        }
    }

    pub fn failed(spec: &OperationSpec, elapsed: Duration, error: BenchError) -> Self {
        let status = match &error {
            BenchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        };

        Self {
            kind: spec.kind,
            target: spec.target.clone(),
            elapsed,
            error: Some(error),
            bytes: 0,
            status,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&BenchError> {
        self.error.as_ref()
    }

    /// Bytes read or written; zero for requests and failures
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// HTTP status, when a response arrived
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_spec_shares_payload() {
        let payload: Arc<[u8]> = Arc::from(&b"Test data"[..]);
        let a = OperationSpec::write("a_out", payload.clone());
        let b = a.clone();

        assert_eq!(a.payload(), b"Test data");
        assert_eq!(Arc::strong_count(&payload), 3);
        assert_eq!(b.kind(), OperationKind::Write);
    }

    #[test]
    fn failed_outcome_keeps_http_status() {
        let spec = OperationSpec::request("http://localhost/");
        let outcome = OperationOutcome::failed(
            &spec,
            Duration::from_millis(3),
            BenchError::HttpStatus {
                url: "http://localhost/".to_string(),
                status: 404,
            },
        );

        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), Some(404));
        assert_eq!(outcome.target().as_url(), Some("http://localhost/"));
    }

    #[test]
    fn success_follows_the_error() {
        let spec = OperationSpec::read("file_0.txt");
        let ok = OperationOutcome::succeeded(&spec, Duration::from_millis(1), 10, None);
        let err = OperationOutcome::failed(
            &spec,
            Duration::from_millis(1),
            BenchError::scheduling("lost"),
        );

        assert!(ok.is_success() && ok.error().is_none());
        assert_eq!(ok.bytes(), 10);
        assert!(!err.is_success() && err.error().is_some());
        assert_eq!(err.bytes(), 0);
        assert_eq!(err.kind(), OperationKind::Read);
    }
}
