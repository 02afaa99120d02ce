//! Single-operation execution with timing and failure capture

use std::time::Duration;
use tokio::time::Instant;

use crate::bench::core::{BenchError, OperationKind, OperationOutcome, OperationSpec, Result};
use crate::bench::transport::{Transport, TransportRegistry};

/// Execute one operation and describe what happened
///
/// Never fails: every transport error ends up in the returned outcome. The
/// clock only runs while the transport primitive is being awaited, so routing
/// and scheduling overhead are not part of `elapsed`.
pub async fn execute(registry: &TransportRegistry, spec: &OperationSpec) -> OperationOutcome {
    let transport = match registry.find_transport(spec.kind()) {
        Ok(transport) => transport,
        Err(e) => return OperationOutcome::failed(spec, Duration::ZERO, e),
    };

    let start = Instant::now();
    let result = perform(transport, spec).await;
    let elapsed = start.elapsed();

    match result {
        Ok((bytes, status)) => OperationOutcome::succeeded(spec, elapsed, bytes, status),
        Err(e) => OperationOutcome::failed(spec, elapsed, e),
    }
}

async fn perform(transport: &dyn Transport, spec: &OperationSpec) -> Result<(u64, Option<u16>)> {
    let target = spec.target();
    match spec.kind() {
        OperationKind::Read => {
            let path = target.as_path().ok_or(BenchError::UnsupportedOperation { kind: spec.kind() })?;
            let data = transport.read(path).await?;
            Ok((data.len() as u64, None))
        }
        OperationKind::Write => {
            let path = target.as_path().ok_or(BenchError::UnsupportedOperation { kind: spec.kind() })?;
            transport.write(path, spec.payload()).await?;
            Ok((spec.payload().len() as u64, None))
        }
        OperationKind::Request => {
            let url = target.as_url().ok_or(BenchError::UnsupportedOperation { kind: spec.kind() })?;
            let status = transport.get(url).await?;
            if !(200..300).contains(&status) {
                return Err(BenchError::HttpStatus {
                    url: url.to_string(),
                    status,
                });
            }
            Ok((0, Some(status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::transport::FileTransport;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn read_records_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_0.txt");
        tokio::fs::write(&path, vec![b'A'; 1024]).await.unwrap();

        let registry = TransportRegistry::new().register(FileTransport::new());
        let outcome = execute(&registry, &OperationSpec::read(&path)).await;

        assert!(outcome.is_success());
        assert!(outcome.error().is_none());
        assert_eq!(outcome.bytes(), 1024);
    }

    #[tokio::test]
    async fn write_produces_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_0.txt_out");
        let payload: Arc<[u8]> = Arc::from(&b"Test data"[..]);

        let registry = TransportRegistry::new().register(FileTransport::new());
        let outcome = execute(&registry, &OperationSpec::write(&path, payload)).await;

        assert!(outcome.is_success());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"Test data");
    }

    #[tokio::test]
    async fn failure_becomes_outcome() {
        let dir = tempdir().unwrap();
        let registry = TransportRegistry::new().register(FileTransport::new());

        let outcome = execute(&registry, &OperationSpec::read(dir.path().join("missing.txt"))).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.error().map(|e| e.category()), Some("io"));
    }

    #[tokio::test]
    async fn missing_transport_fails_without_timing() {
        let registry = TransportRegistry::new();
        let outcome = execute(&registry, &OperationSpec::request("http://localhost/")).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.elapsed(), Duration::ZERO);
        assert!(matches!(outcome.error(), Some(BenchError::UnsupportedOperation { .. })));
    }
}
