//! File system transport on `tokio::fs`

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

use crate::bench::core::{BenchError, FileOperation, OperationKind, Result};
use crate::bench::transport::Transport;

/// Reads and writes whole files
#[derive(Debug, Default, Clone)]
pub struct FileTransport;

impl FileTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn supports(&self, kind: OperationKind) -> bool {
        matches!(kind, OperationKind::Read | OperationKind::Write)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .map_err(|e| BenchError::io(path, FileOperation::Read, e))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        fs::write(path, data)
            .await
            .map_err(|e| BenchError::io(path, FileOperation::Write, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("file_0.txt_out");
        let transport = FileTransport::new();

        transport.write(&path, b"Test data").await.unwrap();
        assert_eq!(transport.read(&path).await.unwrap(), b"Test data");
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");

        match FileTransport::new().read(&path).await.unwrap_err() {
            BenchError::Io { path: reported, operation, .. } => {
                assert_eq!(reported, path);
                assert_eq!(operation, FileOperation::Read);
            }
            other => panic!("Expected Io error, got {:?}", other),
        }
    }
}
