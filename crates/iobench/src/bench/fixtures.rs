//! Workload fixture generation

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::fs;
use tracing::info;

use crate::bench::core::{BenchError, FileOperation, Result};

/// Write `count` files named `file_<i>.txt`, each `size_kb` KiB of `'A'`
///
/// The directory is created if needed and existing files are overwritten.
pub async fn generate_files(dir: &Path, count: usize, size_kb: usize) -> Result<Vec<PathBuf>> {
    if count == 0 {
        return Err(BenchError::config("count", "at least one file is required"));
    }

    fs::create_dir_all(dir)
        .await
        .map_err(|e| BenchError::io(dir, FileOperation::CreateDir, e))?;

    let content = vec![b'A'; size_kb * 1024];
    let mut paths = Vec::with_capacity(count);
    for i in 0..count {
        let path = dir.join(format!("file_{}.txt", i));
        fs::write(&path, &content)
            .await
            .map_err(|e| BenchError::io(&path, FileOperation::Create, e))?;
        paths.push(path);
    }

    info!("Generated {} files of {} KiB in {}", count, size_kb, dir.display());
    Ok(paths)
}

/// Generate files in a fresh temporary directory, removed when the guard drops
pub async fn generate_in_tempdir(count: usize, size_kb: usize) -> Result<(TempDir, Vec<PathBuf>)> {
    let dir = tempfile::Builder::new()
        .prefix("iobench-")
        .tempdir()
        .map_err(|e| BenchError::io(std::env::temp_dir(), FileOperation::CreateDir, e))?;
    let paths = generate_files(dir.path(), count, size_kb).await?;
    Ok((dir, paths))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generates_named_files_of_requested_size() {
        let (dir, paths) = generate_in_tempdir(3, 2).await.unwrap();

        assert_eq!(paths.len(), 3);
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(path, &dir.path().join(format!("file_{}.txt", i)));
            let data = tokio::fs::read(path).await.unwrap();
            assert_eq!(data.len(), 2048);
            assert!(data.iter().all(|&b| b == b'A'));
        }
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("test_files");

        let paths = generate_files(&dir, 1, 1).await.unwrap();
        assert!(paths[0].exists());
    }

    #[tokio::test]
    async fn zero_files_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        assert!(generate_files(root.path(), 0, 1).await.is_err());
    }
}
