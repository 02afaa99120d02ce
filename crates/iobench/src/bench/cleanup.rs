//! Removal of write artifacts

use std::collections::HashSet;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};

use crate::bench::core::{BenchError, FileOperation, Result, Target};
use crate::bench::workload::artifact_path;

/// Delete the artifact of every path target, returning how many were removed
///
/// Missing artifacts are skipped, so running this twice is harmless. URL
/// targets have no artifacts and are ignored. A failed removal does not stop
/// the pass: every artifact is attempted and the first failure is returned.
pub async fn cleanup(targets: &[Target], artifact_suffix: &str) -> Result<usize> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut removed = 0usize;
    let mut first_error: Option<BenchError> = None;

    for target in targets {
        let Some(source) = target.as_path() else {
            continue;
        };

        let artifact = artifact_path(source, artifact_suffix);
        if !seen.insert(artifact.clone()) {
            continue;
        }

        match fs::remove_file(&artifact).await {
            Ok(()) => {
                debug!("Removed {}", artifact.display());
                removed += 1;
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to remove {}: {}", artifact.display(), e);
                if first_error.is_none() {
                    first_error = Some(BenchError::io(artifact, FileOperation::Delete, e));
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(removed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn removes_artifacts_and_keeps_sources() {
        let dir = tempdir().unwrap();
        let mut targets = Vec::new();
        for i in 0..3 {
            let source = dir.path().join(format!("file_{}.txt", i));
            tokio::fs::write(&source, b"A").await.unwrap();
            tokio::fs::write(artifact_path(&source, "_out"), b"Test data").await.unwrap();
            targets.push(Target::Path(source));
        }

        let removed = cleanup(&targets, "_out").await.unwrap();

        assert_eq!(removed, 3);
        for target in &targets {
            let source = target.as_path().unwrap();
            assert!(source.exists());
            assert!(!artifact_path(source, "_out").exists());
        }
    }

    #[tokio::test]
    async fn second_pass_removes_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("file_0.txt");
        tokio::fs::write(&source, b"A").await.unwrap();
        tokio::fs::write(artifact_path(&source, "_out"), b"Test data").await.unwrap();
        let targets = vec![Target::Path(source)];

        assert_eq!(cleanup(&targets, "_out").await.unwrap(), 1);
        assert_eq!(cleanup(&targets, "_out").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_targets_count_once() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("file_0.txt");
        tokio::fs::write(artifact_path(&source, "_out"), b"Test data").await.unwrap();
        let targets = vec![Target::Path(source.clone()), Target::Path(source)];

        assert_eq!(cleanup(&targets, "_out").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_removal_does_not_stop_the_pass() {
        let dir = tempdir().unwrap();
        let mut targets = Vec::new();
        for i in 0..3 {
            let source = dir.path().join(format!("file_{}.txt", i));
            tokio::fs::write(&source, b"A").await.unwrap();
            targets.push(Target::Path(source));
        }
        let blocked = artifact_path(targets[0].as_path().unwrap(), "_out");
        tokio::fs::create_dir(&blocked).await.unwrap();
        for target in &targets[1..] {
            tokio::fs::write(artifact_path(target.as_path().unwrap(), "_out"), b"Test data")
                .await
                .unwrap();
        }

        let err = cleanup(&targets, "_out").await.unwrap_err();

        assert!(matches!(
            err,
            BenchError::Io { operation: FileOperation::Delete, ref path, .. } if *path == blocked
        ));
        assert!(blocked.is_dir());
        for target in &targets[1..] {
            assert!(!artifact_path(target.as_path().unwrap(), "_out").exists());
        }
    }

    #[tokio::test]
    async fn url_targets_are_ignored() {
        let targets = vec![Target::Url("http://localhost:1337/".to_string())];
        assert_eq!(cleanup(&targets, "_out").await.unwrap(), 0);
    }
}
