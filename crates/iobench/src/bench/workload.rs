//! Workload sources and batch planning
//!
//! A workload resolves once per run into an ordered list of targets. Every
//! batch then gets a fresh set of `OperationSpec`s planned from that list.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::debug;

use crate::bench::core::{BenchError, OperationKind, OperationSpec, Result, Target};

/// Where the targets of a run come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadSource {
    /// Every regular file in a directory
    Directory(PathBuf),
    /// A fixed list of URLs, used as given
    Urls(Vec<String>),
    /// The same URL `count` times
    RepeatedUrl { url: String, count: usize },
}

impl fmt::Display for WorkloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadSource::Directory(dir) => write!(f, "directory {}", dir.display()),
            WorkloadSource::Urls(urls) => write!(f, "{} urls", urls.len()),
            WorkloadSource::RepeatedUrl { url, count } => write!(f, "{} x {}", count, url),
        }
    }
}

impl WorkloadSource {
    /// Resolve the source into its ordered targets
    ///
    /// Directory entries are sorted by file name, and files that already carry
    /// `artifact_suffix` are skipped so leftovers from an interrupted run are
    /// never benchmarked as inputs. URL lists keep duplicates and order.
    pub async fn resolve(&self, artifact_suffix: &str) -> Result<Vec<Target>> {
        let targets = match self {
            WorkloadSource::Directory(dir) => list_directory(dir, artifact_suffix).await?,
            WorkloadSource::Urls(urls) => urls.iter().cloned().map(Target::Url).collect(),
            WorkloadSource::RepeatedUrl { url, count } => {
                std::iter::repeat_n(Target::Url(url.clone()), *count).collect()
            }
        };

        if targets.is_empty() {
            return Err(BenchError::WorkloadUnavailable {
                source_description: self.to_string(),
                reason: "no targets found".to_string(),
                source: None,
            });
        }

        debug!("Resolved {} targets from {}", targets.len(), self);
        Ok(targets)
    }
}

async fn list_directory(dir: &Path, artifact_suffix: &str) -> Result<Vec<Target>> {
    let unavailable = |reason: &str, source: std::io::Error| BenchError::WorkloadUnavailable {
        source_description: format!("directory {}", dir.display()),
        reason: reason.to_string(),
        source: Some(source),
    };

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| unavailable("cannot list directory", e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| unavailable("cannot read directory entry", e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| unavailable("cannot stat directory entry", e))?;
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        if is_artifact(&path, artifact_suffix) {
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files.into_iter().map(Target::Path).collect())
}

/// Path a write operation produces for `source`: the file name with `suffix` appended
pub fn artifact_path(source: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = source.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Whether `path` is named like a write artifact
pub fn is_artifact(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

/// Build the specs for one batch of `kind` over `targets`
///
/// With a `batch_size` the batch holds exactly that many specs, cycling through
/// the targets in order; otherwise there is one spec per target.
pub fn plan_batch(
    targets: &[Target],
    kind: OperationKind,
    batch_size: Option<usize>,
    payload: &Arc<[u8]>,
    artifact_suffix: &str,
) -> Result<Vec<OperationSpec>> {
    let count = match batch_size {
        Some(size) if !targets.is_empty() => size,
        _ => targets.len(),
    };

    targets
        .iter()
        .cycle()
        .take(count)
        .map(|target| match (kind, target) {
            (OperationKind::Read, Target::Path(path)) => Ok(OperationSpec::read(path.clone())),
            (OperationKind::Write, Target::Path(path)) => Ok(OperationSpec::write(
                artifact_path(path, artifact_suffix),
                payload.clone(),
            )),
            (OperationKind::Request, Target::Url(url)) => Ok(OperationSpec::request(url.clone())),
            (kind, target) => Err(BenchError::Configuration {
                message: format!("cannot plan a {} operation against '{}'", kind, target),
                field: Some("phases".to_string()),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn directory_listing_is_sorted_and_skips_artifacts() {
        let dir = tempdir().unwrap();
        for name in ["file_2.txt", "file_0.txt", "file_1.txt", "file_0.txt_out"] {
            tokio::fs::write(dir.path().join(name), b"A").await.unwrap();
        }
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();

        let source = WorkloadSource::Directory(dir.path().to_path_buf());
        let targets = source.resolve("_out").await.unwrap();

        let names: Vec<String> = targets
            .iter()
            .map(|t| t.as_path().unwrap().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["file_0.txt", "file_1.txt", "file_2.txt"]);
    }

    #[tokio::test]
    async fn empty_directory_is_unavailable() {
        let dir = tempdir().unwrap();
        let source = WorkloadSource::Directory(dir.path().to_path_buf());

        let err = source.resolve("_out").await.unwrap_err();
        assert!(matches!(err, BenchError::WorkloadUnavailable { .. }));
    }

    #[tokio::test]
    async fn missing_directory_is_unavailable() {
        let source = WorkloadSource::Directory(PathBuf::from("/nonexistent/iobench/workload"));

        let err = source.resolve("_out").await.unwrap_err();
        match err {
            BenchError::WorkloadUnavailable { source, .. } => assert!(source.is_some()),
            other => panic!("Expected WorkloadUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn url_list_keeps_duplicates_and_order() {
        let source = WorkloadSource::Urls(vec![
            "http://b.test/".to_string(),
            "http://a.test/".to_string(),
            "http://b.test/".to_string(),
        ]);
        let targets = source.resolve("_out").await.unwrap();
        let urls: Vec<&str> = targets.iter().filter_map(Target::as_url).collect();
        assert_eq!(urls, vec!["http://b.test/", "http://a.test/", "http://b.test/"]);
    }

    #[test]
    fn batch_size_cycles_through_targets() {
        let targets = vec![
            Target::Url("http://a.test/".to_string()),
            Target::Url("http://b.test/".to_string()),
        ];
        let payload: Arc<[u8]> = Arc::from(&b""[..]);

        let specs = plan_batch(&targets, OperationKind::Request, Some(5), &payload, "_out").unwrap();
        let urls: Vec<&str> = specs.iter().filter_map(|s| s.target().as_url()).collect();
        assert_eq!(
            urls,
            vec!["http://a.test/", "http://b.test/", "http://a.test/", "http://b.test/", "http://a.test/"]
        );
    }

    #[test]
    fn write_specs_target_artifacts() {
        let targets = vec![Target::Path(PathBuf::from("test_files/file_0.txt"))];
        let payload: Arc<[u8]> = Arc::from(&b"Test data"[..]);

        let specs = plan_batch(&targets, OperationKind::Write, None, &payload, "_out").unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(
            specs[0].target().as_path(),
            Some(Path::new("test_files/file_0.txt_out"))
        );
        assert_eq!(specs[0].payload(), b"Test data");
    }

    #[test]
    fn mismatched_kind_is_rejected() {
        let targets = vec![Target::Url("http://a.test/".to_string())];
        let payload: Arc<[u8]> = Arc::from(&b""[..]);

        assert!(plan_batch(&targets, OperationKind::Read, None, &payload, "_out").is_err());
    }
}
