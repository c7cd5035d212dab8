//! Artifact sinks
//!
//! A sink receives every emitted PDF. The filesystem sink writes each body
//! to its own temporary file next to the target and renames it into place,
//! so a reader never observes a half-written document, even when two
//! emissions share a path.

use crate::storage::PdfArtifact;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while persisting an artifact
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Destination for harvested PDFs
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Stores `body` for `artifact`, returning where it was written
    async fn persist(&self, artifact: &PdfArtifact, body: &[u8]) -> Result<PathBuf, SinkError>;

    /// Returns true if the artifact is already stored
    async fn contains(&self, artifact: &PdfArtifact) -> bool;
}

/// Writes artifacts under a root directory, mirroring their URL paths
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of an artifact under this sink's root
    pub fn resolve(&self, artifact: &PdfArtifact) -> PathBuf {
        self.root.join(&artifact.target_path)
    }
}

#[async_trait]
impl ArtifactSink for FsSink {
    async fn persist(&self, artifact: &PdfArtifact, body: &[u8]) -> Result<PathBuf, SinkError> {
        let path = self.resolve(artifact);
        let target = path.clone();
        let body = body.to_vec();

        let written = tokio::task::spawn_blocking(move || write_atomically(&target, &body))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .and_then(|result| result);

        match written {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes, "artifact written");
                Ok(path)
            }
            Err(source) => Err(SinkError::Io { path, source }),
        }
    }

    async fn contains(&self, artifact: &PdfArtifact) -> bool {
        tokio::fs::metadata(self.resolve(artifact))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }
}

/// Writes `body` to a fresh temporary file in the target's directory and
/// renames it over `path`; returns the number of bytes written
///
/// The temporary file is removed if any step fails.
fn write_atomically(path: &Path, body: &[u8]) -> std::io::Result<usize> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(body)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn artifact(s: &str) -> PdfArtifact {
        PdfArtifact::from_url(&Url::parse(s).unwrap())
    }

    #[tokio::test]
    async fn test_persist_creates_directories() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let artifact = artifact("https://example.org/assets/media/2025/03/file.pdf");

        let written = sink.persist(&artifact, b"%PDF-1.7").await.unwrap();

        assert_eq!(
            written,
            dir.path().join("assets/media/2025/03/file.pdf")
        );
        assert_eq!(std::fs::read(&written).unwrap(), b"%PDF-1.7");
        assert_eq!(
            std::fs::read_dir(written.parent().unwrap()).unwrap().count(),
            1
        );
    }

    #[tokio::test]
    async fn test_contains() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let artifact = artifact("https://example.org/a.pdf");

        assert!(!sink.contains(&artifact).await);
        sink.persist(&artifact, b"x").await.unwrap();
        assert!(sink.contains(&artifact).await);
    }

    #[tokio::test]
    async fn test_overwrite() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());
        let artifact = artifact("https://example.org/a.pdf");

        sink.persist(&artifact, b"first").await.unwrap();
        let path = sink.persist(&artifact, b"second").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_write_failure_reports_path() {
        let dir = TempDir::new().unwrap();
        let sink = FsSink::new(dir.path());

        // A file where a directory is needed
        std::fs::write(dir.path().join("blocked"), b"").unwrap();
        let err = sink
            .persist(&artifact("https://example.org/blocked/a.pdf"), b"x")
            .await
            .unwrap_err();

        let SinkError::Io { path, .. } = err;
        assert_eq!(path, dir.path().join("blocked/a.pdf"));
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_same_path() {
        let dir = TempDir::new().unwrap();
        let sink = std::sync::Arc::new(FsSink::new(dir.path()));
        let first = artifact("https://example.org/a.pdf?version=1");
        let second = artifact("https://example.org/a.pdf?version=2");
        assert_eq!(first.target_path, second.target_path);

        let big = vec![b'1'; 4 * 1024 * 1024];
        let small = vec![b'2'; 1024 * 1024];

        for _ in 0..10 {
            let (a, b) = tokio::join!(
                {
                    let sink = sink.clone();
                    let (first, big) = (first.clone(), big.clone());
                    tokio::spawn(async move { sink.persist(&first, &big).await })
                },
                {
                    let sink = sink.clone();
                    let (second, small) = (second.clone(), small.clone());
                    tokio::spawn(async move { sink.persist(&second, &small).await })
                }
            );
            a.unwrap().unwrap();
            b.unwrap().unwrap();

            let stored = std::fs::read(dir.path().join("a.pdf")).unwrap();
            assert!(stored == big || stored == small, "torn write of {} bytes", stored.len());
        }

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("a.pdf")]);
    }
}
