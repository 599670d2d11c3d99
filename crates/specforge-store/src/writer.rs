//! Artifact writer implementations.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specforge_core::{Result, SpecForgeError};
use tokio::sync::RwLock;
use tracing::debug;

/// Trait for artifact storage.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Write `content` to `path`, creating parent directories as needed.
    /// An existing file is replaced.
    async fn persist(&self, path: &Path, content: &str) -> Result<()>;

    /// Read back what was stored at `path`.
    async fn read(&self, path: &Path) -> Result<Option<String>>;
}

fn persistence_error(path: &Path, err: impl std::fmt::Display) -> SpecForgeError {
    SpecForgeError::Persistence {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// Writes artifacts to the local filesystem.
///
/// Relative paths are resolved against the root (the working directory by
/// default); absolute paths are used as given.
#[derive(Debug, Clone, Default)]
pub struct FsArtifactWriter {
    root: PathBuf,
}

impl FsArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl ArtifactWriter for FsArtifactWriter {
    async fn persist(&self, path: &Path, content: &str) -> Result<()> {
        let full = self.resolve(path);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| persistence_error(path, e))?;
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| persistence_error(path, e))?;

        debug!(path = %full.display(), bytes = content.len(), "wrote artifact");
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.resolve(path)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence_error(path, e)),
        }
    }
}

/// One stored version of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub content: String,

    /// Version number (monotonically increasing across the store).
    pub version: u64,

    pub written_at: DateTime<Utc>,
}

/// In-memory writer that keeps every version written to each path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactWriter {
    files: Arc<RwLock<HashMap<PathBuf, Vec<StoredFile>>>>,
    version: Arc<RwLock<u64>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryArtifactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to a file with this name fail.
    pub async fn fail_on(&self, file_name: impl Into<String>) {
        self.failing.write().await.insert(file_name.into());
    }

    /// All versions written to `path`, oldest first.
    pub async fn history(&self, path: &Path) -> Vec<StoredFile> {
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default()
    }

    /// Paths with at least one write, sorted.
    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    async fn next_version(&self) -> u64 {
        let mut version = self.version.write().await;
        *version += 1;
        *version
    }
}

#[async_trait]
impl ArtifactWriter for InMemoryArtifactWriter {
    async fn persist(&self, path: &Path, content: &str) -> Result<()> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.read().await.contains(&name) {
            return Err(persistence_error(path, "write rejected"));
        }

        let version = self.next_version().await;
        self.files
            .write()
            .await
            .entry(path.to_path_buf())
            .or_default()
            .push(StoredFile {
                content: content.to_string(),
                version,
                written_at: Utc::now(),
            });
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<String>> {
        Ok(self
            .files
            .read()
            .await
            .get(path)
            .and_then(|versions| versions.last())
            .map(|file| file.content.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsArtifactWriter::new(dir.path());
        let path = Path::new("task-tracker/10-requirements.md");

        writer.persist(path, "# Requirements\n- REQ-001: 한글").await.unwrap();

        assert_eq!(
            writer.read(path).await.unwrap().as_deref(),
            Some("# Requirements\n- REQ-001: 한글")
        );
        assert!(dir.path().join("task-tracker").is_dir());
    }

    #[tokio::test]
    async fn test_fs_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsArtifactWriter::new(dir.path());
        let path = Path::new("p/trace.yaml");

        writer.persist(path, "old").await.unwrap();
        writer.persist(path, "new").await.unwrap();
        assert_eq!(writer.read(path).await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_fs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = FsArtifactWriter::new(dir.path());
        assert!(writer.read(Path::new("nope.md")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_failure_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        // a file where a directory is needed
        std::fs::write(dir.path().join("blocked"), "x").unwrap();
        let writer = FsArtifactWriter::new(dir.path());

        let err = writer
            .persist(Path::new("blocked/10-requirements.md"), "content")
            .await
            .unwrap_err();
        match err {
            SpecForgeError::Persistence { path, .. } => {
                assert_eq!(path, "blocked/10-requirements.md")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_memory_versions() {
        let writer = InMemoryArtifactWriter::new();
        let path = Path::new("p/20-architecture.md");

        writer.persist(path, "v1").await.unwrap();
        writer.persist(path, "v2").await.unwrap();

        let history = writer.history(path).await;
        assert_eq!(history.len(), 2);
        assert!(history[1].version > history[0].version);
        assert_eq!(writer.read(path).await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_memory_failure_injection() {
        let writer = InMemoryArtifactWriter::new();
        writer.fail_on("30-backlog.yaml").await;

        assert!(writer.persist(Path::new("p/30-backlog.yaml"), "x").await.is_err());
        assert!(writer.persist(Path::new("p/trace.yaml"), "x").await.is_ok());
        assert_eq!(writer.paths().await, vec![PathBuf::from("p/trace.yaml")]);
    }
}
