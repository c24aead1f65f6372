//! Local artifact storage: an "ongoing" scratch directory and a
//! "completed" directory of finished files.

use crate::error::{Error, Result};
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    ongoing_dir: PathBuf,
    completed_dir: PathBuf,
}

/// A file sitting in one of the store's directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

impl ArtifactStore {
    pub fn new(ongoing_dir: impl Into<PathBuf>, completed_dir: impl Into<PathBuf>) -> Self {
        Self {
            ongoing_dir: ongoing_dir.into(),
            completed_dir: completed_dir.into(),
        }
    }

    /// Create both directories if they are missing.
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.ongoing_dir).await?;
        tokio::fs::create_dir_all(&self.completed_dir).await?;
        Ok(())
    }

    pub fn ongoing_dir(&self) -> &Path {
        &self.ongoing_dir
    }

    pub fn completed_dir(&self) -> &Path {
        &self.completed_dir
    }

    pub fn ongoing_path(&self, name: &str) -> PathBuf {
        self.ongoing_dir.join(name)
    }

    pub fn completed_path(&self, name: &str) -> PathBuf {
        self.completed_dir.join(name)
    }

    /// Maps a client-supplied file name to a path inside the completed
    /// directory, refusing anything that could escape it.
    pub fn resolve_completed(&self, filename: &str) -> Result<PathBuf> {
        resolve_in(&self.completed_dir, filename)
    }

    /// Same checks as `resolve_completed`, for the ongoing directory.
    pub fn resolve_ongoing(&self, filename: &str) -> Result<PathBuf> {
        resolve_in(&self.ongoing_dir, filename)
    }

    /// Size of a completed artifact, 0 when it is missing.
    pub async fn size_of(&self, filename: &str) -> u64 {
        if !is_plain_file_name(filename) {
            return 0;
        }
        tokio::fs::metadata(self.completed_dir.join(filename))
            .await
            .map(|meta| meta.len())
            .unwrap_or(0)
    }

    /// Remove a completed artifact. The job record that produced it is kept.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.resolve_completed(filename)?;
        tokio::fs::remove_file(&path).await?;
        tracing::info!(file = %path.display(), "deleted artifact");
        Ok(())
    }

    /// Move a finished file from the ongoing to the completed directory,
    /// replacing any artifact already stored under `completed_name`.
    pub async fn relocate(&self, ongoing_name: &str, completed_name: &str) -> io::Result<PathBuf> {
        let target = self.completed_path(completed_name);
        tokio::fs::rename(self.ongoing_path(ongoing_name), &target).await?;
        Ok(target)
    }

    /// Best-effort removal of a scratch or partial file.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(file = %path.display(), "removed leftover file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(file = %path.display(), "could not remove file: {}", e),
        }
    }

    pub async fn list_ongoing(&self) -> io::Result<Vec<StoredFile>> {
        list_files(&self.ongoing_dir).await
    }

    pub async fn list_completed(&self) -> io::Result<Vec<StoredFile>> {
        list_files(&self.completed_dir).await
    }
}

fn resolve_in(dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.is_empty() {
        return Err(Error::validation("Filename required"));
    }
    if !is_plain_file_name(filename) {
        return Err(Error::validation("invalid file path"));
    }
    Ok(dir.join(filename))
}

fn is_plain_file_name(name: &str) -> bool {
    if name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

async fn list_files(dir: &Path) -> io::Result<Vec<StoredFile>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if meta.is_file() {
            files.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
            });
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
