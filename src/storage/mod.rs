//! Local storage for download artifacts and cached thumbnails
//!
//! Every path is namespaced by job id, so concurrent jobs never share a file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::media::OutputKind;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cookie blob is not valid base64: {0}")]
    InvalidCookies(#[from] base64::DecodeError),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Directory layout for transient files
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    downloads_dir: PathBuf,
    thumbnails_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(downloads_dir: impl Into<PathBuf>, thumbnails_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
        }
    }

    /// Create the download and thumbnail directories if missing
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.downloads_dir).await?;
        tokio::fs::create_dir_all(&self.thumbnails_dir).await?;
        info!(
            downloads = %self.downloads_dir.display(),
            thumbnails = %self.thumbnails_dir.display(),
            "Storage directories ready"
        );
        Ok(())
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// `downloads/{job_id}` without extension
    pub fn artifact_stem(&self, job_id: &str) -> PathBuf {
        self.downloads_dir.join(job_id)
    }

    /// `downloads/{job_id}.{ext}`
    pub fn artifact_path(&self, job_id: &str, kind: OutputKind) -> PathBuf {
        self.downloads_dir
            .join(format!("{job_id}.{}", kind.extension()))
    }

    /// Stem for the intermediate file fed to the transcoder
    pub fn source_stem(&self, job_id: &str) -> PathBuf {
        self.downloads_dir.join(format!("{job_id}.source"))
    }

    pub fn thumbnail_path(&self, job_id: &str) -> PathBuf {
        self.thumbnails_dir.join(format!("{job_id}.jpg"))
    }

    /// Remove every file belonging to `job_id`; returns how many went away
    pub async fn remove_job_files(&self, job_id: &str) -> usize {
        let prefix = format!("{job_id}.");
        let mut removed = 0;

        let mut entries = match tokio::fs::read_dir(&self.downloads_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(job_id, error = %e, "Cannot list downloads directory");
                return 0;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) && remove_file(&entry.path()).await {
                removed += 1;
            }
        }

        removed
    }
}

/// Delete `path`, treating an already missing file as nothing to do
pub async fn remove_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Deleted file");
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "File already gone");
            false
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}

/// Wait for `delay`, then delete `path`
pub async fn remove_after(path: PathBuf, delay: Duration) -> bool {
    tokio::time::sleep(delay).await;
    remove_file(&path).await
}

/// Decode a base64 cookie jar and write it to `path`
pub async fn install_cookies(encoded: &str, path: &Path) -> Result<PathBuf> {
    let decoded = STANDARD.decode(encoded.trim())?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, &decoded).await?;

    info!(path = %path.display(), size = decoded.len(), "Installed cookie file");
    Ok(path.to_path_buf())
}
