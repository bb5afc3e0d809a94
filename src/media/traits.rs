use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::MediaError;
use super::types::{FetchRequest, MediaInfo, TransferProgress};

/// Callback invoked for every byte-count report during a transfer
pub type ProgressCallback<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Maps a source URL to metadata without transferring the payload.
///
/// Implementations must return the same `id` for the same source; the id
/// names the output file and keys the progress registry.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, MediaError>;
}

/// Streams the media payload to local storage
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch into `request.output_stem` plus an extension of the fetcher's
    /// choosing and return the written path.
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<PathBuf, MediaError>;
}

/// Converts fetched media to the audio target codec
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn extract_audio(&self, source: &Path, target: &Path) -> Result<(), MediaError>;
}
