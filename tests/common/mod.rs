//! Fake media backends shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use tubefetch::api::MediaBackends;
use tubefetch::config::Config;
use tubefetch::media::{
    FetchRequest, MediaError, MediaFetcher, MediaInfo, MediaResolver, OutputKind,
    ProgressCallback, TransferProgress, Transcoder,
};

pub const VIDEO_ID: &str = "abc123";
pub const PAYLOAD: &[u8] = b"fake media payload";

/// Resolves every URL to the same video, except a few magic paths that fail
pub struct FakeResolver {
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if url.contains("/unsupported") {
            return Err(MediaError::InvalidUrl(url.to_string()));
        }
        if url.contains("/private") {
            return Err(MediaError::Private);
        }
        if url.contains("/gone") {
            return Err(MediaError::Unavailable);
        }
        if url.contains("/flaky") {
            return Err(MediaError::Transient("HTTP Error 503".to_string()));
        }

        Ok(MediaInfo {
            id: VIDEO_ID.to_string(),
            title: Some("Test Video: Part 1".to_string()),
            thumbnail: Some("https://i.example.com/abc123.jpg".to_string()),
            duration: Some(212.4),
        })
    }
}

/// Writes a small payload, reporting progress along the way.
///
/// `steps` are (downloaded, total) pairs; each one pauses for `step_delay`
/// so progress feeds have time to observe it.
pub struct FakeFetcher {
    pub steps: Vec<(u64, Option<u64>)>,
    pub step_delay: Duration,
    pub fail_with: Option<fn() -> MediaError>,
}

impl Default for FakeFetcher {
    fn default() -> Self {
        Self {
            steps: vec![(50, Some(200)), (200, Some(200))],
            step_delay: Duration::ZERO,
            fail_with: None,
        }
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<PathBuf, MediaError> {
        let extension = match request.kind {
            OutputKind::Mp4 => "mp4",
            OutputKind::Mp3 => "webm",
        };
        let path = PathBuf::from(format!("{}.{extension}", request.output_stem.display()));
        tokio::fs::write(&path, PAYLOAD).await?;

        for &(downloaded, total) in &self.steps {
            on_progress(TransferProgress { downloaded, total });
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
        }

        match self.fail_with {
            Some(make_error) => Err(make_error()),
            None => Ok(path),
        }
    }
}

/// Copies the source to the target instead of encoding
pub struct FakeTranscoder {
    pub available: bool,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn extract_audio(&self, source: &Path, target: &Path) -> Result<(), MediaError> {
        tokio::fs::copy(source, target).await?;
        Ok(())
    }
}

pub fn backends(fetcher: FakeFetcher, transcoder_available: bool) -> MediaBackends {
    MediaBackends {
        resolver: Arc::new(FakeResolver::new()),
        fetcher: Arc::new(fetcher),
        transcoder: Arc::new(FakeTranscoder { available: transcoder_available }),
    }
}

/// Default config rooted in `dir`, with short timings
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.server.downloads_dir = dir.path().join("downloads");
    config.server.static_dir = dir.path().join("static");
    config.server.thumbnails_dir = dir.path().join("static/thumbnails");
    config.download.cleanup_delay_secs = 1;
    config.progress.poll_interval_ms = 20;
    config.progress.keep_alive_secs = 1;
    config
}
