use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use super::error::MediaError;
use super::traits::Transcoder;

/// Audio extraction through the ffmpeg executable
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    bin: String,
    bitrate: String,
}

impl Ffmpeg {
    pub fn new(bin: impl Into<String>, bitrate: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            bitrate: bitrate.into(),
        }
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn is_available(&self) -> bool {
        Command::new(&self.bin)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn extract_audio(&self, source: &Path, target: &Path) -> Result<(), MediaError> {
        info!(source = %source.display(), target = %target.display(), bitrate = %self.bitrate, "Extracting audio");

        let output = Command::new(&self.bin)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(source)
            .args(["-vn", "-codec:a", "libmp3lame", "-b:a"])
            .arg(&self.bitrate)
            .arg(target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MediaError::Transcode(format!("failed to launch {}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "ffmpeg failed");
            return Err(MediaError::Transcode(stderr.trim().to_string()));
        }

        Ok(())
    }
}
