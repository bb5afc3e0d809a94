use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub thumbnails: ThumbnailConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Transient artifacts, one file per finished job
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    /// Served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_thumbnails_dir")]
    pub thumbnails_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            downloads_dir: default_downloads_dir(),
            static_dir: default_static_dir(),
            thumbnails_dir: default_thumbnails_dir(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_thumbnails_dir() -> PathBuf {
    PathBuf::from("static/thumbnails")
}

/// External tool and transfer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_yt_dlp_bin")]
    pub yt_dlp_bin: String,
    #[serde(default = "default_ffmpeg_bin")]
    pub ffmpeg_bin: String,
    /// Grace period between starting delivery and deleting the artifact
    #[serde(default = "default_cleanup_delay_secs")]
    pub cleanup_delay_secs: u64,
    #[serde(default = "default_socket_timeout_secs")]
    pub socket_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,
    /// ffmpeg bitrate for mp3 output, e.g. "192k"
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    #[serde(default = "default_max_filesize")]
    pub max_filesize: ByteSize,
    pub proxy: Option<String>,
    /// Netscape cookie jar handed to yt-dlp
    pub cookie_file: Option<PathBuf>,
    /// Base64 cookie jar (loaded from environment, not from config file)
    #[serde(skip)]
    pub cookies_b64: Option<String>,
}

impl DownloadConfig {
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            yt_dlp_bin: default_yt_dlp_bin(),
            ffmpeg_bin: default_ffmpeg_bin(),
            cleanup_delay_secs: default_cleanup_delay_secs(),
            socket_timeout_secs: default_socket_timeout_secs(),
            retries: default_retries(),
            fragment_retries: default_retries(),
            audio_bitrate: default_audio_bitrate(),
            max_filesize: default_max_filesize(),
            proxy: None,
            cookie_file: None,
            cookies_b64: None,
        }
    }
}

fn default_yt_dlp_bin() -> String {
    "yt-dlp".to_string()
}

fn default_ffmpeg_bin() -> String {
    "ffmpeg".to_string()
}

fn default_cleanup_delay_secs() -> u64 {
    10
}

fn default_socket_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    10
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_max_filesize() -> ByteSize {
    ByteSize(2 * 1024 * 1024 * 1024) // 2 GB
}

/// Progress feed settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressConfig {
    /// Fallback poll when no write wakes the feed
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl ProgressConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_keep_alive_secs() -> u64 {
    15
}

/// Retention configuration for registry entries
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionConfig {
    #[serde(default = "default_progress_ttl_secs")]
    pub progress_ttl_secs: u64,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

impl RetentionConfig {
    pub fn progress_ttl(&self) -> Duration {
        Duration::from_secs(self.progress_ttl_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            progress_ttl_secs: default_progress_ttl_secs(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

fn default_progress_ttl_secs() -> u64 {
    3600
}

fn default_prune_interval_secs() -> u64 {
    60
}

/// Local thumbnail caching
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    #[serde(default)]
    pub cache: bool,
    #[serde(default = "default_thumbnail_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache: false,
            timeout_secs: default_thumbnail_timeout_secs(),
        }
    }
}

fn default_thumbnail_timeout_secs() -> u64 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.downloads_dir, PathBuf::from("downloads"));
        assert_eq!(config.download.cleanup_delay(), Duration::from_secs(10));
        assert_eq!(config.progress.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.download.max_filesize.as_u64(), 2 * 1024 * 1024 * 1024);
        assert!(!config.thumbnails.cache);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[download]
cleanup_delay_secs = 30
proxy = "socks5://127.0.0.1:9050"
            "#,
        )
        .unwrap();

        assert_eq!(config.download.cleanup_delay_secs, 30);
        assert_eq!(config.download.proxy.as_deref(), Some("socks5://127.0.0.1:9050"));
        assert_eq!(config.download.yt_dlp_bin, "yt-dlp");
        assert_eq!(config.retention.progress_ttl_secs, 3600);
    }
}
