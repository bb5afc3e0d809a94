use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} must be positive")]
    ZeroDuration { field: &'static str },

    #[error("{field} must name an executable")]
    EmptyBinary { field: &'static str },

    #[error("audio_bitrate '{0}' must look like '192k'")]
    InvalidAudioBitrate(String),

    #[error("max_filesize must be positive")]
    ZeroMaxFilesize,

    #[error("downloads_dir must not be empty")]
    EmptyDownloadsDir,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_server(config)?;
    validate_download(config)?;
    validate_timings(config)?;
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.downloads_dir.as_os_str().is_empty() {
        return Err(ValidationError::EmptyDownloadsDir);
    }
    Ok(())
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    let download = &config.download;

    if download.yt_dlp_bin.trim().is_empty() {
        return Err(ValidationError::EmptyBinary { field: "yt_dlp_bin" });
    }
    if download.ffmpeg_bin.trim().is_empty() {
        return Err(ValidationError::EmptyBinary { field: "ffmpeg_bin" });
    }

    let bitrate = download.audio_bitrate.trim();
    let digits = bitrate.strip_suffix(['k', 'K']).unwrap_or("");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidAudioBitrate(
            download.audio_bitrate.clone(),
        ));
    }

    if download.max_filesize.as_u64() == 0 {
        return Err(ValidationError::ZeroMaxFilesize);
    }

    Ok(())
}

/// Every interval and delay must be non-zero
fn validate_timings(config: &Config) -> Result<(), ValidationError> {
    let checks = [
        ("cleanup_delay_secs", config.download.cleanup_delay_secs),
        ("socket_timeout_secs", config.download.socket_timeout_secs),
        ("poll_interval_ms", config.progress.poll_interval_ms),
        ("keep_alive_secs", config.progress.keep_alive_secs),
        ("progress_ttl_secs", config.retention.progress_ttl_secs),
        ("prune_interval_secs", config.retention.prune_interval_secs),
        ("thumbnails.timeout_secs", config.thumbnails.timeout_secs),
    ];

    for (field, value) in checks {
        if value == 0 {
            return Err(ValidationError::ZeroDuration { field });
        }
    }

    Ok(())
}
