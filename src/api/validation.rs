use reqwest::Url;
use thiserror::Error;

use crate::media::OutputKind;
use crate::worker::is_valid_job_id;

#[derive(Debug, Error, PartialEq)]
pub enum RequestValidationError {
    #[error("Please enter a video URL")]
    MissingUrl,
    #[error("URL and video ID required")]
    MissingDownloadParams,
    #[error("Unsupported download type")]
    UnsupportedDownloadType,
    #[error("Invalid video ID")]
    InvalidVideoId,
    #[error("url '{0}' must be an absolute http/https url")]
    InvalidUrl(String),
}

/// Trimmed source URL, rejected unless it is absolute http(s) with a host
pub fn validate_source_url(raw: &str) -> Result<String, RequestValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RequestValidationError::MissingUrl);
    }

    let parsed = Url::parse(trimmed)
        .map_err(|_| RequestValidationError::InvalidUrl(trimmed.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(RequestValidationError::InvalidUrl(trimmed.to_string()));
    }

    Ok(trimmed.to_string())
}

pub fn validate_video_id(raw: &str) -> Result<String, RequestValidationError> {
    let trimmed = raw.trim();
    if !is_valid_job_id(trimmed) {
        return Err(RequestValidationError::InvalidVideoId);
    }
    Ok(trimmed.to_string())
}

/// Missing or blank means mp4
pub fn parse_download_type(raw: Option<&str>) -> Result<OutputKind, RequestValidationError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(OutputKind::default()),
        Some(value) => value
            .parse()
            .map_err(|_| RequestValidationError::UnsupportedDownloadType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_source_url_accepts_http_and_https() {
        assert_eq!(
            validate_source_url("  https://www.youtube.com/watch?v=abc ").unwrap(),
            "https://www.youtube.com/watch?v=abc"
        );
        assert!(validate_source_url("http://youtu.be/abc").is_ok());
    }

    #[test]
    fn validate_source_url_rejects_garbage() {
        assert_eq!(validate_source_url("   "), Err(RequestValidationError::MissingUrl));
        assert!(matches!(
            validate_source_url("not a url"),
            Err(RequestValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_source_url("ftp://example.com/video"),
            Err(RequestValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_source_url("file:///etc/passwd"),
            Err(RequestValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn validate_video_id_rejects_paths() {
        assert_eq!(validate_video_id(" abc123 ").unwrap(), "abc123");
        assert_eq!(
            validate_video_id("../../etc/passwd"),
            Err(RequestValidationError::InvalidVideoId)
        );
    }

    #[test]
    fn parse_download_type_defaults_to_mp4() {
        assert_eq!(parse_download_type(None).unwrap(), OutputKind::Mp4);
        assert_eq!(parse_download_type(Some("")).unwrap(), OutputKind::Mp4);
        assert_eq!(parse_download_type(Some("MP3")).unwrap(), OutputKind::Mp3);
        assert_eq!(
            parse_download_type(Some("flac")),
            Err(RequestValidationError::UnsupportedDownloadType)
        );
    }
}
