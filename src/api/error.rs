use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::{error, warn};

use super::models::ErrorResponse;
use super::validation::RequestValidationError;
use crate::media::MediaError;
use crate::worker::DownloadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("media unavailable")]
    Unavailable,
    #[error("media is private")]
    Private,
    #[error("media requires login")]
    LoginRequired,
    #[error("media is age restricted")]
    AgeRestricted,
    #[error("media is restricted by copyright")]
    Copyright,
    #[error("transcoder unavailable")]
    DependencyUnavailable,
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ApiError::DependencyUnavailable => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Unavailable => StatusCode::NOT_FOUND,
            ApiError::Private
            | ApiError::LoginRequired
            | ApiError::AgeRestricted
            | ApiError::Copyright => StatusCode::FORBIDDEN,
            ApiError::ResolutionFailed(_)
            | ApiError::DownloadFailed(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the user; never includes tool output
    pub fn user_message(&self) -> String {
        match self {
            ApiError::InvalidInput(message) => message.clone(),
            ApiError::InvalidUrl(_) => {
                "That does not look like a supported video URL. Please check the link and try again."
                    .to_string()
            }
            ApiError::NotFound(what) => format!("Not found: {what}"),
            ApiError::Unavailable => {
                "This video is not available in your region or has been removed.".to_string()
            }
            ApiError::Private => "This video is private and cannot be downloaded.".to_string(),
            ApiError::LoginRequired => {
                "This video requires login. Please try a different link.".to_string()
            }
            ApiError::AgeRestricted => {
                "This video is age restricted and cannot be downloaded.".to_string()
            }
            ApiError::Copyright => "This video is restricted due to copyright.".to_string(),
            ApiError::DependencyUnavailable => {
                "FFmpeg is required for MP3 conversion".to_string()
            }
            ApiError::ResolutionFailed(_) => {
                "Could not fetch video information. Please try again later.".to_string()
            }
            ApiError::DownloadFailed(_) => {
                "An error occurred while trying to download the video. Please check the URL and try again."
                    .to_string()
            }
            ApiError::Internal(_) => "Internal server error. Please try again later.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            status: "error",
            message: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(value: RequestValidationError) -> Self {
        match value {
            RequestValidationError::InvalidUrl(url) => ApiError::InvalidUrl(url),
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(value: MediaError) -> Self {
        match value {
            MediaError::InvalidUrl(message) => ApiError::InvalidUrl(message),
            MediaError::Unavailable => ApiError::Unavailable,
            MediaError::Private => ApiError::Private,
            MediaError::LoginRequired => ApiError::LoginRequired,
            MediaError::AgeRestricted => ApiError::AgeRestricted,
            MediaError::Copyright => ApiError::Copyright,
            MediaError::Transcode(message) => ApiError::DownloadFailed(message),
            MediaError::Transient(message) => ApiError::ResolutionFailed(message),
            MediaError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(value: DownloadError) -> Self {
        match value {
            DownloadError::InvalidInput(message) => ApiError::InvalidInput(message),
            DownloadError::DependencyUnavailable => ApiError::DependencyUnavailable,
            // Past resolution, anything unclassified is a transfer failure
            DownloadError::Media(MediaError::Transient(message)) => ApiError::DownloadFailed(message),
            DownloadError::Media(MediaError::Io(e)) | DownloadError::Io(e) => {
                ApiError::DownloadFailed(e.to_string())
            }
            DownloadError::Media(other) => other.into(),
            DownloadError::MissingArtifact(path) => {
                ApiError::DownloadFailed(format!("missing artifact {}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::InvalidUrl("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::DependencyUnavailable.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unavailable.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Private.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::AgeRestricted.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::ResolutionFailed("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_transient_maps_by_phase() {
        let during_resolve: ApiError = MediaError::Transient("503".into()).into();
        assert!(matches!(during_resolve, ApiError::ResolutionFailed(_)));

        let during_download: ApiError =
            DownloadError::Media(MediaError::Transient("503".into())).into();
        assert!(matches!(during_download, ApiError::DownloadFailed(_)));

        let restricted: ApiError = DownloadError::Media(MediaError::LoginRequired).into();
        assert!(matches!(restricted, ApiError::LoginRequired));
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = ApiError::DownloadFailed("ERROR: secret tool output".into());
        assert!(!err.user_message().contains("secret"));
    }
}
