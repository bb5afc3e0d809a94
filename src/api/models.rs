//! Request and response shapes of the HTTP API.
//!
//! - `POST /get_info` takes an [`InfoForm`] and answers with [`InfoResponse`]
//! - `GET /download` takes a [`DownloadQuery`] and answers with the file
//! - `GET /progress/{video_id}` streams `FeedEvent`s as server-sent events
//! - `GET /jobs/{video_id}` answers with a `JobProgress` snapshot
//!
//! Every failure is an [`ErrorResponse`]:
//!
//! ```json
//! { "status": "error", "message": "This video is private and cannot be downloaded." }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::observability::MetricsSnapshot;

#[derive(Debug, Deserialize, Clone)]
pub struct InfoForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InfoResponse {
    pub status: String,
    pub title: String,
    /// Remote URL, or a site-relative path when cached locally
    pub thumbnail: Option<String>,
    /// Whole seconds, 0 when unknown
    pub duration: u64,
    pub video_id: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub download_type: Option<String>,
    pub video_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
}
