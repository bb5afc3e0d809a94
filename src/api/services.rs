use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    response::{
        Html, IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::{
    delivery,
    error::ApiError,
    models::{DownloadQuery, HealthResponse, InfoForm, InfoResponse},
    state::AppState,
    validation::{
        RequestValidationError, parse_download_type, validate_source_url, validate_video_id,
    },
};
use crate::progress::ProgressFeed;
use crate::worker::{DownloadJob, is_valid_job_id};

const DEFAULT_TITLE: &str = "Untitled video";

/// Landing page (GET /)
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

/// Metadata lookup (POST /get_info)
///
/// Resolves the URL without downloading anything and seeds the progress
/// registry for the returned id, so a progress feed opened right away reads 0.
pub async fn get_info(
    State(state): State<AppState>,
    form: Result<Form<InfoForm>, FormRejection>,
) -> Result<Json<InfoResponse>, ApiError> {
    let Form(form) = form.map_err(|e| {
        debug!(error = %e, "Rejected info form");
        ApiError::from(RequestValidationError::MissingUrl)
    })?;
    let url = validate_source_url(&form.url)?;

    let info = state.resolver.resolve(&url).await?;
    if !is_valid_job_id(&info.id) {
        return Err(ApiError::ResolutionFailed(format!(
            "resolver returned unusable id '{}'",
            info.id
        )));
    }
    state.registry.reset_unless_running(&info.id);

    let thumbnail = match (&state.thumbnails, info.thumbnail) {
        (Some(cache), Some(remote)) => Some(cache.cache(&info.id, &remote).await.unwrap_or(remote)),
        (_, thumbnail) => thumbnail,
    };

    info!(video_id = %info.id, url = %url, "Resolved media info");

    Ok(Json(InfoResponse {
        status: "success".to_string(),
        title: info
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        thumbnail,
        duration: info.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
        video_id: info.id,
    }))
}

/// File download (GET /download?url=&download_type=&video_id=)
///
/// Runs the job to completion and streams the artifact back as an attachment.
/// Removal after the grace delay is scheduled by the job task, whether or not
/// this request is still around to deliver the file.
pub async fn download(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| {
        debug!(error = %e, "Rejected download query");
        ApiError::from(RequestValidationError::MissingDownloadParams)
    })?;

    let (Some(url), Some(video_id)) = (non_blank(&query.url), non_blank(&query.video_id)) else {
        return Err(RequestValidationError::MissingDownloadParams.into());
    };
    let kind = parse_download_type(query.download_type.as_deref())?;
    let url = validate_source_url(url)?;
    let job_id = validate_video_id(video_id)?;

    let handle = delivery::run_with_cleanup(
        state.worker.clone(),
        DownloadJob { url, job_id, kind },
        state.config.download.cleanup_delay(),
        state.metrics.clone(),
    );
    let artifact = handle
        .await
        .map_err(|e| ApiError::Internal(format!("download task ended abnormally: {e}")))??;

    delivery::attachment(&artifact).await
}

/// Progress feed (GET /progress/{video_id})
pub async fn progress(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let video_id = validate_video_id(&video_id)?;
    state.metrics.feed_opened();
    debug!(video_id = %video_id, "Progress feed opened");

    let feed = ProgressFeed::new(
        state.registry.clone(),
        video_id,
        state.config.progress.poll_interval(),
    );
    let events = feed
        .into_stream()
        .map(|event| Event::default().json_data(event));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.config.progress.keep_alive())))
}

/// Job status (GET /jobs/{video_id})
pub async fn job_status(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .registry
        .snapshot(&video_id)
        .ok_or_else(|| ApiError::NotFound(format!("job {video_id}")))?;

    Ok((StatusCode::OK, Json(snapshot)))
}

/// Health check endpoint (GET /health)
///
/// Returns 503 only when the downloads directory is gone. A missing
/// transcoder leaves the service usable for video, so it only degrades.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert(
        "registry".to_string(),
        format!("healthy ({} jobs)", state.registry.len()),
    );

    let storage_ok = tokio::fs::metadata(state.store.downloads_dir())
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    components.insert("storage".to_string(), status_label(storage_ok).to_string());

    let transcoder_ok = state.transcoder.is_available().await;
    components.insert(
        "transcoder".to_string(),
        if transcoder_ok { "healthy" } else { "unavailable" }.to_string(),
    );

    let (overall_status, status_code) = match (storage_ok, transcoder_ok) {
        (false, _) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
        (true, false) => ("degraded", StatusCode::OK),
        (true, true) => ("healthy", StatusCode::OK),
    };
    if !storage_ok {
        warn!(path = %state.store.downloads_dir().display(), "Downloads directory missing");
    }

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}

/// Fallback for unknown routes, keeping the JSON error shape
pub async fn not_found() -> ApiError {
    ApiError::NotFound("route".to_string())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn status_label(ok: bool) -> &'static str {
    if ok { "healthy" } else { "unhealthy" }
}
