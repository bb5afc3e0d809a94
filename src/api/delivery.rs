//! Streaming finished artifacts back to the client and deleting them afterwards

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::error::ApiError;
use super::utils::{content_disposition, display_filename, download_filename};
use crate::observability::Metrics;
use crate::storage;
use crate::worker::{Artifact, DownloadError, DownloadJob, DownloadWorker};

/// Open the artifact and wrap it in an attachment response
pub async fn attachment(artifact: &Artifact) -> Result<Response, ApiError> {
    let file = tokio::fs::File::open(&artifact.path)
        .await
        .map_err(|e| ApiError::DownloadFailed(format!("open {}: {e}", artifact.path.display())))?;

    let filename = download_filename(artifact.title.as_deref(), &artifact.job_id, artifact.kind);
    let display_name = display_filename(artifact.title.as_deref(), artifact.kind);
    let disposition = HeaderValue::from_str(&content_disposition(&filename, display_name.as_deref()))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    debug!(job_id = %artifact.job_id, filename = %filename, size = artifact.size, "Streaming artifact");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.kind.content_type())
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, artifact.size)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Run `job` on its own task and schedule removal of the artifact it produces.
///
/// The removal is scheduled from the task itself, so it still happens when
/// the caller stops waiting before the job finishes.
pub fn run_with_cleanup(
    worker: DownloadWorker,
    job: DownloadJob,
    delay: Duration,
    metrics: Arc<Metrics>,
) -> JoinHandle<Result<Artifact, DownloadError>> {
    tokio::spawn(async move {
        let artifact = worker.run(job).await?;
        schedule_cleanup(artifact.path.clone(), delay, metrics);
        Ok(artifact)
    })
}

/// Delete `path` once `delay` has passed.
///
/// An already open file handle keeps streaming after the unlink on unix.
pub fn schedule_cleanup(path: PathBuf, delay: Duration, metrics: Arc<Metrics>) -> JoinHandle<()> {
    info!(path = %path.display(), delay_secs = delay.as_secs_f64(), "Scheduled artifact removal");
    tokio::spawn(async move {
        if storage::remove_after(path, delay).await {
            metrics.artifact_removed();
        }
    })
}
