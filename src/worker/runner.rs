//! Download worker - runs one job from resolution to a finished artifact

use std::path::PathBuf;
use std::sync::Arc;

use bon::Builder;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::humanize::ByteSize;
use crate::media::{
    FetchRequest, MediaError, MediaFetcher, MediaResolver, OutputKind, TransferProgress,
    Transcoder,
};
use crate::observability::Metrics;
use crate::progress::{JobId, Progress, ProgressRegistry};
use crate::storage::{self, ArtifactStore};

const MAX_JOB_ID_LEN: usize = 128;
/// Ceiling for in-flight writes; 100 is reserved for the completion write
const MAX_IN_FLIGHT_PERCENT: f64 = 99.9;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid job: {0}")]
    InvalidInput(String),

    #[error("transcoder is not installed")]
    DependencyUnavailable,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("artifact missing after download: {0}")]
    MissingArtifact(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// One download request
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub url: String,
    pub job_id: JobId,
    pub kind: OutputKind,
}

/// Finished file, ready for delivery
#[derive(Debug, Clone)]
pub struct Artifact {
    pub job_id: JobId,
    pub path: PathBuf,
    pub kind: OutputKind,
    pub title: Option<String>,
    pub size: u64,
}

/// Job ids name files on disk, so only a conservative alphabet is accepted
pub fn is_valid_job_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id.len() <= MAX_JOB_ID_LEN
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Orchestrates resolve, fetch and optional transcode for a job, keeping the
/// progress registry in step.
#[derive(Clone, Builder)]
pub struct DownloadWorker {
    resolver: Arc<dyn MediaResolver>,
    fetcher: Arc<dyn MediaFetcher>,
    transcoder: Arc<dyn Transcoder>,
    registry: Arc<ProgressRegistry>,
    store: ArtifactStore,
    #[builder(default)]
    metrics: Arc<Metrics>,
}

impl DownloadWorker {
    /// Run the job on its own task so the caller going away does not cancel it
    pub fn spawn(&self, job: DownloadJob) -> JoinHandle<Result<Artifact>> {
        let worker = self.clone();
        tokio::spawn(async move { worker.run(job).await })
    }

    /// Run the job to completion.
    ///
    /// Input and dependency checks fail before the registry or the
    /// downloads directory are touched. Every later failure leaves the job's
    /// registry entry at the failure sentinel.
    pub async fn run(&self, job: DownloadJob) -> Result<Artifact> {
        validate_job(&job)?;

        if job.kind.needs_transcode() && !self.transcoder.is_available().await {
            warn!(job_id = %job.job_id, "Transcoder unavailable, refusing audio download");
            return Err(DownloadError::DependencyUnavailable);
        }

        // A previous run of the same id may have left a terminal value behind
        self.registry.set(&job.job_id, Progress::Percent(0.0));
        self.metrics.download_started();
        info!(job_id = %job.job_id, url = %job.url, kind = %job.kind, "Download started");

        match self.execute(&job).await {
            Ok(artifact) => {
                self.registry.set(&job.job_id, Progress::Completed);
                self.metrics.download_completed();
                info!(
                    job_id = %job.job_id,
                    path = %artifact.path.display(),
                    size = %ByteSize(artifact.size),
                    "Download completed"
                );
                Ok(artifact)
            }
            Err(e) => {
                self.registry.set(&job.job_id, Progress::Failed);
                self.metrics.download_failed();
                error!(job_id = %job.job_id, url = %job.url, error = %e, "Download failed");

                let removed = self.store.remove_job_files(&job.job_id).await;
                if removed > 0 {
                    debug!(job_id = %job.job_id, removed, "Removed partial files");
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, job: &DownloadJob) -> Result<Artifact> {
        let info = self.resolver.resolve(&job.url).await?;
        if info.id != job.job_id {
            warn!(job_id = %job.job_id, resolved_id = %info.id, "Resolver returned a different id");
        }

        let reporter = ProgressReporter::new(&self.registry, &job.job_id);

        let target = self.store.artifact_path(&job.job_id, job.kind);
        let request = FetchRequest {
            url: job.url.clone(),
            kind: job.kind,
            output_stem: if job.kind.needs_transcode() {
                self.store.source_stem(&job.job_id)
            } else {
                self.store.artifact_stem(&job.job_id)
            },
        };

        let fetched = self
            .fetcher
            .fetch(&request, &|progress: TransferProgress| reporter.report(progress))
            .await?;

        if job.kind.needs_transcode() {
            self.transcoder.extract_audio(&fetched, &target).await?;
            storage::remove_file(&fetched).await;
        } else if fetched != target {
            tokio::fs::rename(&fetched, &target).await?;
        }

        let size = tokio::fs::metadata(&target)
            .await
            .map_err(|_| DownloadError::MissingArtifact(target.clone()))?
            .len();

        Ok(Artifact {
            job_id: job.job_id.clone(),
            path: target,
            kind: job.kind,
            title: info.title,
            size,
        })
    }
}

fn validate_job(job: &DownloadJob) -> Result<()> {
    if job.url.trim().is_empty() {
        return Err(DownloadError::InvalidInput("url is required".into()));
    }
    if !is_valid_job_id(&job.job_id) {
        return Err(DownloadError::InvalidInput(format!(
            "job id '{}' is empty or contains unsupported characters",
            job.job_id
        )));
    }
    Ok(())
}

/// Turns byte counts into registry writes.
///
/// Percentages never go backwards within a job: a fetch made of several
/// streams (video then audio) restarts its byte counter per stream. They
/// also stay below 100 until the job is actually done.
pub struct ProgressReporter<'a> {
    registry: &'a ProgressRegistry,
    job_id: &'a str,
    high_water: Mutex<Option<f64>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(registry: &'a ProgressRegistry, job_id: &'a str) -> Self {
        Self {
            registry,
            job_id,
            high_water: Mutex::new(None),
        }
    }

    pub fn report(&self, progress: TransferProgress) {
        let percent = Progress::from_bytes(progress.downloaded, progress.total)
            .value()
            .min(MAX_IN_FLIGHT_PERCENT);

        let mut high_water = self.high_water.lock();
        if high_water.is_some_and(|high| percent <= high) {
            return;
        }
        *high_water = Some(percent);
        self.registry.set(self.job_id, Progress::Percent(percent));
    }
}
