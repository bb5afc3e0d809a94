//! Download worker service
//!
//! One job task per in-flight request. The worker resolves
//! the source, fetches it into the downloads directory, transcodes when audio
//! was requested, and writes progress into the shared registry throughout.

pub mod http;
pub mod runner;

pub use http::{HttpClient, HttpConfig, ThumbnailCache};
pub use runner::{
    Artifact, DownloadError, DownloadJob, DownloadWorker, ProgressReporter, is_valid_job_id,
};
