use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use serde::Serialize;
use tokio::sync::watch;

use super::{JobId, Progress, ProgressRegistry};

/// One message pushed to a progress observer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEvent {
    pub progress: Progress,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub completed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl From<Progress> for FeedEvent {
    fn from(progress: Progress) -> Self {
        Self {
            progress,
            completed: progress == Progress::Completed,
            failed: progress == Progress::Failed,
        }
    }
}

/// Change-only view of one job's progress.
///
/// Each feed keeps its own cursor, so any number of observers can follow the
/// same job. The current value is always emitted first; after that an event
/// is produced only when the registry value differs from the last one sent.
/// The feed ends after a terminal event.
pub struct ProgressFeed {
    registry: Arc<ProgressRegistry>,
    job_id: JobId,
    changes: watch::Receiver<Progress>,
    poll_interval: Duration,
    last: Option<Progress>,
    finished: bool,
}

impl ProgressFeed {
    pub fn new(
        registry: Arc<ProgressRegistry>,
        job_id: impl Into<JobId>,
        poll_interval: Duration,
    ) -> Self {
        let job_id = job_id.into();
        let changes = registry.subscribe(&job_id);
        Self {
            registry,
            job_id,
            changes,
            poll_interval,
            last: None,
            finished: false,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Wait for the next change, or `None` once a terminal event was sent
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        loop {
            if self.finished {
                return None;
            }

            self.changes.borrow_and_update();
            let current = self.registry.get(&self.job_id);

            if self.last != Some(current) {
                self.last = Some(current);
                self.finished = current.is_terminal();
                return Some(FeedEvent::from(current));
            }

            // Writes wake us early; the interval covers a dropped channel.
            match tokio::time::timeout(self.poll_interval, self.changes.changed()).await {
                Ok(Ok(())) | Err(_) => {}
                Ok(Err(_)) => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = FeedEvent> + Send + 'static {
        futures::stream::unfold(self, |mut feed| async move {
            feed.next_event().await.map(|event| (event, feed))
        })
    }
}
