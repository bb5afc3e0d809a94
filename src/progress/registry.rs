use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use super::{JobId, Progress};

struct Entry {
    progress: Progress,
    updated_at: DateTime<Utc>,
    notify: watch::Sender<Progress>,
}

impl Entry {
    fn new(progress: Progress) -> Self {
        let (notify, _) = watch::channel(progress);
        Self {
            progress,
            updated_at: Utc::now(),
            notify,
        }
    }
}

/// Point-in-time view of one job's registry entry
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub video_id: JobId,
    pub progress: Progress,
    pub state: &'static str,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

/// Shared map from job id to progress
///
/// All reads and writes go through one lock, held only for the map access.
/// Every entry carries a watch channel so feeds can wait for the next write
/// instead of spinning.
#[derive(Default)]
pub struct ProgressRegistry {
    entries: Mutex<HashMap<JobId, Entry>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the progress for `job_id` and wake its observers
    pub fn set(&self, job_id: &str, progress: Progress) {
        let mut entries = self.entries.lock();
        match entries.get_mut(job_id) {
            Some(entry) => {
                entry.progress = progress;
                entry.updated_at = Utc::now();
                entry.notify.send_replace(progress);
            }
            None => {
                entries.insert(job_id.to_string(), Entry::new(progress));
            }
        }
        debug!(job_id, progress = progress.value(), "Progress updated");
    }

    /// Last value written for `job_id`, or 0 when nothing was written
    pub fn get(&self, job_id: &str) -> Progress {
        self.entries
            .lock()
            .get(job_id)
            .map(|entry| entry.progress)
            .unwrap_or_default()
    }

    /// Put `job_id` back at 0 unless a transfer is running for it.
    ///
    /// Unknown and finished jobs are reset so a new feed starts from 0;
    /// in-flight percentages are left alone.
    pub fn reset_unless_running(&self, job_id: &str) {
        let mut entries = self.entries.lock();
        match entries.get_mut(job_id) {
            Some(entry) if entry.progress.is_terminal() => {
                entry.progress = Progress::default();
                entry.updated_at = Utc::now();
                entry.notify.send_replace(Progress::default());
                debug!(job_id, "Finished job reset to 0");
            }
            Some(_) => {}
            None => {
                entries.insert(job_id.to_string(), Entry::new(Progress::default()));
            }
        }
    }

    /// Receiver that observes every subsequent write for `job_id`.
    ///
    /// Creates a zero entry when the job has not been seen yet.
    pub fn subscribe(&self, job_id: &str) -> watch::Receiver<Progress> {
        self.entries
            .lock()
            .entry(job_id.to_string())
            .or_insert_with(|| Entry::new(Progress::default()))
            .notify
            .subscribe()
    }

    pub fn snapshot(&self, job_id: &str) -> Option<JobProgress> {
        self.entries.lock().get(job_id).map(|entry| JobProgress {
            video_id: job_id.to_string(),
            progress: entry.progress,
            state: entry.progress.state(),
            updated_at: entry.updated_at,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove entries last touched before `cutoff` that nobody is waiting on.
    ///
    /// In-flight entries (non-zero percent) are kept regardless of age.
    pub(super) fn retain_recent(&self, cutoff: DateTime<Utc>) -> (usize, usize) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| {
            if entry.updated_at >= cutoff {
                return true;
            }
            match entry.progress {
                Progress::Completed | Progress::Failed => false,
                Progress::Percent(p) if p == 0.0 => entry.notify.receiver_count() > 0,
                Progress::Percent(_) => true,
            }
        });
        let retained = entries.len();
        (before - retained, retained)
    }

    #[cfg(test)]
    pub(super) fn backdate(&self, job_id: &str, updated_at: DateTime<Utc>) {
        if let Some(entry) = self.entries.lock().get_mut(job_id) {
            entry.updated_at = updated_at;
        }
    }
}
