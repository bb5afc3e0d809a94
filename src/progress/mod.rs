//! Download progress tracking
//!
//! The [`ProgressRegistry`] is the single source of truth for how far along
//! each job is. Download workers write into it; progress feeds read from it
//! and wake on every write.
//!
//! ## Key Components
//!
//! - [`Progress`] - Value stored per job (percent, completed, failed)
//! - [`ProgressRegistry`] - Lock-guarded map from job id to progress
//! - [`ProgressFeed`] - Change-only event sequence for one observer
//! - [`spawn_pruner`] - Background eviction of finished entries

mod feed;
mod pruning;
mod registry;

pub use feed::{FeedEvent, ProgressFeed};
pub use pruning::{PruneStats, spawn_pruner};
pub use registry::{JobProgress, ProgressRegistry};

use serde::{Serialize, Serializer};

/// Opaque job identifier, supplied by the media resolver
pub type JobId = String;

/// Progress of a single download job
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// Percent of bytes transferred so far
    Percent(f64),
    /// Transfer finished, file ready or already delivered
    Completed,
    /// Job failed
    Failed,
}

impl Progress {
    pub const COMPLETED_VALUE: f64 = 100.0;
    pub const FAILED_VALUE: f64 = -1.0;

    /// Percent from a byte-count report.
    ///
    /// An unknown or zero total yields `0.0`.
    pub fn from_bytes(downloaded: u64, total: Option<u64>) -> Self {
        match total {
            Some(total) if total > 0 => {
                let percent = downloaded as f64 / total as f64 * 100.0;
                Progress::Percent(percent.clamp(0.0, 100.0))
            }
            _ => Progress::Percent(0.0),
        }
    }

    /// Numeric representation exposed to clients
    pub fn value(&self) -> f64 {
        match self {
            Progress::Percent(p) => *p,
            Progress::Completed => Self::COMPLETED_VALUE,
            Progress::Failed => Self::FAILED_VALUE,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Progress::Completed | Progress::Failed)
    }

    pub fn state(&self) -> &'static str {
        match self {
            Progress::Percent(_) => "in_progress",
            Progress::Completed => "completed",
            Progress::Failed => "failed",
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Progress::Percent(0.0)
    }
}

impl Serialize for Progress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Progress::Percent(p) => serializer.serialize_f64(*p),
            Progress::Completed => serializer.serialize_u64(100),
            Progress::Failed => serializer.serialize_i64(-1),
        }
    }
}
