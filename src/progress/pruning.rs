//! Retention for registry entries
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::ProgressRegistry;

/// Pruning statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub removed: usize,
    pub retained: usize,
}

impl ProgressRegistry {
    /// Evict finished entries not touched within `ttl`
    pub fn prune(&self, ttl: Duration) -> PruneStats {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(ttl)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
        let (removed, retained) = self.retain_recent(cutoff);
        PruneStats { removed, retained }
    }
}

/// Periodically prune the registry until the runtime shuts down
pub fn spawn_pruner(
    registry: Arc<ProgressRegistry>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    info!(ttl_secs = ttl.as_secs(), interval_secs = interval.as_secs(), "Starting progress pruner");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let stats = registry.prune(ttl);
            if stats.removed > 0 {
                info!(removed = stats.removed, retained = stats.retained, "Pruned progress entries");
            } else {
                debug!(retained = stats.retained, "Nothing to prune");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;

    fn aged(registry: &ProgressRegistry, id: &str, progress: Progress) {
        registry.set(id, progress);
        registry.backdate(id, Utc::now() - chrono::Duration::hours(2));
    }

    #[test]
    fn test_prune_removes_old_terminal_entries() {
        let registry = ProgressRegistry::new();
        aged(&registry, "done", Progress::Completed);
        aged(&registry, "broken", Progress::Failed);
        aged(&registry, "idle", Progress::Percent(0.0));
        registry.set("fresh", Progress::Completed);

        let stats = registry.prune(Duration::from_secs(3600));

        assert_eq!(stats, PruneStats { removed: 3, retained: 1 });
        assert!(registry.snapshot("done").is_none());
        assert!(registry.snapshot("fresh").is_some());
    }

    #[test]
    fn test_prune_keeps_in_flight_and_observed_entries() {
        let registry = ProgressRegistry::new();
        aged(&registry, "running", Progress::Percent(40.0));
        let _rx = registry.subscribe("watched");
        registry.backdate("watched", Utc::now() - chrono::Duration::hours(2));

        let stats = registry.prune(Duration::from_secs(3600));

        assert_eq!(stats.removed, 0);
        assert_eq!(registry.get("running"), Progress::Percent(40.0));
        assert!(registry.snapshot("watched").is_some());
    }

    #[tokio::test]
    async fn test_pruner_task_runs() {
        let registry = Arc::new(ProgressRegistry::new());
        aged(&registry, "done", Progress::Completed);

        let handle = spawn_pruner(registry.clone(), Duration::from_secs(60), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(registry.is_empty());
    }
}
