use std::sync::Arc;

use crate::config::Config;
use crate::media::{MediaFetcher, MediaResolver, Transcoder};
use crate::observability::Metrics;
use crate::progress::ProgressRegistry;
use crate::storage::ArtifactStore;
use crate::worker::{DownloadWorker, ThumbnailCache};

/// External tool implementations the service runs on
#[derive(Clone)]
pub struct MediaBackends {
    pub resolver: Arc<dyn MediaResolver>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub transcoder: Arc<dyn Transcoder>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ProgressRegistry>,
    pub resolver: Arc<dyn MediaResolver>,
    pub transcoder: Arc<dyn Transcoder>,
    pub worker: DownloadWorker,
    pub store: ArtifactStore,
    pub thumbnails: Option<ThumbnailCache>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(config: Config, backends: MediaBackends) -> Self {
        let registry = Arc::new(ProgressRegistry::new());
        let metrics = Arc::new(Metrics::new());
        let store = ArtifactStore::new(
            config.server.downloads_dir.clone(),
            config.server.thumbnails_dir.clone(),
        );

        let worker = DownloadWorker::builder()
            .resolver(backends.resolver.clone())
            .fetcher(backends.fetcher)
            .transcoder(backends.transcoder.clone())
            .registry(registry.clone())
            .store(store.clone())
            .metrics(metrics.clone())
            .build();

        Self {
            config: Arc::new(config),
            registry,
            resolver: backends.resolver,
            transcoder: backends.transcoder,
            worker,
            store,
            thumbnails: None,
            metrics,
        }
    }

    /// Serve cached thumbnails instead of remote URLs
    pub fn with_thumbnails(mut self, cache: ThumbnailCache) -> Self {
        self.thumbnails = Some(cache);
        self
    }
}
