use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use super::{
    services::{download, get_info, health, index, job_status, not_found, progress},
    state::{AppState, MediaBackends},
};
use crate::config::Config;
use crate::media::{Ffmpeg, YtDlp, YtDlpConfig};
use crate::progress::spawn_pruner;
use crate::storage;
use crate::worker::{HttpClient, HttpConfig, ThumbnailCache};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

const COOKIE_FILE: &str = "cookies.txt";

/// Build the HTTP router over `state`
pub fn router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();

    Router::new()
        .route("/", get(index))
        .route("/get_info", post(get_info))
        .route("/download", get(download))
        .route("/progress/{video_id}", get(progress))
        .route("/jobs/{video_id}", get(job_status))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;
    let store = storage::ArtifactStore::new(
        config.server.downloads_dir.clone(),
        config.server.thumbnails_dir.clone(),
    );
    store
        .prepare()
        .await
        .map_err(|e| format!("Failed to prepare storage: {e}"))?;

    let cookie_file = resolve_cookie_file(&config).await;

    let ytdlp = Arc::new(YtDlp::new(YtDlpConfig::from_download(
        &config.download,
        cookie_file,
    )));
    if !ytdlp.is_available().await {
        warn!(bin = %config.download.yt_dlp_bin, "yt-dlp not found, every request will fail");
    }

    let ffmpeg = Arc::new(Ffmpeg::new(
        config.download.ffmpeg_bin.clone(),
        config.download.audio_bitrate.clone(),
    ));

    let backends = MediaBackends {
        resolver: ytdlp.clone(),
        fetcher: ytdlp,
        transcoder: ffmpeg,
    };

    let thumbnails = if config.thumbnails.cache {
        let http = HttpClient::new(
            HttpConfig {
                request_timeout: std::time::Duration::from_secs(config.thumbnails.timeout_secs),
                ..HttpConfig::default()
            },
            config.download.proxy.as_deref(),
        )
        .map_err(|e| format!("Failed to build thumbnail client: {e}"))?;
        Some(ThumbnailCache::new(
            http,
            store,
            config.server.static_dir.clone(),
            config.server.thumbnails_dir.clone(),
        ))
    } else {
        None
    };

    let mut state = AppState::new(config, backends);
    if let Some(cache) = thumbnails {
        state = state.with_thumbnails(cache);
    }

    let pruner = spawn_pruner(
        state.registry.clone(),
        state.config.retention.progress_ttl(),
        state.config.retention.prune_interval(),
    );

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "tubefetch listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pruner.abort();
    Ok(())
}

/// Cookie jar for yt-dlp: the base64 secret wins over a configured path
async fn resolve_cookie_file(config: &Config) -> Option<std::path::PathBuf> {
    match &config.download.cookies_b64 {
        Some(encoded) => {
            let path = config
                .download
                .cookie_file
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join(format!("tubefetch-{COOKIE_FILE}")));
            match storage::install_cookies(encoded, &path).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Ignoring YT_COOKIES_B64, only public videos will work");
                    None
                }
            }
        }
        None if config.download.cookie_file.is_some() => config.download.cookie_file.clone(),
        None => {
            warn!("YT_COOKIES_B64 not set, only public videos will work");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
