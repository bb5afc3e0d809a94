//! HTTP client for fetching thumbnails into the local static directory

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Proxy};
use thiserror::Error;
use tracing::{debug, warn};

use crate::storage::ArtifactStore;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
    pub referer: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
            user_agent: "Mozilla/5.0".to_string(),
            referer: Some("https://www.youtube.com/".to_string()),
        }
    }
}

/// Small single-shot downloader
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig, proxy_url: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(url) = proxy_url {
            let proxy = Proxy::all(url)
                .map_err(|e| FetchError::InvalidUrl(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// GET `url` and return the body
    pub async fn get(&self, url: &str) -> Result<Bytes> {
        debug!(url, "Fetching");

        let mut request = self.client.get(url);
        if let Some(referer) = &self.config.referer {
            request = request.header(reqwest::header::REFERER, referer);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_builder() {
                FetchError::InvalidUrl(e.to_string())
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::RequestFailed(format!("Failed to read body: {}", e)))
    }
}

/// Copies remote thumbnails under the static directory
#[derive(Debug, Clone)]
pub struct ThumbnailCache {
    client: HttpClient,
    store: ArtifactStore,
    static_dir: PathBuf,
    thumbnails_dir: PathBuf,
}

impl ThumbnailCache {
    pub fn new(
        client: HttpClient,
        store: ArtifactStore,
        static_dir: impl Into<PathBuf>,
        thumbnails_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            store,
            static_dir: static_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
        }
    }

    /// Store the thumbnail for `job_id` and return its site-relative path.
    ///
    /// Any failure leaves the caller with the remote URL.
    pub async fn cache(&self, job_id: &str, remote_url: &str) -> Option<String> {
        let web_dir = web_path(&self.static_dir, &self.thumbnails_dir)?;

        match self.fetch_to_disk(job_id, remote_url).await {
            Ok(()) => Some(format!("{web_dir}/{job_id}.jpg")),
            Err(e) => {
                warn!(job_id, url = remote_url, error = %e, "Thumbnail cache miss");
                None
            }
        }
    }

    async fn fetch_to_disk(&self, job_id: &str, remote_url: &str) -> Result<()> {
        let bytes = self.client.get(remote_url).await?;
        tokio::fs::write(self.store.thumbnail_path(job_id), &bytes).await?;
        debug!(job_id, size = bytes.len(), "Thumbnail cached");
        Ok(())
    }
}

/// `static/thumbnails` as seen through the `/static` route, if it is served
fn web_path(static_dir: &Path, thumbnails_dir: &Path) -> Option<String> {
    let relative = thumbnails_dir.strip_prefix(static_dir).ok()?;
    let mut path = String::from("static");
    for part in relative.components() {
        path.push('/');
        path.push_str(&part.as_os_str().to_string_lossy());
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn test_web_path() {
        assert_eq!(
            web_path(Path::new("static"), Path::new("static/thumbnails")).as_deref(),
            Some("static/thumbnails")
        );
        assert_eq!(web_path(Path::new("static"), Path::new("/tmp/thumbs")), None);
    }

    #[test]
    fn test_invalid_proxy() {
        let result = HttpClient::new(HttpConfig::default(), Some("::not a proxy::"));
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back() {
        let dir = TempDir::new().unwrap();
        let static_dir = dir.path().join("static");
        let thumbnails_dir = static_dir.join("thumbnails");
        let store = ArtifactStore::new(dir.path().join("downloads"), &thumbnails_dir);
        store.prepare().await.unwrap();

        let client = HttpClient::new(HttpConfig::default(), None).unwrap();
        let cache = ThumbnailCache::new(client, store, static_dir, thumbnails_dir);

        assert_eq!(cache.cache("abc", "not-a-url").await, None);
    }
}
