//! Source image fetching
//!
//! The engine never touches the network. Sources are fetched through a
//! [`SourceFetcher`], whose HTTP implementation bounds concurrent fetches and
//! fails fast on timeout.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::FetchConfig;
use crate::constants::FORWARDED_HEADERS;
use crate::error::ImageError;

/// Body and forwardable headers of a fetched source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedSource {
    pub body: Bytes,
    /// Upstream cache headers, lowercase names
    pub headers: Vec<(String, String)>,
}

impl FetchedSource {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }
}

/// Fetches source image bytes by URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedSource, ImageError>;
}

/// HTTP(S) fetcher backed by reqwest
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl HttpFetcher {
    /// Build a fetcher from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message if the proxy URL is invalid or the HTTP
    /// client cannot be created.
    pub fn new(config: &FetchConfig) -> Result<Self, String> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(!config.validate_cert);

        if let Some(proxy) = config.proxy_url() {
            let proxy = reqwest::Proxy::all(&proxy)
                .map_err(|e| format!("Invalid fetch proxy '{}': {}", proxy, e))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_requests)),
        })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedSource, ImageError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ImageError::fetch(format!("Fetch slots closed: {}", e)))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!(url = %url, "source fetch timed out");
                ImageError::fetch("Timed out fetching source")
            } else {
                tracing::warn!(url = %url, error = %e, "source fetch failed");
                ImageError::fetch(format!("Failed to fetch source: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::info!(url = %url, status = status.as_u16(), "source returned error status");
            return Err(ImageError::fetch(format!(
                "Source request failed with status: {}",
                status
            )));
        }

        let headers = FORWARDED_HEADERS
            .iter()
            .filter_map(|name| {
                response
                    .headers()
                    .get(*name)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| ImageError::fetch(format!("Failed to read source body: {}", e)))?;

        tracing::debug!(url = %url, bytes = body.len(), "fetched source");

        Ok(FetchedSource { body, headers })
    }
}
