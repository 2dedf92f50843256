//! Request boundary
//!
//! [`ImageService`] takes the argument map of one request and produces a
//! complete response: validate → fetch → process (on the blocking pool) →
//! encoded body with content type and forwarded cache headers, or a JSON
//! error body carrying the error code.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::options::OutputFormat;
use crate::engine::pipeline::Engine;
use crate::error::ImageError;
use crate::fetch::{HttpFetcher, SourceFetcher};
use crate::validator::Validator;

/// Response handed back to the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ImageResponse {
    /// JSON error response
    pub fn from_error(error: &ImageError) -> Self {
        Self {
            status: error.to_http_status(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from(error.to_json()),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Validates, fetches and transforms image requests
#[derive(Clone)]
pub struct ImageService {
    validator: Arc<Validator>,
    fetcher: Arc<dyn SourceFetcher>,
    engine: Arc<Engine>,
}

impl ImageService {
    /// Service with an HTTP fetcher and the process-wide face detector
    pub fn new(config: &Config) -> Result<Self, String> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::with_fetcher(
            Validator::from_config(config)?,
            Arc::new(fetcher),
            Engine::new(),
        ))
    }

    pub fn with_fetcher(
        validator: Validator,
        fetcher: Arc<dyn SourceFetcher>,
        engine: Engine,
    ) -> Self {
        Self {
            validator: Arc::new(validator),
            fetcher,
            engine: Arc::new(engine),
        }
    }

    /// Handle one request. Never fails: errors become JSON responses.
    pub async fn handle(&self, args: &HashMap<String, String>, query: &str) -> ImageResponse {
        match self.process(args, query).await {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(
                    error_code = e.error_code(),
                    kind = %e.kind(),
                    status = e.to_http_status(),
                    message = %e.message(),
                    "request failed"
                );
                ImageResponse::from_error(&e)
            }
        }
    }

    async fn process(
        &self,
        args: &HashMap<String, String>,
        query: &str,
    ) -> Result<ImageResponse, ImageError> {
        let request = self.validator.validate(args, query)?;
        let source = self.fetcher.fetch(&request.url).await?;

        let engine = Arc::clone(&self.engine);
        let body = source.body.clone();
        let chain = request.chain.clone();
        let options = request.options.clone();
        let processed =
            tokio::task::spawn_blocking(move || engine.process(&body, &chain, &options))
                .await
                .map_err(|e| ImageError::image_save(format!("Image task failed: {}", e)))??;

        let content_type = processed.content_type().or_else(|| {
            image::guess_format(&processed.data)
                .ok()
                .and_then(OutputFormat::from_image_format)
                .map(|f| f.content_type())
        });

        let mut headers = source.headers;
        if let Some(content_type) = content_type {
            headers.push(("content-type".to_string(), content_type.to_string()));
        }

        tracing::info!(
            url = %request.url,
            operations = request.chain.len(),
            bytes = processed.data.len(),
            content_type = content_type.unwrap_or("unknown"),
            "request served"
        );

        Ok(ImageResponse {
            status: 200,
            headers,
            body: Bytes::from(processed.data),
        })
    }
}
