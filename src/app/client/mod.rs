//! Generic HTTP fetcher
//!
//! [`FetchClient`] owns the pooled HTTP client, the per-host politeness
//! throttle and the retry policy. It knows nothing about catalogs or the
//! ledger: discoverers use it to read listing pages and the worker pool uses
//! it to stream files.
//!
//! - `config`: HTTP client construction from [`FetcherConfig`]
//! - `throttle`: per-host request spacing
//! - `http`: single requests and the retry loop

use std::sync::Arc;

use reqwest::Response;
use url::Url;

use crate::config::FetcherConfig;
use crate::errors::{DownloadError, DownloadResult};

pub mod config;
pub mod http;
pub mod throttle;

use http::HttpHandler;

/// Shared, cheaply cloneable HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchClient {
    http_handler: Arc<HttpHandler>,
}

impl FetchClient {
    /// Build the client; no request is made
    pub fn new(config: Arc<FetcherConfig>) -> DownloadResult<Self> {
        let client = config::build_http_client(&config)?;
        tracing::debug!(
            "Created fetch client (pool {} per host, request delay {:?})",
            config.connection_pool_size,
            config.request_delay
        );
        Ok(Self {
            http_handler: Arc::new(HttpHandler::new(client, config)),
        })
    }

    /// One throttled GET; see [`HttpHandler::send`]
    pub async fn send(&self, url: &Url) -> DownloadResult<Response> {
        self.http_handler.send(url).await
    }

    /// Fetch a page body as text with retries
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        self.http_handler.get_page(url).await
    }

    /// Retry `attempt` under the configured policy
    pub async fn with_retries<T, F, Fut>(&self, url: &Url, attempt: F) -> DownloadResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = DownloadResult<T>>,
    {
        self.http_handler.with_retries(url, attempt).await
    }

    /// Bound one body read by the configured timeout
    pub async fn read_timeout<T, Fut>(&self, stage: &'static str, read: Fut) -> DownloadResult<T>
    where
        Fut: std::future::Future<Output = T>,
    {
        self.http_handler.read_timeout(stage, read).await
    }

    pub fn config(&self) -> &FetcherConfig {
        self.http_handler.config()
    }
}

/// Parse a URL string, mapping failures to [`DownloadError::InvalidUrl`]
pub fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}
