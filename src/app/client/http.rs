//! Core HTTP operations with politeness throttling and retry logic

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::throttle::HostThrottle;
use crate::config::FetcherConfig;
use crate::constants::limits;
use crate::errors::{DownloadError, DownloadResult};

/// HTTP operations handler shared by discovery and the worker pool
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    throttle: Option<HostThrottle>,
    config: Arc<FetcherConfig>,
}

impl HttpHandler {
    pub fn new(client: Client, config: Arc<FetcherConfig>) -> Self {
        Self {
            throttle: HostThrottle::new(config.request_delay),
            client,
            config,
        }
    }

    /// Issue one GET, honoring per-host spacing
    ///
    /// Only the status line and headers have been read when this returns;
    /// the body is left for the caller to stream or drop. `timeout` bounds
    /// the wait for headers; body reads are bounded per chunk by
    /// [`HttpHandler::read_timeout`].
    pub async fn send(&self, url: &Url) -> DownloadResult<Response> {
        if let Some(throttle) = &self.throttle {
            throttle.until_ready(url).await;
        }

        let request = self.client.get(url.as_str()).send();
        let response = self.read_timeout("response headers", request).await??;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DownloadError::RateLimitExceeded {
                retry_after: retry_after(response.headers(), Utc::now()),
            });
        }
        if !status.is_success() {
            return Err(DownloadError::ServerError {
                status: status.as_u16(),
            });
        }

        debug!("Fetched response headers: {} ({})", url, status);
        Ok(response)
    }

    /// Run `attempt` until it succeeds, fails permanently, or the retry
    /// budget is spent
    ///
    /// Transient errors are retried up to `max_retries` times with
    /// exponential backoff; exhaustion is reported as
    /// [`DownloadError::MaxRetriesExceeded`].
    pub async fn with_retries<T, F, Fut>(&self, url: &Url, mut attempt: F) -> DownloadResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DownloadResult<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut backoff = self.backoff();
        let mut retries = 0;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retries < max_retries => {
                    retries += 1;
                    let mut delay = backoff
                        .next_backoff()
                        .unwrap_or(self.config.retry_max_delay);
                    // The host's own pause wins over the backoff, up to the cap.
                    if let Some(requested) = e.retry_after() {
                        delay = delay.max(requested.min(self.config.retry_max_delay));
                    }
                    warn!(
                        "Request to {} failed (attempt {}/{}): {}. Retrying in {}ms",
                        url,
                        retries,
                        max_retries + 1,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(DownloadError::MaxRetriesExceeded {
                        max_retries,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch a page body as text, with retries
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        self.with_retries(url, move || async move {
            let response = self.send(url).await?;
            let body = self.read_timeout("page body", response.text()).await?;
            Ok(body?)
        })
        .await
    }

    /// Bound one body read by `timeout`
    ///
    /// Applied per chunk while streaming, so a large file on a slow but
    /// live connection never hits the deadline as a whole.
    pub async fn read_timeout<T, Fut>(&self, stage: &'static str, read: Fut) -> DownloadResult<T>
    where
        Fut: Future<Output = T>,
    {
        tokio::time::timeout(self.config.timeout, read)
            .await
            .map_err(|_| DownloadError::Timeout {
                stage,
                after: self.config.timeout,
            })
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.retry_base_delay)
            .with_max_interval(self.config.retry_max_delay)
            .with_multiplier(limits::RETRY_MULTIPLIER)
            .with_max_elapsed_time(None)
            .build()
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }
}

/// `Retry-After` as a delay: either delta-seconds or an HTTP date
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
