//! Per-host request spacing
//!
//! Every host gets its own single-cell quota replenished once per
//! `request_delay`, so two requests to the same host are never closer than
//! that, while different hosts proceed independently.

use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::debug;
use url::Url;

/// Politeness limiter keyed by `host:port`
#[derive(Debug)]
pub struct HostThrottle {
    limiter: DefaultKeyedRateLimiter<String>,
    delay: Duration,
}

impl HostThrottle {
    /// Returns `None` for a zero delay (no throttling)
    pub fn new(delay: Duration) -> Option<Self> {
        let quota = Quota::with_period(delay)?;
        Some(Self {
            limiter: RateLimiter::keyed(quota),
            delay,
        })
    }

    /// Wait until a request to `url`'s host may be issued
    pub async fn until_ready(&self, url: &Url) {
        let key = host_key(url);
        if self.limiter.check_key(&key).is_err() {
            debug!("Throttling request to {} ({:?} spacing)", key, self.delay);
            self.limiter.until_key_ready(&key).await;
        }
    }
}

/// Key under which a URL is throttled
pub fn host_key(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}
