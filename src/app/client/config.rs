//! HTTP client construction
//!
//! Transport settings come from [`FetcherConfig`]: the idle connection pool
//! is sized by `connection_pool_size` and is independent of how many
//! downloads run at once.

use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::FetcherConfig;
use crate::constants::http;
use crate::errors::DownloadResult;

/// Builds the shared HTTP client
///
/// No whole-request timeout is set: `timeout` is applied to the header wait
/// and to each body chunk separately, so long downloads are not cut off.
pub fn build_http_client(config: &FetcherConfig) -> DownloadResult<Client> {
    let client = Client::builder()
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .tcp_nodelay(true)
        .tcp_keepalive(config.keepalive_timeout)
        .pool_idle_timeout(config.keepalive_timeout)
        .pool_max_idle_per_host(config.connection_pool_size)
        .redirect(Policy::limited(http::MAX_REDIRECTS))
        .build()?;
    Ok(client)
}
