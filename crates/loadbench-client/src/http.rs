//! Shared HTTP client construction.
//!
//! One `reqwest::Client` (and its connection pool) is built once per run and
//! shared across every worker, per §5's "HTTP session: shared across
//! workers, thread-safe by contract of the HTTP library".

use crate::error::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 64,
            user_agent: format!("loadbench/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Build the shared client. No blanket request timeout is applied: §5 notes
/// a single call's own retry budget already bounds it at 60s, and a
/// streaming response can legitimately stay open much longer than that while
/// tokens keep arriving.
pub fn build_client(config: &HttpClientConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .user_agent(&config.user_agent)
        .build()
        .map_err(Error::Http)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_defaults() {
        let config = HttpClientConfig::default();
        assert!(build_client(&config).is_ok());
    }
}
