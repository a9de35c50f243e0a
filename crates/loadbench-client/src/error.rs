//! Error types for loadbench-client.
//!
//! Per-call failures are captured into `RequestStats.last_exception` rather
//! than propagated (the aggregator needs to see every attempt); this error
//! type exists for the handful of things that legitimately abort a call
//! before any stats can be produced, and for configuration-time failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Classifies a transport-level error for the retry policy in §4.3/§7: DNS
/// and connection failures are terminal, everything else reqwest surfaces at
/// the transport layer (timeouts, decode errors mid-stream) is transient and
/// eligible for the outer exponential-backoff wrapper.
pub fn is_connection_class(err: &reqwest::Error) -> bool {
    err.is_connect()
}
