//! Crate-wide error type for configuration and startup failures.
//!
//! Per-request failures never reach here — they are captured into
//! `RequestStats.last_exception` by the client crate. Only validation,
//! file I/O, and the one-time model-detection/ping calls made before a run
//! starts can fail this way, and they abort the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument(s): {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Client(#[from] loadbench_client::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
