//! The streaming request client: issues chat-completion calls in
//! server-sent-events mode, decomposes per-call timing, and implements the
//! hybrid retry-after/exponential-backoff policy described for
//! `StreamingClient` — the one HTTP-facing subsystem of the load harness.

pub mod backoff;
pub mod error;
pub mod http;
pub mod request;
pub mod retry_after;
pub mod streaming;

pub use error::{Error, Result};
pub use http::{build_client, HttpClientConfig};
pub use request::{ChatCompletionRequest, ClientConfig};
pub use streaming::StreamingClient;
