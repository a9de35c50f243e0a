//! Core types and traits shared by the load-generation harness:
//!
//! - [`content`]: tagged message content (`Text` vs `Parts`)
//! - [`stats`]: the per-request [`stats::RequestStats`] record
//! - [`sample_window`]: the sliding [`sample_window::SampleWindow`] buffer
//! - [`run_end`]: composite run-end conditions for the executor
//! - [`message_source`]: external-contract traits for body generation and
//!   token counting
//! - [`rate_limiter`]: token-bucket request pacing
//! - [`error`]: crate-wide error type

pub mod content;
pub mod error;
pub mod message_source;
pub mod rate_limiter;
pub mod run_end;
pub mod sample_window;
pub mod stats;

pub use content::{Content, ImageUrl, Message, Part};
pub use error::{Error, Result};
pub use message_source::{MessageSource, TokenCounter, TokenCounts};
pub use rate_limiter::{NoRateLimiter, RateLimiter, TokenBucket};
pub use run_end::{RunEndCondition, RunEndMode};
pub use sample_window::SampleWindow;
pub use stats::{now, RequestStats, Timestamp};
