//! Sliding-window aggregation and periodic emission of per-request
//! statistics produced by `loadbench-client`'s `StreamingClient`.
//!
//! - [`aggregator`]: the mutex-guarded `Aggregator` and its background
//!   emitter task
//! - [`snapshot`]: one emitted snapshot and its JSON/human renderings
//! - [`percentile`]: average/percentile helpers shared by both

pub mod aggregator;
pub mod percentile;
pub mod snapshot;

pub use aggregator::{Aggregator, AggregatorConfig};
pub use snapshot::Snapshot;
