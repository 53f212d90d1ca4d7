//! Rate limiting of outbound health reports.
//!
//! # Data Flow
//! ```text
//! vetted sample (subject, metric, status, score)
//!     → limiter.rs (policy: pass through, flush or suppress)
//!     → buffer.rs (per subject/metric/status accumulator)
//!     → Some(Metric) to forward, or None when absorbed
//! ```
//!
//! # Design Decisions
//! - Only HEALTHY samples are aggregated; distress signals are never delayed
//! - First sight of a bucket is forwarded immediately with the raw score
//! - Flushes carry the mean of the window, then the window restarts
//! - Buckets are never evicted; the key space is bounded by observed triples

pub mod buffer;
pub mod limiter;

pub use buffer::{AggregateKey, AggregateValue, AggregationBuffer};
pub use limiter::RateLimiter;
