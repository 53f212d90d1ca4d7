//! Request processing pipeline.
//!
//! # Data Flow
//! ```text
//! caller threads / pending sweep
//!     → queue.rs (RequestQueue::add, never blocks)
//!     → unbounded channel (FIFO)
//!     → worker.rs (single consumer)
//!         → resolver (optional address → subject)
//!         → rate limiter (approve / absorb)
//!         → HealthClient (sync or background submit)
//! ```
//!
//! # Design Decisions
//! - One consumer serializes every limiter decision, preserving per-subject order
//! - Reports carry the sampling time, not the dispatch time
//! - Shutdown discards queued work, then sends a poison command the consumer exits on

pub mod queue;
pub mod worker;

pub use queue::RequestQueue;
pub use worker::{ProcessorStats, RequestProcessor};
