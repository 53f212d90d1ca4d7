//! Distress window tracking and escalation.
//!
//! # Data Flow
//! ```text
//! caller: add(request_id)            caller: clear(request_id)
//!     → entries (concurrent map)         → atomic remove
//!                                            found: resolved, nothing sent
//!                                            missing: HEALTHY correction queued
//! sweep task (every expire_ms):
//!     → entries older than expire_ms
//!     → atomic remove, winner queues a PENDING report
//! ```
//!
//! # Design Decisions
//! - Exactly one of clear and sweep wins each entry; removal is the arbiter
//! - Escalations keep the entry's original submit time
//! - Shutdown drops open entries without escalating them

pub mod tracker;

pub use tracker::{ClearOutcome, PendingEntry, PendingTracker};
