//! Health protocol data model.
//!
//! # Data Flow
//! ```text
//! caller (subject, metric, status, score)
//!     → request.rs (InformRequest queued for the processor)
//!     → health.rs (Metric → Observation → Report)
//!     → client facade → Health Service
//! ```
//!
//! # Design Decisions
//! - Wire types are plain serde structs; the transport picks the encoding
//! - Timestamps are epoch milliseconds so queued requests keep their sampling instant
//! - Submit acceptance status is opaque to the client core

pub mod health;
pub mod request;

pub use health::{Metric, Observation, Report, Status, SubmitStatus, Timestamp};
pub use request::{Command, InformRequest};
