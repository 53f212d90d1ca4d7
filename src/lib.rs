//! Health reporting client library.
//!
//! Observers sample the health of the subjects they talk to and feed those
//! samples in here; the library resolves addresses to subjects, rate-limits
//! healthy chatter, escalates unresolved distress windows and forwards what
//! survives to the Health Service.

// Data model
pub mod clock;
pub mod types;

// Pipeline
pub mod aggregation;
pub mod pending;
pub mod processor;
pub mod reporter;
pub mod resolver;

// Service boundary
pub mod client;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use client::{HealthClient, HealthService, HttpHealthService, InMemoryHealthService};
pub use config::schema::ClientConfig;
pub use lifecycle::Shutdown;
pub use reporter::Reporter;
pub use types::{Metric, Report, Status, SubmitStatus};
