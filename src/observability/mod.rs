//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (subject, metric, request_id) on every event
//! - Metrics go through the `metrics` facade; no recorder means no cost
//! - The exporter is only installed when configured

pub mod logging;
pub mod metrics;
