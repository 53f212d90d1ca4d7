//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (Reporter::start):
//!     Config → Register with service → Spawn processor → Spawn sweep
//!
//! Shutdown (Reporter::shutdown):
//!     Trigger → Sweep exits, pending discarded → Queue discarded, poison
//!     → Consumer exits → Facade drains in-flight calls (bounded) → Close
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: producers of work stop before consumers
//! - Shutdown is idempotent
//! - In-flight calls get a grace period, then are abandoned

pub mod shutdown;

pub use shutdown::Shutdown;
