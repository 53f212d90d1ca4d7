//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (key=value properties or TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → handed to Reporter::start
//! ```
//!
//! # Design Decisions
//! - A missing file is not an error; every field has a default
//! - Unknown properties keys are ignored, malformed known ones are rejected
//! - Validation separates syntactic (parsing) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AggregationConfig, ClientConfig, ObservabilityConfig, PendingConfig, ServerConfig,
    SubjectConfig, TransportConfig, DEFAULT_EXPIRE_MS, DEFAULT_PORT,
};
