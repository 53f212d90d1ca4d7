//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (parsing handles syntax)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Check pre-registered subject addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ClientConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("server.port must be non-zero")]
    ZeroPort,
    #[error("pending.expire_ms must be greater than zero")]
    ZeroExpiration,
    #[error("aggregation.interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("aggregation.count_threshold must be at least 1")]
    ZeroThreshold,
    #[error("subject '{subject}' has invalid address '{address}'")]
    SubjectAddress { subject: String, address: String },
}

pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.pending.expire_ms == 0 {
        errors.push(ValidationError::ZeroExpiration);
    }
    if config.aggregation.interval_ms == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if config.aggregation.count_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    for entry in &config.subjects {
        if entry.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::SubjectAddress {
                subject: entry.subject.clone(),
                address: entry.address.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
