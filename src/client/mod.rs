//! Health Service client.
//!
//! # Data Flow
//! ```text
//! HealthClient (facade.rs)
//!     → HealthService trait
//!         → http.rs   (JSON over HTTP to a remote service)
//!         → memory.rs (loopback, records reports in-process)
//! ```
//!
//! # Design Decisions
//! - Transport failures stop at the facade: logged, then None/false
//! - No retries; the next sampling cycle resubmits current state
//! - Registration gates all report traffic

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Report, SubmitStatus, Timestamp};

pub mod facade;
pub mod http;
pub mod memory;
pub mod wire;

pub use facade::{HealthClient, ReplyCallback};
pub use http::HttpHealthService;
pub use memory::InMemoryHealthService;
pub use wire::Peer;

/// Registration handle issued by the Health Service.
pub type Handle = u64;

/// Errors that can occur talking to the Health Service.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection or request failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("service returned {code}: {body}")]
    Status { code: u16, body: String },

    /// The reply could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The call did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// A report was attempted before a successful registration.
    #[error("client is not registered")]
    NotRegistered,
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RpcError::Timeout
        } else if e.is_decode() {
            RpcError::Decode(e.to_string())
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}

/// Result type for Health Service calls.
pub type RpcResult<T> = Result<T, RpcError>;

/// The remote Health Service as seen by the client.
#[async_trait]
pub trait HealthService: Send + Sync {
    /// Register `observer` for `module`; must succeed before reporting.
    async fn register(&self, module: &str, observer: &str) -> RpcResult<Handle>;

    async fn submit_report(&self, handle: Handle, report: &Report) -> RpcResult<SubmitStatus>;

    /// Most recent report known for `subject`, if any.
    async fn get_latest_report(&self, subject: &str) -> RpcResult<Option<Report>>;

    async fn observe(&self, subject: &str) -> RpcResult<bool>;

    async fn stop_observing(&self, subject: &str) -> RpcResult<bool>;

    /// Liveness probe; returns the service's clock.
    async fn ping(&self, source: &Peer, time: Timestamp) -> RpcResult<Timestamp>;

    /// Release transport resources.
    async fn close(&self) {}
}
