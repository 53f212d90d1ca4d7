//! Configuration schema definitions.
//!
//! All types derive Serde traits so the same structure can be read from a
//! TOML file; the properties format is mapped onto it by the loader.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default Health Service port.
pub const DEFAULT_PORT: u16 = 6688;

/// Default pending-status expiration interval.
pub const DEFAULT_EXPIRE_MS: u64 = 3000;

/// Root configuration for the health reporting client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the Health Service lives.
    pub server: ServerConfig,

    /// Distress window tracking.
    pub pending: PendingConfig,

    /// Healthy-signal aggregation.
    pub aggregation: AggregationConfig,

    /// RPC timeouts and shutdown grace.
    pub transport: TransportConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Subjects whose addresses are known up front.
    pub subjects: Vec<SubjectConfig>,
}

/// Health Service endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host; the local hostname when unset.
    pub host: Option<String>,

    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// The configured host, falling back to this machine's hostname.
    pub fn host_or_local(&self) -> String {
        match &self.host {
            Some(host) if !host.is_empty() => host.clone(),
            _ => gethostname::gethostname().to_string_lossy().into_owned(),
        }
    }

    /// `host:port` of the Health Service.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host_or_local(), self.port)
    }
}

/// Pending tracker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PendingConfig {
    /// Age at which an unresolved distress window is escalated; also the sweep period.
    pub expire_ms: u64,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            expire_ms: DEFAULT_EXPIRE_MS,
        }
    }
}

impl PendingConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expire_ms)
    }
}

/// Rate limiter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Length of a healthy aggregation window in milliseconds.
    pub interval_ms: u64,

    /// Samples in one window that force an early flush.
    pub count_threshold: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            count_threshold: 1_000,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Per-call timeout in milliseconds.
    pub request_timeout_ms: u64,

    /// How long shutdown waits for in-flight calls.
    pub shutdown_grace_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9187".to_string(),
        }
    }
}

/// A subject with a known network address.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SubjectConfig {
    /// Logical subject id.
    pub subject: String,

    /// Socket address, e.g. "10.0.0.5:2181".
    pub address: String,

    /// Hostname the subject is known by; the IP when absent.
    #[serde(default)]
    pub hostname: Option<String>,
}
