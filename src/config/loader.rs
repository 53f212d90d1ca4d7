//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for '{key}': {value}")]
    Invalid { key: String, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration.
///
/// Files ending in `.toml` are read as TOML; anything else uses the
/// `key=value` properties format. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    tracing::info!(path = %path.display(), "Reading configuration");
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Configuration file is missing, using defaults");
        return Ok(ClientConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config = if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content)?
    } else {
        parse_properties(&content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse the properties format into a config, starting from defaults.
///
/// Recognized keys: `dhserver=<host>:<port>`, `expire_ms`, `aggregate_ms`,
/// `aggregate_count`. Lines may use `=` or `:` as separator; `#` and `!`
/// start comments.
pub fn parse_properties(content: &str) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = split_property(line) else {
            tracing::debug!(line = %line, "Ignoring property without value");
            continue;
        };

        match key {
            "dhserver" => {
                let (host, port) = value.rsplit_once(':').ok_or_else(|| invalid(key, value))?;
                if host.is_empty() {
                    return Err(invalid(key, value));
                }
                config.server.host = Some(host.to_string());
                config.server.port = port.parse().map_err(|_| invalid(key, value))?;
            }
            "expire_ms" => {
                config.pending.expire_ms = value.parse().map_err(|_| invalid(key, value))?;
            }
            "aggregate_ms" => {
                config.aggregation.interval_ms = value.parse().map_err(|_| invalid(key, value))?;
            }
            "aggregate_count" => {
                config.aggregation.count_threshold =
                    value.parse().map_err(|_| invalid(key, value))?;
            }
            other => {
                tracing::debug!(key = %other, "Ignoring unrecognized property");
            }
        }
    }

    Ok(config)
}

fn split_property(line: &str) -> Option<(&str, &str)> {
    // First separator wins so `dhserver: host:6688` keeps the port.
    let idx = line.find(['=', ':'])?;
    let key = line[..idx].trim();
    let value = line[idx + 1..].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}
