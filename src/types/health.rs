//! Metrics, observations and reports.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Health classification of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Invalid,
    Healthy,
    Unhealthy,
    Pending,
}

impl Status {
    /// Whether repeated samples with this status are coalesced by the rate limiter.
    ///
    /// Only steady-state healthy heartbeats are aggregated; anything that
    /// signals trouble goes straight through.
    pub fn is_aggregated(self) -> bool {
        matches!(self, Status::Healthy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Invalid => "INVALID",
            Status::Healthy => "HEALTHY",
            Status::Unhealthy => "UNHEALTHY",
            Status::Pending => "PENDING",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = std::convert::Infallible;

    /// Unknown spellings map to `Invalid` rather than failing.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "h" | "healthy" => Status::Healthy,
            "u" | "unhealthy" => Status::Unhealthy,
            "p" | "pending" => Status::Pending,
            _ => Status::Invalid,
        };
        Ok(status)
    }
}

/// Acceptance status returned by the Health Service for a submitted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitStatus {
    Ignored,
    Accepted,
    Failed,
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStatus::Ignored => f.write_str("IGNORED"),
            SubmitStatus::Accepted => f.write_str("ACCEPTED"),
            SubmitStatus::Failed => f.write_str("FAILED"),
        }
    }
}

/// One named, scored health signal of a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub status: Status,
    pub score: f32,
}

impl Metric {
    pub fn new(name: impl Into<String>, status: Status, score: f32) -> Self {
        Self {
            name: name.into(),
            status,
            score,
        }
    }
}

/// Error returned when a `name:status:score` triple cannot be parsed.
#[derive(Debug, Error, PartialEq)]
pub enum MetricParseError {
    #[error("expected name:status:score, got '{0}'")]
    Format(String),
    #[error("invalid status in '{0}'")]
    Status(String),
    #[error("invalid score in '{0}'")]
    Score(String),
}

impl FromStr for Metric {
    type Err = MetricParseError;

    /// Parse the command-line form `cpu:u:30.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts[0].is_empty() {
            return Err(MetricParseError::Format(s.to_string()));
        }
        let status: Status = parts[1].parse().unwrap_or_default();
        if status == Status::Invalid {
            return Err(MetricParseError::Status(s.to_string()));
        }
        let score: f32 = parts[2]
            .parse()
            .map_err(|_| MetricParseError::Score(s.to_string()))?;
        Ok(Metric::new(parts[0], status, score))
    }
}

/// A timestamped set of metrics submitted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ts: Timestamp,
    pub metrics: BTreeMap<String, Metric>,
}

impl Observation {
    pub fn new(ts: Timestamp, metrics: impl IntoIterator<Item = Metric>) -> Self {
        let metrics = metrics
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        Self { ts, metrics }
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }
}

/// The observer → subject wire message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub observer: String,
    pub subject: String,
    pub observation: Observation,
}

impl Report {
    pub fn new(
        observer: impl Into<String>,
        subject: impl Into<String>,
        ts: Timestamp,
        metrics: impl IntoIterator<Item = Metric>,
    ) -> Self {
        Self {
            observer: observer.into(),
            subject: subject.into(),
            observation: Observation::new(ts, metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("h".parse::<Status>().unwrap(), Status::Healthy);
        assert_eq!("Unhealthy".parse::<Status>().unwrap(), Status::Unhealthy);
        assert_eq!("p".parse::<Status>().unwrap(), Status::Pending);
        assert_eq!("dying".parse::<Status>().unwrap(), Status::Invalid);
    }

    #[test]
    fn test_only_healthy_is_aggregated() {
        assert!(Status::Healthy.is_aggregated());
        assert!(!Status::Unhealthy.is_aggregated());
        assert!(!Status::Pending.is_aggregated());
        assert!(!Status::Invalid.is_aggregated());
    }

    #[test]
    fn test_metric_triple() {
        let metric: Metric = "cpu:u:30".parse().unwrap();
        assert_eq!(metric, Metric::new("cpu", Status::Unhealthy, 30.0));

        assert!(matches!("cpu:u".parse::<Metric>(), Err(MetricParseError::Format(_))));
        assert!(matches!("cpu:x:1".parse::<Metric>(), Err(MetricParseError::Status(_))));
        assert!(matches!("cpu:h:abc".parse::<Metric>(), Err(MetricParseError::Score(_))));
    }

    #[test]
    fn test_observation_keys_unique() {
        let obs = Observation::new(
            10,
            vec![
                Metric::new("cpu", Status::Healthy, 1.0),
                Metric::new("cpu", Status::Unhealthy, 2.0),
                Metric::new("disk", Status::Healthy, 3.0),
            ],
        );
        assert_eq!(obs.metrics.len(), 2);
        assert_eq!(obs.metric("cpu").unwrap().status, Status::Unhealthy);
    }

    #[test]
    fn test_report_wire_format() {
        let report = Report::new("obs", "TS_2", 1000, vec![Metric::new("cpu", Status::Pending, 30.0)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["subject"], "TS_2");
        assert_eq!(json["observation"]["ts"], 1000);
        assert_eq!(json["observation"]["metrics"]["cpu"]["status"], "PENDING");
    }
}
