//! Rate limiter for outbound health reports.

use std::sync::{Arc, Mutex};

use crate::aggregation::buffer::AggregationBuffer;
use crate::clock::Clock;
use crate::config::AggregationConfig;
use crate::observability::metrics;
use crate::types::{Metric, Status};

/// Decides which samples reach the Health Service.
///
/// The request processor is the only caller in steady state, but the buffer
/// sits behind a mutex so direct callers stay safe.
pub struct RateLimiter {
    buffer: Mutex<AggregationBuffer>,
    interval_ms: u64,
    count_threshold: u64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &AggregationConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            buffer: Mutex::new(AggregationBuffer::new()),
            interval_ms: config.interval_ms,
            count_threshold: config.count_threshold,
            clock,
        }
    }

    /// Approve a sample (possibly with an averaged score) or absorb it.
    pub fn vet(&self, subject: &str, name: &str, status: Status, score: f32) -> Option<Metric> {
        if !status.is_aggregated() {
            metrics::record_report_approved("passthrough");
            return Some(Metric::new(name, status, score));
        }

        let now = self.clock.now_millis();
        let mut buffer = self.buffer.lock().unwrap_or_else(|e| e.into_inner());
        let val = buffer.insert(subject, name, status, score, now);

        if val.is_first_sight() {
            tracing::info!(subject = %subject, metric = %name, "Permitting new report");
            metrics::record_report_approved("first_sight");
            return Some(Metric::new(name, status, score));
        }

        let window = val.window_millis();
        if window > self.interval_ms || val.count >= self.count_threshold {
            let average = val.average();
            tracing::info!(
                subject = %subject,
                metric = %name,
                window_ms = window,
                samples = val.count,
                score = average,
                "Permitting aggregated report"
            );
            val.reset(now);
            metrics::record_report_approved("flush");
            return Some(Metric::new(name, status, average));
        }

        tracing::debug!(subject = %subject, metric = %name, "Report too frequent, absorbed");
        metrics::record_report_suppressed();
        None
    }

    /// Number of aggregation buckets currently held.
    pub fn bucket_count(&self) -> usize {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
