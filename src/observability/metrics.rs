//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dh_inform_requests_total` (counter): queued samples by status
//! - `dh_reports_approved_total` (counter): limiter approvals by reason
//! - `dh_reports_suppressed_total` (counter): samples absorbed into a window
//! - `dh_requests_discarded_total` (counter): queued samples dropped at shutdown
//! - `dh_pending_escalations_total` (counter): PENDING reports raised by the sweep
//! - `dh_pending_corrections_total` (counter): HEALTHY follow-ups after a late clear
//! - `dh_pending_entries` (gauge): open distress windows
//! - `dh_rpc_failures_total` (counter): failed calls by RPC name

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::types::Status;

/// Install the Prometheus exporter on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_inform(status: Status) {
    counter!("dh_inform_requests_total", "status" => status.as_str()).increment(1);
}

pub fn record_report_approved(reason: &'static str) {
    counter!("dh_reports_approved_total", "reason" => reason).increment(1);
}

pub fn record_report_suppressed() {
    counter!("dh_reports_suppressed_total").increment(1);
}

pub fn record_requests_discarded(count: u64) {
    counter!("dh_requests_discarded_total").increment(count);
}

pub fn record_pending_escalation() {
    counter!("dh_pending_escalations_total").increment(1);
}

pub fn record_pending_correction() {
    counter!("dh_pending_corrections_total").increment(1);
}

pub fn record_pending_entries(count: usize) {
    gauge!("dh_pending_entries").set(count as f64);
}

pub fn record_rpc_failure(call: &'static str) {
    counter!("dh_rpc_failures_total", "call" => call).increment(1);
}
