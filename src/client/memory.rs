//! In-process Health Service.
//!
//! Records every submitted report and answers latest-report queries from
//! them. Useful when embedding the reporter without a server, and as the
//! service behind the pipeline tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;

use crate::clock::{Clock, SystemClock};
use crate::client::{Handle, HealthService, Peer, RpcError, RpcResult};
use crate::types::{Report, SubmitStatus, Timestamp};

/// Loopback Health Service.
#[derive(Debug, Default)]
pub struct InMemoryHealthService {
    next_handle: AtomicU64,
    registrations: DashMap<Handle, (String, String)>,
    reports: Mutex<Vec<Report>>,
    latest: DashMap<String, Report>,
    observing: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
    submitted: Notify,
}

impl InMemoryHealthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All reports submitted so far, in arrival order.
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn registrations(&self) -> Vec<(String, String)> {
        self.registrations.iter().map(|r| r.value().clone()).collect()
    }

    pub fn is_observing(&self, subject: &str) -> bool {
        self.observing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(subject)
    }

    /// Wait until at least `count` reports have arrived or `timeout` passes.
    /// Returns whether the count was reached.
    pub async fn wait_for_reports(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.submitted.notified();
                if self.report_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    fn check_available(&self) -> RpcResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RpcError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HealthService for InMemoryHealthService {
    async fn register(&self, module: &str, observer: &str) -> RpcResult<Handle> {
        self.check_available()?;
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        self.registrations
            .insert(handle, (module.to_string(), observer.to_string()));
        Ok(handle)
    }

    async fn submit_report(&self, handle: Handle, report: &Report) -> RpcResult<SubmitStatus> {
        self.check_available()?;
        if !self.registrations.contains_key(&handle) {
            return Err(RpcError::NotRegistered);
        }
        self.latest.insert(report.subject.clone(), report.clone());
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
        self.submitted.notify_waiters();
        Ok(SubmitStatus::Accepted)
    }

    async fn get_latest_report(&self, subject: &str) -> RpcResult<Option<Report>> {
        self.check_available()?;
        Ok(self.latest.get(subject).map(|r| r.value().clone()))
    }

    async fn observe(&self, subject: &str) -> RpcResult<bool> {
        self.check_available()?;
        Ok(self
            .observing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(subject.to_string()))
    }

    async fn stop_observing(&self, subject: &str) -> RpcResult<bool> {
        self.check_available()?;
        Ok(self
            .observing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(subject))
    }

    async fn ping(&self, _source: &Peer, _time: Timestamp) -> RpcResult<Timestamp> {
        self.check_available()?;
        Ok(SystemClock.now_millis())
    }
}
