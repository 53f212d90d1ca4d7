//! Client facade over a Health Service transport.
//!
//! # Responsibilities
//! - Register once before any report traffic
//! - Build reports from metrics and submit them, blocking or in the background
//! - Turn transport failures into log entries and `None`/`false`
//! - Drain in-flight background submissions on shutdown, within a grace period

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::client::{Handle, HealthService, Peer, RpcError};
use crate::clock::Clock;
use crate::observability::metrics;
use crate::types::{Metric, Report, SubmitStatus, Timestamp};

/// Receives the outcome of a background submission.
pub type ReplyCallback = Box<dyn FnOnce(Result<SubmitStatus, RpcError>) + Send + 'static>;

#[derive(Debug)]
struct Registration {
    handle: Handle,
    module: String,
    observer: String,
}

/// Counts background submissions still running.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    drained: Notify,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            tracker: self.clone(),
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.drained.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// RAII guard that releases an in-flight slot when the submission finishes.
struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.tracker.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.drained.notify_waiters();
        }
    }
}

/// Handle to the Health Service used by the reporter and by direct callers.
pub struct HealthClient {
    service: Arc<dyn HealthService>,
    registration: ArcSwapOption<Registration>,
    clock: Arc<dyn Clock>,
    in_flight: Arc<InFlight>,
    runtime: RuntimeHandle,
}

impl HealthClient {
    /// Create an unregistered client. Must be called inside a tokio runtime;
    /// background submissions are spawned onto it.
    pub fn new(service: Arc<dyn HealthService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            service,
            registration: ArcSwapOption::empty(),
            clock,
            in_flight: Arc::new(InFlight::default()),
            runtime: RuntimeHandle::current(),
        }
    }

    /// Register with the Health Service. Until this succeeds every report
    /// call is a silent no-op; calling it again re-initializes.
    pub async fn init(&self, module: &str, observer: &str) -> bool {
        match self.service.register(module, observer).await {
            Ok(handle) => {
                tracing::info!(module = %module, observer = %observer, handle, "Registered with health service");
                self.registration.store(Some(Arc::new(Registration {
                    handle,
                    module: module.to_string(),
                    observer: observer.to_string(),
                })));
                true
            }
            Err(e) => {
                tracing::error!(module = %module, observer = %observer, error = %e, "Register RPC failed");
                metrics::record_rpc_failure("register");
                self.registration.store(None);
                false
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.registration.load().is_some()
    }

    /// Observer id this client reports as, once registered.
    pub fn client_id(&self) -> Option<String> {
        self.registration.load().as_ref().map(|r| r.observer.clone())
    }

    pub fn module(&self) -> Option<String> {
        self.registration.load().as_ref().map(|r| r.module.clone())
    }

    fn build_report(&self, ts: Timestamp, subject: &str, metrics: Vec<Metric>) -> Option<(Handle, Report)> {
        let guard = self.registration.load();
        let Some(registration) = guard.as_ref() else {
            tracing::debug!(subject = %subject, "Client not ready, dropping report");
            return None;
        };
        let report = Report::new(registration.observer.clone(), subject, ts, metrics);
        Some((registration.handle, report))
    }

    /// Submit a report stamped with the current time.
    pub async fn report(&self, subject: &str, metrics: Vec<Metric>) -> Option<SubmitStatus> {
        self.report_at(self.clock.now_millis(), subject, metrics).await
    }

    /// Submit a report stamped with `ts` and wait for the reply.
    pub async fn report_at(&self, ts: Timestamp, subject: &str, metrics: Vec<Metric>) -> Option<SubmitStatus> {
        let (handle, report) = self.build_report(ts, subject, metrics)?;
        tracing::info!(observer = %report.observer, subject = %subject, ts, "Submitting report");
        match self.service.submit_report(handle, &report).await {
            Ok(status) => {
                tracing::debug!(subject = %subject, result = %status, "Report submitted");
                Some(status)
            }
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "SubmitReport RPC failed");
                metrics::record_rpc_failure("submit_report");
                None
            }
        }
    }

    /// Submit a report stamped with `ts` in the background.
    ///
    /// The callback, if any, receives the reply or the transport error.
    /// Returns `None` without spawning when the client is not ready.
    pub fn report_async(
        &self,
        ts: Timestamp,
        subject: &str,
        metrics: Vec<Metric>,
        callback: Option<ReplyCallback>,
    ) -> Option<JoinHandle<()>> {
        let (handle, report) = self.build_report(ts, subject, metrics)?;
        let service = self.service.clone();
        let guard = self.in_flight.enter();

        Some(self.runtime.spawn(async move {
            let _guard = guard;
            let result = service.submit_report(handle, &report).await;
            match &result {
                Ok(status) => {
                    tracing::debug!(subject = %report.subject, result = %status, "Async report submitted");
                }
                Err(e) => {
                    tracing::warn!(subject = %report.subject, error = %e, "Async SubmitReport RPC failed");
                    metrics::record_rpc_failure("submit_report");
                }
            }
            if let Some(callback) = callback {
                callback(result);
            }
        }))
    }

    /// Latest report the service holds for `subject`.
    pub async fn get_report(&self, subject: &str) -> Option<Report> {
        match self.service.get_latest_report(subject).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "GetLatestReport RPC failed");
                metrics::record_rpc_failure("get_latest_report");
                None
            }
        }
    }

    pub async fn observe(&self, subject: &str) -> bool {
        tracing::info!(subject = %subject, "Start observing");
        match self.service.observe(subject).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "Observe RPC failed");
                metrics::record_rpc_failure("observe");
                false
            }
        }
    }

    pub async fn stop_observing(&self, subject: &str) -> bool {
        tracing::info!(subject = %subject, "Stop observing");
        match self.service.stop_observing(subject).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "StopObserving RPC failed");
                metrics::record_rpc_failure("stop_observing");
                false
            }
        }
    }

    /// Ping the service; returns its clock reading.
    pub async fn ping(&self) -> Option<Timestamp> {
        let source = Peer {
            id: self.client_id().unwrap_or_default(),
            addr: "localhost".to_string(),
        };
        let sent = self.clock.now_millis();
        match self.service.ping(&source, sent).await {
            Ok(time) => {
                let skew_ms = time as i64 - sent as i64;
                tracing::info!(server_time = time, skew_ms, "Got ping reply");
                Some(time)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ping RPC failed");
                metrics::record_rpc_failure("ping");
                None
            }
        }
    }

    /// Number of background submissions still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait up to `grace` for background submissions, then close the
    /// transport. Submissions still running are abandoned.
    pub async fn shutdown(&self, grace: Duration) {
        if tokio::time::timeout(grace, self.in_flight.wait_idle()).await.is_err() {
            tracing::warn!(abandoned = self.in_flight(), "Shutdown grace period elapsed with calls in flight");
        }
        self.service.close().await;
        self.registration.store(None);
        tracing::info!("Health client shut down");
    }
}
