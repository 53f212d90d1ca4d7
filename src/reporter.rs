//! Reporter context: the object a host process builds once and keeps.
//!
//! # Data Flow
//! ```text
//! inform / inform_async ──▶ RequestQueue ──▶ RequestProcessor ──▶ HealthClient
//!                                ▲               (resolve, vet)
//! add_pending / clear_pending    │
//!     ──▶ PendingTracker ── sweep/correction
//! ```
//!
//! # Design Decisions
//! - Everything the pipeline shares lives here, not in process-wide statics
//! - A failed registration still yields a reporter; its reports are dropped
//!   by the client until it is re-initialized
//! - Shutdown is ordered: sweep, processor, then the client's grace period

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::aggregation::RateLimiter;
use crate::client::{HealthClient, HealthService};
use crate::clock::Clock;
use crate::config::validation::validate_config;
use crate::config::{ClientConfig, ConfigError};
use crate::lifecycle::Shutdown;
use crate::pending::{ClearOutcome, PendingTracker};
use crate::processor::{ProcessorStats, RequestProcessor, RequestQueue};
use crate::resolver::{AddressKind, SubjectAddress, SubjectResolver};
use crate::types::Status;

/// Running health reporter.
pub struct Reporter {
    client: Arc<HealthClient>,
    resolver: Arc<SubjectResolver>,
    queue: RequestQueue,
    tracker: Arc<PendingTracker>,
    shutdown: Shutdown,
    processor_task: Mutex<Option<JoinHandle<ProcessorStats>>>,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
    grace: Duration,
}

impl Reporter {
    /// Register with the service and start the processor and sweep tasks.
    ///
    /// The configuration is validated first; nothing is started when it is
    /// rejected. Must be called inside a tokio runtime.
    pub async fn start(
        config: &ClientConfig,
        service: Arc<dyn HealthService>,
        clock: Arc<dyn Clock>,
        module: &str,
        observer: &str,
    ) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let client = Arc::new(HealthClient::new(service, clock.clone()));
        if !client.init(module, observer).await {
            tracing::warn!(module = %module, "Health client not ready; reports will be dropped");
        }

        let resolver = Arc::new(SubjectResolver::from_config(&config.subjects));
        let limiter = Arc::new(RateLimiter::new(&config.aggregation, clock.clone()));

        let (queue, rx) = RequestQueue::channel(clock.clone());
        let processor = RequestProcessor::new(&queue, rx, limiter, resolver.clone(), client.clone());
        let processor_task = tokio::spawn(processor.run());

        let shutdown = Shutdown::new();
        let tracker = Arc::new(PendingTracker::new(&config.pending, queue.clone(), clock));
        let sweep_task = tokio::spawn(tracker.clone().run(shutdown.subscribe()));

        tracing::info!(
            module = %module,
            observer = %observer,
            expire_ms = config.pending.expire_ms,
            aggregate_ms = config.aggregation.interval_ms,
            subjects = resolver.len(),
            "Reporter started"
        );

        Ok(Self {
            client,
            resolver,
            queue,
            tracker,
            shutdown,
            processor_task: Mutex::new(Some(processor_task)),
            sweep_task: Mutex::new(Some(sweep_task)),
            grace: config.transport.shutdown_grace(),
        })
    }

    /// Queue a sample for blocking submission by the processor.
    pub fn inform(&self, subject: &str, name: &str, status: Status, score: f32, resolve: bool) -> bool {
        self.queue.add(subject, name, status, score, resolve, false)
    }

    /// Queue a sample whose submission the processor hands off to the background.
    pub fn inform_async(&self, subject: &str, name: &str, status: Status, score: f32, resolve: bool) -> bool {
        self.queue.add(subject, name, status, score, resolve, true)
    }

    /// Open a distress window that escalates to PENDING unless cleared in time.
    pub fn add_pending(&self, subject: &str, name: &str, request_id: &str, score: f32, resolve: bool) {
        self.tracker.add(subject, name, request_id, score, resolve);
    }

    pub fn clear_pending(
        &self,
        subject: &str,
        name: &str,
        request_id: &str,
        score: f32,
        resolve: bool,
    ) -> ClearOutcome {
        self.tracker.clear(subject, name, request_id, score, resolve)
    }

    pub fn map_subject(&self, subject: &str, address: SubjectAddress) {
        self.resolver.map(subject, address);
    }

    pub fn resolve(&self, key: &str, kind: AddressKind) -> Option<String> {
        self.resolver.resolve(key, kind)
    }

    /// Direct access for blocking report, get_report and observe calls.
    pub fn client(&self) -> &Arc<HealthClient> {
        &self.client
    }

    pub fn pending_count(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for the processor to work through everything queued so far.
    ///
    /// Shutdown drops queued requests, so callers that need them delivered
    /// flush first.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.queue.flush(timeout).await
    }

    /// Tear the pipeline down. Queued and pending work is dropped, not sent.
    ///
    /// Safe to call more than once; later calls return empty stats.
    pub async fn shutdown(&self) -> ProcessorStats {
        self.shutdown.trigger();

        let sweep = self.sweep_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = sweep {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Pending sweep task failed");
            }
        }
        self.tracker.discard_all();

        self.queue.shutdown();
        let processor = self.processor_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        let stats = match processor {
            Some(task) => task.await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Request processor task failed");
                ProcessorStats::default()
            }),
            None => ProcessorStats::default(),
        };

        self.client.shutdown(self.grace).await;
        tracing::info!(
            processed = stats.processed,
            forwarded = stats.forwarded,
            discarded = stats.discarded,
            "Reporter shut down"
        );
        stats
    }
}
