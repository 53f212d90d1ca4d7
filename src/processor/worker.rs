//! Consumer side of the request pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::aggregation::RateLimiter;
use crate::client::HealthClient;
use crate::observability::metrics;
use crate::processor::queue::{Backlog, RequestQueue};
use crate::resolver::{AddressKind, SubjectResolver};
use crate::types::{Command, InformRequest};

/// Counters returned when the consumer loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Requests vetted by the rate limiter.
    pub processed: u64,
    /// Requests the limiter approved and the client took for delivery.
    pub forwarded: u64,
    /// Requests dropped because shutdown had begun.
    pub discarded: u64,
}

/// Single consumer of the request queue.
pub struct RequestProcessor {
    rx: mpsc::UnboundedReceiver<Command>,
    closed: Arc<AtomicBool>,
    backlog: Arc<Backlog>,
    limiter: Arc<RateLimiter>,
    resolver: Arc<SubjectResolver>,
    client: Arc<HealthClient>,
}

impl RequestProcessor {
    pub fn new(
        queue: &RequestQueue,
        rx: mpsc::UnboundedReceiver<Command>,
        limiter: Arc<RateLimiter>,
        resolver: Arc<SubjectResolver>,
        client: Arc<HealthClient>,
    ) -> Self {
        Self {
            rx,
            closed: queue.closed_flag(),
            backlog: queue.backlog_handle(),
            limiter,
            resolver,
            client,
        }
    }

    /// Drain the queue until the poison command arrives or every producer is gone.
    pub async fn run(mut self) -> ProcessorStats {
        tracing::info!("Request processor started");
        let mut stats = ProcessorStats::default();

        while let Some(command) = self.rx.recv().await {
            let request = match command {
                Command::Poison => {
                    self.drain_behind_poison(&mut stats);
                    break;
                }
                Command::Inform(request) => request,
            };
            if self.closed.load(Ordering::SeqCst) {
                stats.discarded += 1;
            } else {
                stats.processed += 1;
                if self.process(request).await {
                    stats.forwarded += 1;
                }
            }
            self.backlog.done();
        }

        if stats.discarded > 0 {
            tracing::info!(discarded = stats.discarded, "Discarded queued requests on shutdown");
            metrics::record_requests_discarded(stats.discarded);
        }
        tracing::info!(
            processed = stats.processed,
            forwarded = stats.forwarded,
            "Request processor exited loop"
        );
        stats
    }

    /// Close the channel and discard whatever raced in behind the poison.
    ///
    /// Once closed, late producers see a failed send and settle the backlog
    /// themselves, so nothing is left counted.
    fn drain_behind_poison(&mut self, stats: &mut ProcessorStats) {
        self.rx.close();
        while let Ok(command) = self.rx.try_recv() {
            if let Command::Inform(_) = command {
                stats.discarded += 1;
                self.backlog.done();
            }
        }
    }

    /// Resolve, vet and forward one request.
    ///
    /// Returns whether the client took the report: false when the limiter
    /// absorbed it or the client is not ready.
    pub async fn process(&self, mut request: InformRequest) -> bool {
        if request.resolve {
            if let Some(resolved) = self.resolver.resolve(&request.subject, AddressKind::Ip) {
                tracing::debug!(address = %request.subject, subject = %resolved, "Resolved subject");
                request.subject = resolved;
            }
        }

        let Some(metric) = self
            .limiter
            .vet(&request.subject, &request.name, request.status, request.score)
        else {
            return false;
        };

        if request.is_async {
            self.client
                .report_async(request.submit_time, &request.subject, vec![metric], None)
                .is_some()
        } else {
            self.client
                .report_at(request.submit_time, &request.subject, vec![metric])
                .await
                .is_some()
        }
    }
}
