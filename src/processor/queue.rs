//! Producer side of the request pipeline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};

use crate::clock::Clock;
use crate::observability::metrics;
use crate::types::{Command, InformRequest, Status};

/// Requests queued but not yet taken off by the consumer.
#[derive(Debug, Default)]
pub(crate) struct Backlog {
    count: AtomicUsize,
    drained: Notify,
}

impl Backlog {
    fn push(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    async fn wait_empty(&self) {
        loop {
            let notified = self.drained.notified();
            if self.len() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Cloneable handle for enqueuing inform requests from any thread.
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<Command>,
    closed: Arc<AtomicBool>,
    backlog: Arc<Backlog>,
    clock: Arc<dyn Clock>,
}

impl RequestQueue {
    /// Create a queue and the receiver its consumer reads from.
    pub fn channel(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            backlog: Arc::new(Backlog::default()),
            clock,
        };
        (queue, rx)
    }

    /// Queue a sample stamped with the current time.
    pub fn add(
        &self,
        subject: &str,
        name: &str,
        status: Status,
        score: f32,
        resolve: bool,
        is_async: bool,
    ) -> bool {
        let request = InformRequest::new(subject, name, status, score, self.clock.now_millis())
            .resolve(resolve)
            .asynchronous(is_async);
        self.submit(request)
    }

    /// Queue a prepared request, keeping its submit time.
    ///
    /// Returns false when the queue has been shut down.
    pub fn submit(&self, request: InformRequest) -> bool {
        if self.is_closed() {
            tracing::debug!(subject = %request.subject, metric = %request.name, "Queue closed, dropping request");
            return false;
        }
        tracing::debug!(
            subject = %request.subject,
            metric = %request.name,
            status = %request.status,
            time = request.submit_time,
            "Queuing report"
        );
        metrics::record_inform(request.status);
        self.backlog.push();
        if self.tx.send(Command::Inform(request)).is_err() {
            self.backlog.done();
            return false;
        }
        true
    }

    /// Requests the consumer has not finished with yet.
    pub fn backlog(&self) -> usize {
        self.backlog.len()
    }

    /// Wait until the consumer has handled everything queued so far.
    /// Returns false if `timeout` passed first.
    pub async fn flush(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.backlog.wait_empty()).await.is_ok()
    }

    /// Discard everything still queued and stop the consumer.
    ///
    /// The closed flag is raised before the poison command is sent, so every
    /// request ahead of the poison is dropped by the consumer.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Shutting down request processor");
        let _ = self.tx.send(Command::Poison);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    pub(crate) fn backlog_handle(&self) -> Arc<Backlog> {
        self.backlog.clone()
    }

    /// Enqueue without the closed check, as a producer that lost the race
    /// with `shutdown` would.
    #[cfg(test)]
    pub(crate) fn submit_unchecked(&self, request: InformRequest) -> bool {
        self.backlog.push();
        if self.tx.send(Command::Inform(request)).is_err() {
            self.backlog.done();
            return false;
        }
        true
    }
}
