//! Pending tracker: escalates distress windows nobody resolved.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::clock::Clock;
use crate::config::PendingConfig;
use crate::observability::metrics;
use crate::processor::RequestQueue;
use crate::types::{InformRequest, Status, Timestamp};

/// Floor for the sweep period; tokio intervals reject zero.
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// An open distress window.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub subject: String,
    pub name: String,
    pub score: f32,
    pub resolve: bool,
    pub submit_time: Timestamp,
}

/// What `clear` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The window was still open and is now closed; nothing is sent.
    Resolved,
    /// The sweep had already escalated it; a HEALTHY correction was queued.
    Corrected,
}

/// Tracks distress windows keyed by caller-chosen request ids.
pub struct PendingTracker {
    entries: DashMap<String, PendingEntry>,
    expiration_ms: u64,
    queue: RequestQueue,
    clock: Arc<dyn Clock>,
}

impl PendingTracker {
    pub fn new(config: &PendingConfig, queue: RequestQueue, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            expiration_ms: config.expire_ms,
            queue,
            clock,
        }
    }

    /// Open a distress window. Re-adding an id replaces the earlier entry.
    pub fn add(&self, subject: &str, name: &str, request_id: &str, score: f32, resolve: bool) {
        let entry = PendingEntry {
            subject: subject.to_string(),
            name: name.to_string(),
            score,
            resolve,
            submit_time: self.clock.now_millis(),
        };
        tracing::debug!(request_id = %request_id, subject = %subject, metric = %name, "Pending request added");
        if self.entries.insert(request_id.to_string(), entry).is_some() {
            tracing::debug!(request_id = %request_id, "Replaced earlier pending request");
        }
        metrics::record_pending_entries(self.entries.len());
    }

    /// Close a distress window.
    ///
    /// If the sweep got there first, a HEALTHY report is queued so the
    /// service learns the condition has cleared.
    pub fn clear(
        &self,
        subject: &str,
        name: &str,
        request_id: &str,
        score: f32,
        resolve: bool,
    ) -> ClearOutcome {
        if self.entries.remove(request_id).is_some() {
            tracing::debug!(request_id = %request_id, subject = %subject, metric = %name, "Pending request resolved");
            metrics::record_pending_entries(self.entries.len());
            return ClearOutcome::Resolved;
        }

        tracing::info!(request_id = %request_id, subject = %subject, metric = %name, "Pending request already escalated, reporting recovery");
        metrics::record_pending_correction();
        self.queue.add(subject, name, Status::Healthy, score, resolve, true);
        ClearOutcome::Corrected
    }

    /// Escalate every entry at least `expire_ms` old. Returns how many were escalated.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let expired = |entry: &PendingEntry| now.saturating_sub(entry.submit_time) >= self.expiration_ms;

        // Collect first: removing while iterating would deadlock the shard.
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|r| expired(r.value()))
            .map(|r| r.key().clone())
            .collect();

        let mut escalated = 0;
        for request_id in candidates {
            // A concurrent clear or re-add may have won since the scan.
            let Some((request_id, entry)) = self.entries.remove_if(&request_id, |_, e| expired(e)) else {
                continue;
            };
            tracing::info!(
                request_id = %request_id,
                subject = %entry.subject,
                metric = %entry.name,
                age_ms = now.saturating_sub(entry.submit_time),
                "Escalating unresolved pending request"
            );
            let request = InformRequest::new(entry.subject, entry.name, Status::Pending, entry.score, entry.submit_time)
                .resolve(entry.resolve)
                .asynchronous(true);
            self.queue.submit(request);
            metrics::record_pending_escalation();
            escalated += 1;
        }

        if escalated > 0 {
            metrics::record_pending_entries(self.entries.len());
        }
        escalated
    }

    /// Drop every open window without escalating. Returns how many were dropped.
    pub fn discard_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        metrics::record_pending_entries(0);
        count
    }

    pub fn get(&self, request_id: &str) -> Option<PendingEntry> {
        self.entries.get(request_id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }

    /// Sweep every `expire_ms` until shutdown, then discard what is left.
    ///
    /// A zero expiration sweeps every millisecond.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let period = self.expiration().max(MIN_SWEEP_PERIOD);
        tracing::info!(expire_ms = self.expiration_ms, "Pending tracker started");

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Pending tracker received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        let dropped = self.discard_all();
        if dropped > 0 {
            tracing::info!(dropped, "Discarded unresolved pending requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use tokio::sync::mpsc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::lifecycle::Shutdown;
    use crate::types::Command;

    fn tracker(expire_ms: u64) -> (Arc<PendingTracker>, mpsc::UnboundedReceiver<Command>, ManualClock) {
        let clock = ManualClock::new(100_000);
        let (queue, rx) = RequestQueue::channel(Arc::new(clock.clone()));
        let tracker = PendingTracker::new(&PendingConfig { expire_ms }, queue, Arc::new(clock.clone()));
        (Arc::new(tracker), rx, clock)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Command>) -> Vec<InformRequest> {
        let mut out = Vec::new();
        while let Ok(Command::Inform(request)) = rx.try_recv() {
            out.push(request);
        }
        out
    }

    #[test]
    fn test_clear_before_expiry_sends_nothing() {
        let (tracker, mut rx, clock) = tracker(3000);
        tracker.add("TS_2", "cpu", "req1", 30.0, false);
        clock.advance(Duration::from_millis(900));

        assert_eq!(tracker.clear("TS_2", "cpu", "req1", 30.0, false), ClearOutcome::Resolved);
        assert!(tracker.is_empty());

        clock.advance(Duration::from_secs(10));
        assert_eq!(tracker.sweep(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_unresolved_entry_escalates_once() {
        let (tracker, mut rx, clock) = tracker(3000);
        tracker.add("TS_2", "cpu", "req1", 30.0, false);
        let submitted = clock.now_millis();

        clock.advance(Duration::from_millis(2999));
        assert_eq!(tracker.sweep(), 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(tracker.sweep(), 1);
        assert_eq!(tracker.sweep(), 0);

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "TS_2");
        assert_eq!(sent[0].name, "cpu");
        assert_eq!(sent[0].status, Status::Pending);
        assert_eq!(sent[0].score, 30.0);
        assert_eq!(sent[0].submit_time, submitted);
    }

    #[test]
    fn test_late_clear_sends_healthy_correction() {
        let (tracker, mut rx, clock) = tracker(3000);
        tracker.add("TS_2", "cpu", "req1", 30.0, true);
        clock.advance(Duration::from_secs(4));
        tracker.sweep();

        assert_eq!(tracker.clear("TS_2", "cpu", "req1", 5.0, true), ClearOutcome::Corrected);
        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].status, Status::Pending);
        assert!(sent[0].resolve);
        assert_eq!(sent[1].status, Status::Healthy);
        assert_eq!(sent[1].score, 5.0);
        assert_eq!(sent[1].submit_time, clock.now_millis());
    }

    #[test]
    fn test_readd_replaces_entry() {
        let (tracker, mut rx, clock) = tracker(3000);
        tracker.add("TS_2", "cpu", "req1", 30.0, false);
        clock.advance(Duration::from_secs(2));
        tracker.add("TS_2", "disk", "req1", 50.0, false);
        assert_eq!(tracker.len(), 1);

        // The replacement restarted the window.
        clock.advance(Duration::from_secs(2));
        assert_eq!(tracker.sweep(), 0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(tracker.sweep(), 1);
        assert_eq!(drain(&mut rx)[0].name, "disk");
    }

    #[test]
    fn test_clear_and_sweep_race_has_single_winner() {
        const IDS: usize = 200;
        let (tracker, mut rx, clock) = tracker(3000);
        for i in 0..IDS {
            tracker.add("TS_2", "cpu", &format!("req{}", i), i as f32, false);
        }
        clock.advance(Duration::from_secs(5));

        let barrier = Arc::new(Barrier::new(2));
        let sweeper = {
            let tracker = tracker.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                tracker.sweep()
            })
        };
        let clearer = {
            let tracker = tracker.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                (0..IDS)
                    .filter(|i| {
                        tracker.clear("TS_2", "cpu", &format!("req{}", i), 0.0, false) == ClearOutcome::Corrected
                    })
                    .count()
            })
        };
        let escalated = sweeper.join().unwrap();
        let corrected = clearer.join().unwrap();

        // Every escalated id is later corrected; every resolved one never escalates.
        assert_eq!(escalated, corrected);
        let sent = drain(&mut rx);
        let pending = sent.iter().filter(|r| r.status == Status::Pending).count();
        let healthy = sent.iter().filter(|r| r.status == Status::Healthy).count();
        assert_eq!(pending, escalated);
        assert_eq!(healthy, corrected);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_discard_all_does_not_escalate() {
        let (tracker, mut rx, clock) = tracker(3000);
        tracker.add("TS_2", "cpu", "req1", 30.0, false);
        tracker.add("TS_3", "cpu", "req2", 30.0, false);
        assert_eq!(tracker.discard_all(), 2);
        clock.advance(Duration::from_secs(10));
        assert_eq!(tracker.sweep(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_periodic_sweep_and_shutdown() {
        let (tracker, mut rx, clock) = tracker(20);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(tracker.clone().run(shutdown.subscribe()));

        tracker.add("TS_2", "cpu", "req1", 30.0, false);
        clock.advance(Duration::from_secs(1));

        let command = time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        match command {
            Command::Inform(request) => assert_eq!(request.status, Status::Pending),
            Command::Poison => panic!("unexpected poison"),
        }

        tracker.add("TS_2", "cpu", "req2", 30.0, false);
        shutdown.trigger();
        task.await.unwrap();
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn test_zero_expiration_still_sweeps() {
        let (tracker, mut rx, clock) = tracker(0);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(tracker.clone().run(shutdown.subscribe()));

        tracker.add("TS_2", "cpu", "req1", 30.0, false);
        clock.advance(Duration::from_secs(10));

        let command = time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(command, Command::Inform(ref r) if r.status == Status::Pending));
        assert!(tracker.is_empty());

        shutdown.trigger();
        task.await.unwrap();
    }
}
