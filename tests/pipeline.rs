//! End-to-end behavior of the reporting pipeline over the in-memory service.

use std::time::Duration;

use dh_client::config::ClientConfig;
use dh_client::pending::ClearOutcome;
use dh_client::resolver::SubjectAddress;
use dh_client::types::Status;

mod common;

use common::WAIT;

#[tokio::test]
async fn test_healthy_chatter_is_aggregated() {
    let mut config = ClientConfig::default();
    config.aggregation.interval_ms = 10_000;
    let (reporter, service, clock) = common::memory_reporter(config).await;

    // First sight goes straight through.
    reporter.inform("TS_2", "cpu", Status::Healthy, 10.0, false);
    assert!(reporter.flush(WAIT).await);
    assert_eq!(service.report_count(), 1);

    for score in [20.0, 30.0, 40.0] {
        clock.advance(Duration::from_secs(1));
        reporter.inform("TS_2", "cpu", Status::Healthy, score, false);
    }
    assert!(reporter.flush(WAIT).await);
    assert_eq!(service.report_count(), 1);

    // Past the window the next sample flushes the average.
    clock.advance(Duration::from_secs(10));
    reporter.inform("TS_2", "cpu", Status::Healthy, 50.0, false);
    assert!(reporter.flush(WAIT).await);

    let reports = service.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].observation.metric("cpu").unwrap().score, 30.0);
    reporter.shutdown().await;
}

#[tokio::test]
async fn test_unhealthy_always_forwarded() {
    let (reporter, service, _clock) = common::memory_reporter(ClientConfig::default()).await;
    for i in 0..5 {
        reporter.inform("TS_2", "cpu", Status::Unhealthy, i as f32, false);
    }
    assert!(reporter.flush(WAIT).await);
    assert_eq!(service.report_count(), 5);
    reporter.shutdown().await;
}

#[tokio::test]
async fn test_distress_window_lifecycle() {
    let mut config = ClientConfig::default();
    config.pending.expire_ms = 25;
    let (reporter, service, clock) = common::memory_reporter(config).await;

    // Resolved in time: nothing is reported.
    reporter.add_pending("TS_2", "cpu", "op-1", 30.0, false);
    assert_eq!(reporter.clear_pending("TS_2", "cpu", "op-1", 30.0, false), ClearOutcome::Resolved);

    // Left open: escalated once, then corrected when finally cleared.
    reporter.add_pending("TS_2", "cpu", "op-2", 30.0, false);
    let opened = 1_000_000;
    clock.advance(Duration::from_secs(3));
    assert!(service.wait_for_reports(1, WAIT).await);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.report_count(), 1);
    let escalation = &service.reports()[0];
    assert_eq!(escalation.subject, "TS_2");
    assert_eq!(escalation.observation.ts, opened);
    assert_eq!(escalation.observation.metric("cpu").unwrap().status, Status::Pending);

    assert_eq!(reporter.clear_pending("TS_2", "cpu", "op-2", 1.0, false), ClearOutcome::Corrected);
    assert!(service.wait_for_reports(2, WAIT).await);
    assert_eq!(service.reports()[1].observation.metric("cpu").unwrap().status, Status::Healthy);

    reporter.shutdown().await;
}

#[tokio::test]
async fn test_resolved_addresses_report_under_subject() {
    let (reporter, service, _clock) = common::memory_reporter(ClientConfig::default()).await;
    reporter.map_subject(
        "TS_3",
        SubjectAddress::new("zk3.local", "10.0.0.3:2181".parse().unwrap()),
    );

    reporter.inform("10.0.0.3", "net", Status::Unhealthy, 1.0, true);
    reporter.inform("10.0.0.9", "net", Status::Unhealthy, 1.0, true);
    assert!(reporter.flush(WAIT).await);

    let subjects: Vec<String> = service.reports().into_iter().map(|r| r.subject).collect();
    assert_eq!(subjects, vec!["TS_3", "10.0.0.9"]);
    reporter.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_is_orderly() {
    let mut config = ClientConfig::default();
    config.pending.expire_ms = 60_000;
    let (reporter, service, _clock) = common::memory_reporter(config).await;

    reporter.add_pending("TS_2", "cpu", "op-1", 30.0, false);
    reporter.inform_async("TS_2", "cpu", Status::Unhealthy, 5.0, false);
    assert!(reporter.flush(WAIT).await);

    reporter.shutdown().await;
    assert_eq!(reporter.pending_count(), 0);
    assert!(!reporter.client().is_ready());
    // The async submission finished inside the grace period.
    assert_eq!(service.report_count(), 1);
    assert!(!reporter.inform("TS_2", "cpu", Status::Unhealthy, 5.0, false));
}
