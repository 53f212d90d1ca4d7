//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;

use dh_client::client::wire::{
    ObserveReply, ObserveRequest, PingReply, PingRequest, RegisterReply, RegisterRequest,
    SubmitReportReply, SubmitReportRequest,
};
use dh_client::clock::ManualClock;
use dh_client::config::ClientConfig;
use dh_client::types::{Report, SubmitStatus};
use dh_client::{InMemoryHealthService, Reporter};

/// Fixed clock reading the mock returns from ping.
pub const MOCK_SERVER_TIME: u64 = 1_700_000_000_000;

/// What the mock Health Service has seen.
#[derive(Default)]
pub struct MockState {
    next_handle: AtomicU64,
    pub registrations: Mutex<Vec<RegisterRequest>>,
    pub reports: Mutex<Vec<Report>>,
    pub request_ids: Mutex<Vec<String>>,
    pub observing: Mutex<HashSet<String>>,
    /// Answer every submit with 503.
    pub fail_submits: AtomicBool,
}

impl MockState {
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn request_ids(&self) -> Vec<String> {
        self.request_ids.lock().unwrap().clone()
    }

    fn record_id(&self, headers: &HeaderMap) {
        if let Some(id) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
            self.request_ids.lock().unwrap().push(id.to_string());
        }
    }
}

pub struct MockHealthService {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

/// Start a mock Health Service on an ephemeral port.
pub async fn start_mock_service() -> MockHealthService {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/v1/register", post(register))
        .route("/v1/reports", post(submit_report))
        .route("/v1/reports/{subject}/latest", get(latest_report))
        .route("/v1/observe", post(observe))
        .route("/v1/stop-observing", post(stop_observing))
        .route("/v1/ping", post(ping))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockHealthService { addr, state }
}

async fn register(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Json<RegisterReply> {
    state.record_id(&headers);
    state.registrations.lock().unwrap().push(request);
    let handle = state.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
    Json(RegisterReply { handle })
}

async fn submit_report(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(request): Json<SubmitReportRequest>,
) -> Result<Json<SubmitReportReply>, (StatusCode, String)> {
    state.record_id(&headers);
    if state.fail_submits.load(Ordering::SeqCst) {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "overloaded".to_string()));
    }
    state.reports.lock().unwrap().push(request.report);
    Ok(Json(SubmitReportReply {
        result: SubmitStatus::Accepted,
    }))
}

async fn latest_report(
    State(state): State<Arc<MockState>>,
    Path(subject): Path<String>,
) -> Result<Json<Report>, StatusCode> {
    state
        .reports
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find(|r| r.subject == subject)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn observe(
    State(state): State<Arc<MockState>>,
    Json(request): Json<ObserveRequest>,
) -> Json<ObserveReply> {
    let success = state.observing.lock().unwrap().insert(request.subject);
    Json(ObserveReply { success })
}

async fn stop_observing(
    State(state): State<Arc<MockState>>,
    Json(request): Json<ObserveRequest>,
) -> Json<ObserveReply> {
    let success = state.observing.lock().unwrap().remove(&request.subject);
    Json(ObserveReply { success })
}

async fn ping(Json(_request): Json<PingRequest>) -> Json<PingReply> {
    Json(PingReply {
        time: MOCK_SERVER_TIME,
    })
}

/// A reporter over the in-memory service, driven by a manual clock.
pub async fn memory_reporter(config: ClientConfig) -> (Reporter, Arc<InMemoryHealthService>, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let service = Arc::new(InMemoryHealthService::new());
    let reporter = Reporter::start(&config, service.clone(), Arc::new(clock.clone()), "zookeeper", "peer@1")
        .await
        .unwrap();
    (reporter, service, clock)
}

pub const WAIT: Duration = Duration::from_secs(2);
