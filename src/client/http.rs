//! JSON-over-HTTP transport to the Health Service.
//!
//! # Responsibilities
//! - Map each service call to one HTTP request
//! - Bound every call with a timeout
//! - Tag every call with a request id for correlation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::client::wire::{
    ObserveReply, ObserveRequest, Peer, PingReply, PingRequest, RegisterReply, RegisterRequest,
    SubmitReportReply, SubmitReportRequest,
};
use crate::client::{Handle, HealthService, RpcError, RpcResult};
use crate::types::{Report, SubmitStatus, Timestamp};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Health Service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpHealthService {
    client: Client,
    base_url: Url,
}

impl HttpHealthService {
    /// Connect to `host:port` over plain HTTP.
    pub fn new(server_addr: &str, timeout: Duration) -> RpcResult<Self> {
        let base_url: Url = format!("http://{}/", server_addr)
            .parse()
            .map_err(|e| RpcError::Transport(format!("Invalid server address '{}': {}", server_addr, e)))?;
        Self::with_base_url(base_url, timeout)
    }

    pub fn with_base_url(base_url: Url, timeout: Duration) -> RpcResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> RpcResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RpcError::Transport(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tagged(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
    }

    async fn post<Req, Resp>(&self, segments: &[&str], body: &Req) -> RpcResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let response = self.tagged(self.client.post(url)).json(body).send().await?;
        decode(response).await
    }
}

async fn decode<Resp: DeserializeOwned>(response: reqwest::Response) -> RpcResult<Resp> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RpcError::Status {
            code: status.as_u16(),
            body,
        });
    }
    response.json::<Resp>().await.map_err(RpcError::from)
}

#[async_trait]
impl HealthService for HttpHealthService {
    async fn register(&self, module: &str, observer: &str) -> RpcResult<Handle> {
        let request = RegisterRequest {
            module: module.to_string(),
            observer: observer.to_string(),
        };
        let reply: RegisterReply = self.post(&["v1", "register"], &request).await?;
        Ok(reply.handle)
    }

    async fn submit_report(&self, handle: Handle, report: &Report) -> RpcResult<SubmitStatus> {
        let request = SubmitReportRequest {
            handle,
            report: report.clone(),
        };
        let reply: SubmitReportReply = self.post(&["v1", "reports"], &request).await?;
        Ok(reply.result)
    }

    async fn get_latest_report(&self, subject: &str) -> RpcResult<Option<Report>> {
        let url = self.endpoint(&["v1", "reports", subject, "latest"])?;
        let response = self.tagged(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    async fn observe(&self, subject: &str) -> RpcResult<bool> {
        let request = ObserveRequest {
            subject: subject.to_string(),
        };
        let reply: ObserveReply = self.post(&["v1", "observe"], &request).await?;
        Ok(reply.success)
    }

    async fn stop_observing(&self, subject: &str) -> RpcResult<bool> {
        let request = ObserveRequest {
            subject: subject.to_string(),
        };
        let reply: ObserveReply = self.post(&["v1", "stop-observing"], &request).await?;
        Ok(reply.success)
    }

    async fn ping(&self, source: &Peer, time: Timestamp) -> RpcResult<Timestamp> {
        let request = PingRequest {
            source: source.clone(),
            time,
        };
        let reply: PingReply = self.post(&["v1", "ping"], &request).await?;
        Ok(reply.time)
    }
}
