//! Request and reply bodies of the HTTP transport.

use serde::{Deserialize, Serialize};

use crate::client::Handle;
use crate::types::{Report, SubmitStatus, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub module: String,
    pub observer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReply {
    pub handle: Handle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReportRequest {
    pub handle: Handle,
    pub report: Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReportReply {
    pub result: SubmitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserveRequest {
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserveReply {
    pub success: bool,
}

/// Identity of the pinging process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub id: String,
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingRequest {
    pub source: Peer,
    pub time: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingReply {
    pub time: Timestamp,
}
