//! Queued units of work for the request processor.

use crate::types::health::{Status, Timestamp};

/// A caller's sample waiting to be vetted and forwarded.
#[derive(Debug, Clone, PartialEq)]
pub struct InformRequest {
    pub subject: String,
    pub name: String,
    pub status: Status,
    pub score: f32,
    /// Translate `subject` through the resolver before vetting.
    pub resolve: bool,
    /// Dispatch without blocking the processor on the reply.
    pub is_async: bool,
    /// Sampling instant; carried into the observation instead of dispatch time.
    pub submit_time: Timestamp,
}

impl InformRequest {
    pub fn new(
        subject: impl Into<String>,
        name: impl Into<String>,
        status: Status,
        score: f32,
        submit_time: Timestamp,
    ) -> Self {
        Self {
            subject: subject.into(),
            name: name.into(),
            status,
            score,
            resolve: false,
            is_async: false,
            submit_time,
        }
    }

    pub fn resolve(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn asynchronous(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// Message on the processor queue.
#[derive(Debug)]
pub enum Command {
    Inform(InformRequest),
    /// Terminates the consumer loop; carries no payload.
    Poison,
}
