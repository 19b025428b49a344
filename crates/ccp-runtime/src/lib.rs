//! Runtime abstractions for the upstream chat-completion API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ccp_protocol::ChatCompletionRequest;
use serde_json::Value;
use thiserror::Error;

pub mod upstream;

pub use upstream::{OpenAIUpstream, StubUpstream};

/// Status and JSON body returned by the upstream, passed through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("failed to build upstream client: {0}")]
    Client(String),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("upstream returned an undecodable body (status {status}): {message}")]
    Decode { status: u16, message: String },
    #[error("mock upstream has no queued response")]
    MockQueueEmpty,
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

#[async_trait]
pub trait Upstream: Send + Sync {
    fn name(&self) -> &'static str;

    async fn dispatch(&self, payload: &ChatCompletionRequest) -> UpstreamResult<UpstreamResponse>;
}

/// Pick the real upstream when a credential is configured, otherwise the
/// offline stub.
pub fn select_upstream(api_key: &str, base_url: &str) -> UpstreamResult<Arc<dyn Upstream>> {
    if api_key.is_empty() {
        tracing::info!("no upstream API key configured, serving stub completions");
        return Ok(Arc::new(StubUpstream));
    }

    Ok(Arc::new(OpenAIUpstream::new(api_key, base_url)?))
}

/// Test double that records every payload it receives and replays queued
/// results.
#[derive(Debug, Default)]
pub struct MockUpstream {
    queue: Mutex<VecDeque<UpstreamResult<UpstreamResponse>>>,
    received: Mutex<Vec<ChatCompletionRequest>>,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, result: UpstreamResult<UpstreamResponse>) {
        self.queue
            .lock()
            .expect("mock upstream queue poisoned")
            .push_back(result);
    }

    pub fn received(&self) -> Vec<ChatCompletionRequest> {
        self.received
            .lock()
            .expect("mock upstream log poisoned")
            .clone()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn dispatch(&self, payload: &ChatCompletionRequest) -> UpstreamResult<UpstreamResponse> {
        self.received
            .lock()
            .expect("mock upstream log poisoned")
            .push(payload.clone());

        self.queue
            .lock()
            .expect("mock upstream queue poisoned")
            .pop_front()
            .unwrap_or(Err(UpstreamError::MockQueueEmpty))
    }
}
