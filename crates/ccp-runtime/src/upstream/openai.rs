//! OpenAI-compatible upstream
//!
//! Forwards the rewritten payload to `{base_url}/chat/completions` with a
//! bearer credential and returns the upstream status and JSON body as is.
//! No retries and no timeout beyond the client defaults.

use async_trait::async_trait;
use ccp_protocol::ChatCompletionRequest;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Upstream, UpstreamError, UpstreamResponse, UpstreamResult};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAIUpstream {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIUpstream {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> UpstreamResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("ccp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| UpstreamError::Client(err.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        )
    }
}

#[async_trait]
impl Upstream for OpenAIUpstream {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn dispatch(&self, payload: &ChatCompletionRequest) -> UpstreamResult<UpstreamResponse> {
        let endpoint = self.endpoint();
        debug!(endpoint = %endpoint, "forwarding chat completion");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|err| UpstreamError::Decode {
                status,
                message: err.to_string(),
            })?;

        if !(200..300).contains(&status) {
            warn!(status, "upstream returned an error status");
        }

        Ok(UpstreamResponse { status, body })
    }
}
