//! Offline upstream used when no API key is configured.

use async_trait::async_trait;
use ccp_protocol::{stub_completion, ChatCompletionRequest};

use crate::{Upstream, UpstreamResponse, UpstreamResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct StubUpstream;

#[async_trait]
impl Upstream for StubUpstream {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn dispatch(&self, _payload: &ChatCompletionRequest) -> UpstreamResult<UpstreamResponse> {
        Ok(UpstreamResponse::ok(stub_completion()))
    }
}
