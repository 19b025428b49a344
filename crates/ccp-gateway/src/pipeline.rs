//! Request pipeline
//!
//! Every proxied call runs through the same fixed sequence:
//!
//! 1. authenticate the API key
//! 2. admit against the caller's sliding window
//! 3. parse the body and split query from context
//! 4. reduce the context and record token counters
//! 5. rewrite the payload and dispatch it upstream (timed)
//!
//! Unauthenticated callers never touch limiter state, and the body is only
//! parsed for admitted callers. A slot consumed in step 2 and counters
//! recorded in step 4 are kept even if dispatch fails.

use std::sync::Arc;

use anyhow::Context as _;
use ccp_context::{ContextReducer, Prepared, TokenUsage, TruncatingReducer};
use ccp_protocol::ChatCompletionRequest;
use ccp_runtime::{select_upstream, Upstream, UpstreamResponse};
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::auth::IdentityMap;
use crate::config::Settings;
use crate::error::{GatewayError, GatewayResult};
use crate::metrics::GatewayMetrics;
use crate::rate_limit::{Admission, SlidingWindowLimiter};

pub struct Pipeline {
    identities: IdentityMap,
    limiter: SlidingWindowLimiter,
    reducer: Arc<dyn ContextReducer>,
    upstream: Arc<dyn Upstream>,
    metrics: GatewayMetrics,
}

impl Pipeline {
    pub fn new(
        identities: IdentityMap,
        limiter: SlidingWindowLimiter,
        reducer: Arc<dyn ContextReducer>,
        upstream: Arc<dyn Upstream>,
        metrics: GatewayMetrics,
    ) -> Self {
        Self {
            identities,
            limiter,
            reducer,
            upstream,
            metrics,
        }
    }

    /// Wire the default components from validated settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let reducer = Prepared::new(TruncatingReducer::new(settings.reduction_budget))
            .context("failed to prepare context reducer")?;
        let upstream = select_upstream(&settings.upstream_api_key, &settings.upstream_base_url)
            .context("failed to configure upstream")?;
        let metrics = GatewayMetrics::new().context("failed to register metrics")?;

        Ok(Self::new(
            settings.identities.clone(),
            SlidingWindowLimiter::new(settings.rate_limit_per_minute),
            Arc::new(reducer),
            upstream,
            metrics,
        ))
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    pub fn upstream_name(&self) -> &'static str {
        self.upstream.name()
    }

    pub fn reducer_name(&self) -> &'static str {
        self.reducer.name()
    }

    /// Run one inbound call through the pipeline.
    #[instrument(
        name = "chat_completion",
        skip_all,
        fields(request_id = %Uuid::new_v4(), identity = tracing::field::Empty)
    )]
    pub async fn handle(
        &self,
        credential: Option<&str>,
        body: &[u8],
    ) -> GatewayResult<UpstreamResponse> {
        let identity = self.identities.authenticate(credential).map_err(|err| {
            debug!(error = %err, "authentication failed");
            err
        })?;
        Span::current().record("identity", identity.label());

        if let Admission::Throttled { retry_after } = self.limiter.admit(identity.credential()) {
            warn!(capacity = self.limiter.capacity(), "rate limit exceeded");
            return Err(GatewayError::RateLimited { retry_after });
        }

        let request = ChatCompletionRequest::from_slice(body)?;
        let (reduced_context, usage) = {
            let conversation = request.conversation()?;
            let query = conversation.query.content.as_str();
            let reduced = self.reducer.reduce(query, &conversation.context);
            let usage = TokenUsage::measure(query, &conversation.context, &reduced);
            (reduced, usage)
        };

        self.metrics.record_tokens(usage);
        debug!(
            tokens_before = usage.before,
            tokens_after = usage.after,
            reducer = self.reducer.name(),
            "context reduced"
        );

        let payload = request.into_reduced(reduced_context)?;

        let dispatched = {
            let _timer = self.metrics.start_dispatch_timer();
            self.upstream.dispatch(&payload).await
        };

        match dispatched {
            Ok(response) => {
                info!(
                    status = response.status,
                    upstream = self.upstream.name(),
                    "request forwarded"
                );
                Ok(response)
            }
            Err(err) => {
                error!(error = %err, upstream = self.upstream.name(), "upstream dispatch failed");
                Err(err.into())
            }
        }
    }
}
