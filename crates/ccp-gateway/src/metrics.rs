//! Prometheus metrics for the CCP gateway
//!
//! Metrics live in a registry owned by [`GatewayMetrics`] rather than the
//! process-global default registry, so each pipeline (and each test) gets
//! its own counters.

use ccp_context::TokenUsage;
use prometheus::{Histogram, HistogramOpts, HistogramTimer, IntCounter, Registry, TextEncoder};

/// Content type of the text exposition format.
pub use prometheus::TEXT_FORMAT;

#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    /// Tokens received before compression
    tokens_in: IntCounter,
    /// Tokens removed by compression
    tokens_saved: IntCounter,
    /// Upstream dispatch latency
    request_latency: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let tokens_in = IntCounter::new(
            "tokens_in_total",
            "Number of tokens received before compression",
        )?;
        let tokens_saved = IntCounter::new(
            "tokens_saved_total",
            "Number of tokens removed by compression",
        )?;
        let request_latency = Histogram::with_opts(
            HistogramOpts::new(
                "req_latency_seconds",
                "Latency for /v1/chat/completions requests",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
            ]),
        )?;

        registry.register(Box::new(tokens_in.clone()))?;
        registry.register(Box::new(tokens_saved.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;

        Ok(Self {
            registry,
            tokens_in,
            tokens_saved,
            request_latency,
        })
    }

    pub fn record_tokens(&self, usage: TokenUsage) {
        self.tokens_in.inc_by(usage.before as u64);
        self.tokens_saved.inc_by(usage.saved() as u64);
    }

    /// Observes the elapsed time into the latency histogram when dropped.
    pub fn start_dispatch_timer(&self) -> HistogramTimer {
        self.request_latency.start_timer()
    }

    pub fn tokens_in(&self) -> u64 {
        self.tokens_in.get()
    }

    pub fn tokens_saved(&self) -> u64 {
        self.tokens_saved.get()
    }

    pub fn latency_samples(&self) -> u64 {
        self.request_latency.get_sample_count()
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
