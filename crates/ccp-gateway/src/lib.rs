//! CCP Gateway - context compression proxy
//!
//! This crate implements the HTTP front of the proxy, handling:
//! - API-key authentication against a static identity map
//! - Per-identity sliding-window rate limiting
//! - Context reduction and upstream dispatch (the request pipeline)
//! - Prometheus metrics and liveness endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod rate_limit;
pub mod router;

pub use auth::{AuthError, Identity, IdentityMap};
pub use config::{ConfigError, GatewayArgs, Settings};
pub use error::{GatewayError, GatewayResult};
pub use pipeline::Pipeline;
pub use router::build_routes;

/// Gateway version
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");
