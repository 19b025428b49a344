//! CCP Gateway - entry point
//!
//! Parses configuration from flags and `CCP_*` environment variables, wires
//! the request pipeline and serves it until Ctrl-C or SIGTERM.

use std::sync::Arc;

use anyhow::Context as _;
use ccp_gateway::{build_routes, GatewayArgs, Pipeline, Settings, GATEWAY_VERSION};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = GatewayArgs::parse();
    init_tracing(args.log_json);

    tracing::info!("Starting CCP Gateway v{}", GATEWAY_VERSION);

    let settings = Settings::try_from(args).context("invalid configuration")?;
    if settings.identities.is_empty() {
        tracing::warn!("CCP_USER_TOKENS is empty; every request will be rejected with 401");
    }

    let pipeline = Arc::new(Pipeline::from_settings(&settings)?);
    tracing::info!(
        identities = settings.identities.len(),
        rate_limit_per_minute = settings.rate_limit_per_minute,
        reduction_budget = settings.reduction_budget,
        upstream = pipeline.upstream_name(),
        upstream_base_url = %settings.upstream_base_url,
        "gateway configuration loaded"
    );

    let app = build_routes(pipeline).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    tracing::info!("Listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("CCP Gateway stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ccp_gateway=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
