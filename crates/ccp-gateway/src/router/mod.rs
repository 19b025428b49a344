//! HTTP routes for the CCP gateway

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::auth::credential_from_headers;
use crate::error::{GatewayError, GatewayResult};
use crate::metrics::TEXT_FORMAT;
use crate::pipeline::Pipeline;

/// Build the main router for the gateway
pub fn build_routes(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(pipeline)
}

/// Liveness endpoint
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// The body is taken raw so that authentication and admission run before
/// any parsing.
async fn chat_completions(
    State(pipeline): State<Arc<Pipeline>>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayResult<Response> {
    let upstream = pipeline
        .handle(credential_from_headers(&headers), &body)
        .await?;

    let status = StatusCode::from_u16(upstream.status).map_err(|_| {
        GatewayError::Internal(format!("upstream sent invalid status {}", upstream.status))
    })?;

    Ok((status, Json(upstream.body)).into_response())
}

async fn metrics(State(pipeline): State<Arc<Pipeline>>) -> GatewayResult<Response> {
    let body = pipeline
        .metrics()
        .export()
        .map_err(|err| GatewayError::Internal(err.to_string()))?;

    Ok(([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response())
}
