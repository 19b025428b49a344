//! Gateway error types

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ccp_protocol::ProtocolError;
use ccp_runtime::UpstreamError;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

/// Terminal failures of a proxied request. None of them are retried.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    #[error(transparent)]
    InvalidRequest(#[from] ProtocolError),

    #[error("upstream unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Whole seconds for a `Retry-After` header, rounded up and never zero.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Never reveal whether a key was missing or unknown.
            GatewayError::Unauthorized(_) => "Invalid API key".to_string(),
            GatewayError::RateLimited { .. } => "Rate limit exceeded".to_string(),
            GatewayError::InvalidRequest(err) => err.to_string(),
            GatewayError::Upstream(_) => "Upstream unavailable".to_string(),
            GatewayError::Internal(_) => "Internal error".to_string(),
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if let GatewayError::RateLimited {
            retry_after: Some(retry_after),
        } = self
        {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }

        response
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
