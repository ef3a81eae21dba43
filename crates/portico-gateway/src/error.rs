//! Gateway runtime error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portico_kernel::gateway::GatewayError;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the admin API and by process startup.
#[derive(Debug, Error)]
pub enum GatewayRuntimeError {
    #[error("api not found: {0}")]
    ApiNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Kernel(#[from] GatewayError),

    #[error("key set could not be loaded: {0}")]
    KeySet(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayRuntimeError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayRuntimeError::ApiNotFound(_) => StatusCode::NOT_FOUND,
            GatewayRuntimeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayRuntimeError::Kernel(GatewayError::DuplicateRoute(_)) => StatusCode::CONFLICT,
            GatewayRuntimeError::Kernel(GatewayError::RouteNotFound(_)) => StatusCode::NOT_FOUND,
            GatewayRuntimeError::Kernel(GatewayError::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayRuntimeError::Kernel(_) => StatusCode::BAD_REQUEST,
            GatewayRuntimeError::KeySet(_)
            | GatewayRuntimeError::Config(_)
            | GatewayRuntimeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayRuntimeError>;

/// Failures while forwarding a call to an API's upstream.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream of api '{api_id}' unreachable: {source}")]
    NetworkError {
        api_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream of api '{api_id}' answered {status}: {message}")]
    UpstreamError {
        api_id: String,
        status: u16,
        message: String,
    },
}

/// Why a bearer token was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token is not a structurally valid JWS.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token parsed but no key in the current set verifies it.
    #[error("token rejected: {0}")]
    Rejected(String),
}
