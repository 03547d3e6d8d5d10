use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transaction rejected by operator")]
    ManualRejected,

    #[error("approval expired before a decision was made")]
    Expired,

    #[error("approval already resolved")]
    AlreadyResolved,

    #[error("operator channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("snapshot persistence failed: {0}")]
    Persistence(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            GatewayError::ManualRejected => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "approval_rejected",
                "transaction rejected by operator".to_string(),
            ),
            GatewayError::Expired => (
                StatusCode::REQUEST_TIMEOUT,
                "timeout_error",
                "approval_expired",
                "approval expired before a decision was made".to_string(),
            ),
            GatewayError::AlreadyResolved => (
                StatusCode::CONFLICT,
                "conflict_error",
                "already_resolved",
                "approval already resolved".to_string(),
            ),
            GatewayError::ChannelUnavailable(e) => (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "channel_unavailable",
                e.clone(),
            ),
            GatewayError::Persistence(e) => {
                tracing::error!("Persistence error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            GatewayError::InvalidRequest(e) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_request",
                e.clone(),
            ),
            GatewayError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
