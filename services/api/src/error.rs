//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is reported to HTTP clients.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use story_tutor_core::ports::PortError;
use tracing::{error, warn};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was well-formed but its values are not acceptable.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Port(port) => match port {
                PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                PortError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                PortError::Unauthorized => {
                    (StatusCode::UNAUTHORIZED, "Could not validate credentials".to_string())
                }
                PortError::Generation(_) => (
                    StatusCode::BAD_GATEWAY,
                    "The content generator is unavailable".to_string(),
                ),
                PortError::Parse { .. } => (
                    StatusCode::BAD_GATEWAY,
                    "The content generator returned an unusable response".to_string(),
                ),
                PortError::Persistence(_) | PortError::Unexpected(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                ),
            },
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        match &self {
            ApiError::Port(PortError::Parse { reason, raw }) => {
                error!(%reason, %raw, "Model output could not be parsed");
            }
            _ if status.is_server_error() => error!(error = %self, "Request failed"),
            _ => warn!(error = %self, status = status.as_u16(), "Request rejected"),
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
