//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how it is
//! rendered to callers.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use draft_assist_core::ports::PortError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("{0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a database migration failure at startup.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The body returned to callers on any failure.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error_kind: String,
    pub status_code: u16,
}

impl ApiError {
    /// The error kind and HTTP status reported to callers.
    pub fn classify(&self) -> (&'static str, StatusCode) {
        match self {
            ApiError::Port(e) => (
                e.kind(),
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ),
            ApiError::Database(_) | ApiError::Migration(_) => {
                ("PersistenceError", StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Config(_) | ApiError::Io(_) | ApiError::Internal(_) => {
                ("InternalError", StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let (kind, status) = self.classify();
        let message = match self {
            // Internal details stay in the logs.
            ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Port(PortError::Persistence(_)) => "A storage error occurred".to_string(),
            other => other.to_string(),
        };
        ErrorEnvelope {
            success: false,
            message,
            error_kind: kind.to_string(),
            status_code: status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        let status = StatusCode::from_u16(envelope.status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, kind = %envelope.error_kind, "Request failed");
        }
        (status, Json(envelope)).into_response()
    }
}
