//! Application error types.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Message sent in place of server-side error details.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

static EXPOSE_ERROR_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include server-side error details in 500 responses (development mode).
pub fn expose_error_details(expose: bool) {
    EXPOSE_ERROR_DETAILS.store(expose, Ordering::Relaxed);
}

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or incomplete input.
    #[error("{0}")]
    Validation(String),

    /// No (valid) caller identity where one is needed.
    #[error("{0}")]
    Unauthenticated(String),

    /// Caller identity known but not allowed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Failure reported by the identity provider.
    #[error("{message}")]
    Identity { status: StatusCode, message: String },

    #[error("internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::Unauthenticated(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Identity { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged; clients only see details in development.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            if EXPOSE_ERROR_DETAILS.load(Ordering::Relaxed) {
                self.to_string()
            } else {
                GENERIC_ERROR_MESSAGE.to_string()
            }
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
