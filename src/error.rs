use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt::Display;
use thiserror::Error;

/// AppError
///
/// The single error type crossing the request boundary. Authentication failures carry fixed,
/// low-detail messages so that responses never reveal whether an account exists. Upstream
/// failures keep their detail for the server log only.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input the caller can correct.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Authenticated with the identity service but not present in `admins`.
    #[error("Access denied")]
    AccessDenied,

    /// No usable session on the request.
    #[error("Not authenticated")]
    Unauthorized,

    #[error("Not an admin user")]
    NotAnAdmin,

    /// Caller with no `admins` row, or whose role is outside the operation's allow-list.
    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to logout")]
    Logout { detail: String },

    /// Upstream (database or identity service) failure. `message` is what the client sees.
    #[error("{message}")]
    OperationFailed {
        message: &'static str,
        detail: String,
    },
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wraps an upstream error under an opaque client-facing message.
    pub fn operation(message: &'static str, err: impl Display) -> Self {
        Self::OperationFailed {
            message,
            detail: err.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::AccessDenied | Self::Unauthorized | Self::NotAnAdmin => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Logout { .. } | Self::OperationFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::OperationFailed { message, detail } => {
                tracing::error!(error = %detail, "{}", message);
            }
            Self::Logout { detail } => {
                tracing::error!(error = %detail, "logout failed");
            }
            Self::InvalidCredentials | Self::AccessDenied | Self::NotAnAdmin | Self::Forbidden => {
                tracing::warn!(reason = %self, "request rejected");
            }
            _ => {}
        }

        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
