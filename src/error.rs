//! Error types for LibMaster server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes returned in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchData = 4,
    ResourceUnavailable = 7,
    InvalidTransition = 8,
    BadValue = 18,
    TransportFailure = 22,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Patron, book or borrow request absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lifecycle precondition violated
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Borrow or approval attempted against an on-loan or missing book
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Notification delivery failed
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store read/write failed outside of sqlx
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors a caller can fix by changing the request
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::InvalidTransition(_)
                | AppError::ResourceUnavailable(_)
                | AppError::BadRequest(_)
        )
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_caller_correctable() {
            tracing::debug!("Request rejected: {}", self);
        }

        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, ErrorCode::InvalidTransition, msg.clone())
            }
            AppError::ResourceUnavailable(msg) => {
                (StatusCode::CONFLICT, ErrorCode::ResourceUnavailable, msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Transport(msg) => {
                tracing::error!("Transport error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::TransportFailure,
                    "Notification delivery failed".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
