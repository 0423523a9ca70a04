//! Domain error types for the fan wiki server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError};

/// Whether error responses carry the underlying error text.
/// Set once at startup; false in production.
static EXPOSE_DETAIL: AtomicBool = AtomicBool::new(false);

/// Enable or disable `detail` in error responses.
pub fn set_expose_detail(expose: bool) {
    EXPOSE_DETAIL.store(expose, Ordering::Relaxed);
}

fn expose_detail() -> bool {
    EXPOSE_DETAIL.load(Ordering::Relaxed)
}

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid session
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (also CSRF failures)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unique constraint clash (e.g. duplicate slug)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many requests from one client
    #[error("Too many requests, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Identity provider call failed
    #[error("Identity provider error: {0}")]
    Identity(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::Identity(_) => "IDENTITY_PROVIDER_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Build the response body. Server-side failures get a generic message;
    /// their text only travels in `detail`, and only outside production.
    pub fn to_body(&self, with_detail: bool) -> ErrorResponse {
        let (message, detail) = match self {
            AppError::Database(err) => (
                "An internal database error occurred".to_string(),
                Some(err.clone()),
            ),
            AppError::Identity(err) => (
                "The identity provider could not be reached".to_string(),
                Some(err.clone()),
            ),
            AppError::Internal(err) => (
                "An internal error occurred".to_string(),
                Some(err.clone()),
            ),
            _ => (self.to_string(), None),
        };

        ErrorResponse {
            error: self.code().to_string(),
            message,
            detail: if with_detail { detail } else { None },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Identity(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Database(err) => tracing::error!("Database error: {}", err),
            AppError::Identity(err) => tracing::error!("Identity provider error: {}", err),
            AppError::Internal(err) => tracing::error!("Internal error: {}", err),
            _ => {}
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let AppError::RateLimited { retry_after_secs } = self {
            builder.insert_header((header::RETRY_AFTER, retry_after_secs.to_string()));
        }
        builder.json(self.to_body(expose_detail()))
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid UUID: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Identity(err.to_string())
    }
}
