//! Error handling module
//!
//! Defines error types and handling logic used in the project

use crate::models::ProviderId;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// A required secret is missing; fails every call until fixed
    #[error("API keys not configured: {0}")]
    Configuration(String),

    /// Unknown provider identifier in the request
    #[error("Invalid model: {0}")]
    InvalidProvider(String),

    /// Request body could not be parsed
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// Provider answered with an error status
    #[error("{provider} API request failed: {status} - {message}")]
    Upstream {
        provider: ProviderId,
        status: u16,
        message: String,
    },

    /// Access token exchange failed
    #[error("Failed to obtain access token: {0}")]
    Credential(String),

    /// Request body over the configured size
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Malformed stream record
    #[error("Malformed stream record: {0}")]
    Decode(String),

    /// Connection failed or dropped mid-stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body, `{ "error": "..." }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Upstream { .. }
            | AppError::Credential(_)
            | AppError::Transport(_)
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Configuration(_)
            | AppError::InvalidProvider(_)
            | AppError::InvalidRequest(_)
            | AppError::Decode(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration_error",
            AppError::InvalidProvider(_) => "invalid_provider_error",
            AppError::InvalidRequest(_) => "invalid_request_error",
            AppError::PayloadTooLarge(_) => "payload_too_large_error",
            AppError::Upstream { .. } => "upstream_error",
            AppError::Credential(_) => "credential_error",
            AppError::Decode(_) => "decode_error",
            AppError::Transport(_) | AppError::HttpClient(_) => "transport_error",
            AppError::Internal(_) => "api_error",
        }
    }

    /// Whether the failure is scoped to a single call rather than the whole service
    pub fn is_call_level(&self) -> bool {
        !matches!(self, AppError::Configuration(_))
    }

    /// Convert to the wire error body
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

/// Implement IntoResponse trait to allow errors to be returned directly as HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        tracing::error!(
            error_type = self.error_type(),
            "Application error: {} - Status code: {}",
            self,
            status
        );

        (status, Json(self.to_error_response())).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Error context extension trait
pub trait ErrorContext<T> {
    /// Add transport error context
    fn transport_context(self, message: &str) -> AppResult<T>;

    /// Add credential error context
    fn credential_context(self, message: &str) -> AppResult<T>;

    /// Add internal error context
    fn internal_context(self, message: &str) -> AppResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn transport_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Transport(format!("{}: {}", message, e)))
    }

    fn credential_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Credential(format!("{}: {}", message, e)))
    }

    fn internal_context(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::Internal(format!("{}: {}", message, e)))
    }
}
