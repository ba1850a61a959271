//! Error types for the daemon

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use latchkey_service::{BrokerError, Classification};
use serde::Serialize;
use thiserror::Error;

const CLIENT_ERROR: &str = "ClientError";
const INTERNAL_ERROR: &str = "InternalServerError";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        DaemonError::Config(err.to_string())
    }
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body
    #[error("{0}")]
    BadRequest(String),

    /// Request body over the configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// The exchange itself failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Internal error
    #[error("{0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    }
}

impl ApiError {
    pub fn classification(&self) -> Classification {
        match self {
            ApiError::BadRequest(message) => Classification::client(400, message.clone()),
            ApiError::PayloadTooLarge(message) => Classification::client(413, message.clone()),
            ApiError::Timeout => Classification::client(408, self.to_string()),
            ApiError::Broker(err) => err.classification(),
            ApiError::Internal(_) => Classification::Internal,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
}

impl ErrorResponse {
    fn new(name: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                name: name.to_string(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let client = match self.classification() {
            Classification::Client { status, message } => StatusCode::from_u16(status)
                .ok()
                .map(|status| (status, message)),
            Classification::Internal => None,
        };

        match client {
            Some((status, message)) => {
                (status, Json(ErrorResponse::new(CLIENT_ERROR, message))).into_response()
            }
            None => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(INTERNAL_ERROR, INTERNAL_MESSAGE)),
                )
                    .into_response()
            }
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
