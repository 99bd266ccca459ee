//! Error types for the HTTP service

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;
use webhook_gate_core::{Classification, GateError};

/// Errors returned by the standalone gateway handler
///
/// Responses are plain text. Rejections use the status of their
/// classification; every message is safe to show the caller.
#[derive(Debug, thiserror::Error)]
pub enum GatewayHandlerError {
    /// The request failed an admission or authentication stage
    #[error("{0}")]
    Rejected(GateError),

    /// The interceptor envelope could not be parsed
    #[error("invalid interceptor request: {message}")]
    InvalidEnvelope { message: String },

    /// Unexpected internal failure; details are logged, not returned
    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl GatewayHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected(e) => StatusCode::from_u16(e.classification().http_status())
                .unwrap_or(StatusCode::BAD_REQUEST),
            Self::InvalidEnvelope { .. } => StatusCode::BAD_REQUEST,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GateError> for GatewayHandlerError {
    /// Internal failures keep their details out of the response body
    fn from(error: GateError) -> Self {
        match error.classification() {
            Classification::Internal => Self::InternalError {
                message: error.to_string(),
            },
            _ => Self::Rejected(error),
        }
    }
}

impl IntoResponse for GatewayHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::InternalError { message } => {
                error!(error = %message, "Internal server error occurred");
                "Internal server error occurred".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, message).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },
}

impl From<GateError> for ConfigError {
    fn from(error: GateError) -> Self {
        match error {
            GateError::InvalidConfig { message } => Self::Invalid { message },
            other => Self::Invalid {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
