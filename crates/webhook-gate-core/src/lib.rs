//! # Webhook-Gate Core
//!
//! Authentication and admission logic for the webhook ingress gateway.
//!
//! This crate decides whether an inbound webhook may pass: it checks an optional
//! static header/secret pair, an optional event-type allow-list, resolves the
//! shared secret and verifies the HMAC signature over the raw body.
//!
//! ## Architecture
//!
//! - Secret lookup sits behind the [`secret::SecretStore`] trait
//! - Configuration is built once into an immutable [`pipeline::AdmissionPipeline`]
//! - Every stage short-circuits with an [`AdmissionDecision`] rejection
//!
//! ## Usage
//!
//! ```rust
//! use webhook_gate_core::{Classification, GateError};
//!
//! let error = GateError::MissingSignature {
//!     header: "X-PagerDuty-Signature".to_string(),
//! };
//! assert_eq!(error.classification(), Classification::InvalidArgument);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard result type for gateway operations
pub type GateResult<T> = Result<T, GateError>;

// ============================================================================
// Rejection Classification
// ============================================================================

/// Coarse class of a rejection, used to pick the HTTP status and the numeric
/// status code reported by the embedded interceptor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The request did not match a statically configured requirement
    BadRequest,
    /// The request is malformed or lacks required input
    InvalidArgument,
    /// The request is well formed but a precondition for admission failed
    FailedPrecondition,
    /// The gateway could not evaluate the request
    Internal,
}

impl Classification {
    /// Numeric status code (gRPC code space) used by the embedded shape.
    ///
    /// `BadRequest` has no gRPC counterpart and reports as `InvalidArgument`.
    pub fn code(&self) -> u32 {
        match self {
            Self::BadRequest | Self::InvalidArgument => 3,
            Self::FailedPrecondition => 9,
            Self::Internal => 13,
        }
    }

    /// HTTP status code used by the standalone gateway shape
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Internal => 500,
            _ => 400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::InvalidArgument => "invalid_argument",
            Self::FailedPrecondition => "failed_precondition",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Admission Decision
// ============================================================================

/// Reason a request was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub classification: Classification,
    pub message: String,
}

/// Message returned for internal failures; the details are logged instead
pub const INTERNAL_REJECTION_MESSAGE: &str = "internal error while checking the webhook";

impl From<GateError> for Rejection {
    fn from(error: GateError) -> Self {
        let classification = error.classification();
        let message = match classification {
            Classification::Internal => INTERNAL_REJECTION_MESSAGE.to_string(),
            _ => error.to_string(),
        };

        Self {
            classification,
            message,
        }
    }
}

/// Outcome of evaluating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// The request may pass downstream unchanged
    Continue,
    /// The request is refused
    Reject(Rejection),
}

impl AdmissionDecision {
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Rejection details, if the request was refused
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Continue => None,
            Self::Reject(rejection) => Some(rejection),
        }
    }
}

impl From<GateError> for AdmissionDecision {
    fn from(error: GateError) -> Self {
        Self::Reject(error.into())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for gateway operations
///
/// Display strings are returned to callers as rejection messages. None of them
/// carry the expected secret or the expected signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("the header '{header}' is not matching the secret value")]
    HeaderMismatch { header: String },

    #[error("event type '{event_type}' is not allowed")]
    EventNotAllowed { event_type: String },

    #[error("signature header '{header}' is missing")]
    MissingSignature { header: String },

    #[error("signature header '{header}' is malformed: {reason}")]
    MalformedSignature { header: String, reason: String },

    #[error("webhook signature does not match")]
    SignatureInvalid,

    #[error("secret not found: {reference}")]
    SecretNotFound { reference: String },

    #[error("secret store unavailable while reading '{reference}'")]
    SecretStoreUnavailable { reference: String },

    #[error("request body exceeds the maximum size of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {message}")]
    ReadFailure { message: String },

    #[error("could not parse webhook event details: {message}")]
    MalformedPayload { message: String },

    #[error("failed to parse interceptor params: {message}")]
    InvalidParams { message: String },
}

impl GateError {
    /// Classification reported to the caller
    pub fn classification(&self) -> Classification {
        match self {
            Self::HeaderMismatch { .. } => Classification::BadRequest,
            Self::EventNotAllowed { .. }
            | Self::SignatureInvalid
            | Self::SecretNotFound { .. } => Classification::FailedPrecondition,
            Self::InvalidConfig { .. }
            | Self::MissingSignature { .. }
            | Self::MalformedSignature { .. }
            | Self::BodyTooLarge { .. }
            | Self::ReadFailure { .. }
            | Self::MalformedPayload { .. }
            | Self::InvalidParams { .. } => Classification::InvalidArgument,
            Self::SecretStoreUnavailable { .. } => Classification::Internal,
        }
    }

    /// Failures that point at a forged or misdirected request
    pub fn is_security_failure(&self) -> bool {
        matches!(
            self,
            Self::HeaderMismatch { .. }
                | Self::MissingSignature { .. }
                | Self::MalformedSignature { .. }
                | Self::SignatureInvalid
        )
    }
}

// ============================================================================
// Module declarations
// ============================================================================

/// Inbound request model and capped body reading
pub mod request;

/// Secret references, values and the store abstraction
pub mod secret;

/// Static header and event-type admission checks
pub mod admission;

/// HMAC signature schemes and verification
pub mod signature;

/// Webhook event detail extraction
pub mod event;

/// Request evaluation pipeline
pub mod pipeline;

/// Secret store implementations
pub mod adapters;

// Re-export key types for convenience
pub use adapters::{EnvSecretStore, InMemorySecretStore, MountedSecretStore};
pub use admission::{AdmissionFilter, CustomHeaderCheck, EventTypeFilter};
pub use event::WebhookEventDetails;
pub use pipeline::{AdmissionPipeline, GatewayPolicy, RequestOverrides};
pub use request::{read_capped, InboundRequest, RequestHeaders, DEFAULT_MAX_BODY_SIZE};
pub use secret::{
    SecretError, SecretReference, SecretResolver, SecretSource, SecretStore, SecretValue,
};
pub use signature::{SignatureScheme, SignatureVerifier};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
