//! # Secret Module
//!
//! Shared-secret handling for signature verification.
//!
//! A secret is either supplied directly (a literal value sourced from the
//! environment at startup) or referenced by namespace/name/key and looked up
//! in a [`SecretStore`] for every request. Resolved values are never cached
//! here and never appear in `Debug` output.

use crate::{GateError, GateResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

// ============================================================================
// Core Types
// ============================================================================

/// Pointer to a secret held in a store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretReference {
    /// Namespace holding the secret; falls back to the request's namespace hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Secret object name
    pub name: String,

    /// Entry within the secret object
    pub key: String,
}

impl SecretReference {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Check that the reference names both a secret and a key
    pub fn validate(&self) -> Result<(), SecretError> {
        if self.name.trim().is_empty() {
            return Err(SecretError::InvalidReference {
                message: "secret name cannot be empty".to_string(),
            });
        }

        if self.key.trim().is_empty() {
            return Err(SecretError::InvalidReference {
                message: format!("secret '{}' has an empty key", self.name),
            });
        }

        Ok(())
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}/{}", namespace, self.name, self.key),
            None => write!(f, "{}/{}", self.name, self.key),
        }
    }
}

/// Secure container for secret bytes
///
/// The buffer is zeroed on drop. Debug output shows only the length.
#[derive(Clone)]
pub struct SecretValue {
    inner: Zeroizing<Vec<u8>>,
}

impl SecretValue {
    pub fn from_string(value: String) -> Self {
        Self::from_bytes(value.into_bytes())
    }

    pub fn from_bytes(value: Vec<u8>) -> Self {
        Self {
            inner: Zeroizing::new(value),
        }
    }

    /// Get secret bytes (only for immediate use)
    pub fn expose_bytes(&self) -> &[u8] {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Store Interface
// ============================================================================

/// Backend able to look up a secret by reference
///
/// Implementations must be read-only per request and safe to share across
/// concurrent requests.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the bytes stored under `reference`
    ///
    /// `namespace` is the effective namespace, already resolved from the
    /// reference and the request's namespace hint.
    async fn get_secret(
        &self,
        reference: &SecretReference,
        namespace: Option<&str>,
    ) -> Result<SecretValue, SecretError>;
}

/// Errors raised by secret stores
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {reference}")]
    NotFound { reference: String },

    #[error("invalid secret reference: {message}")]
    InvalidReference { message: String },

    #[error("secret store could not read '{reference}'")]
    Unavailable { reference: String },
}

impl From<SecretError> for GateError {
    fn from(error: SecretError) -> Self {
        match error {
            SecretError::NotFound { reference } => GateError::SecretNotFound { reference },
            SecretError::InvalidReference { message } => GateError::InvalidConfig { message },
            SecretError::Unavailable { reference } => {
                GateError::SecretStoreUnavailable { reference }
            }
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Where the configured webhook secret comes from
#[derive(Clone)]
pub enum SecretSource {
    /// Value supplied directly at startup
    Literal(SecretValue),
    /// Value looked up in the secret store per request
    Reference(SecretReference),
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => f.debug_tuple("Literal").field(&"<REDACTED>").finish(),
            Self::Reference(reference) => f.debug_tuple("Reference").field(reference).finish(),
        }
    }
}

/// Produces the raw secret for one verification
#[derive(Clone)]
pub struct SecretResolver {
    source: SecretSource,
    store: Option<Arc<dyn SecretStore>>,
}

impl SecretResolver {
    /// Create a resolver, validating the configured source
    ///
    /// A reference source needs a store; a literal source must not be empty.
    pub fn new(source: SecretSource, store: Option<Arc<dyn SecretStore>>) -> GateResult<Self> {
        match &source {
            SecretSource::Literal(value) if value.is_empty() => {
                return Err(GateError::InvalidConfig {
                    message: "webhook secret cannot be empty".to_string(),
                });
            }
            SecretSource::Reference(reference) => {
                reference.validate()?;
                if store.is_none() {
                    return Err(GateError::InvalidConfig {
                        message: format!(
                            "secret reference '{}' requires a secret store",
                            reference
                        ),
                    });
                }
            }
            SecretSource::Literal(_) => {}
        }

        Ok(Self { source, store })
    }

    /// Resolver backed by a literal value only
    pub fn literal(value: SecretValue) -> GateResult<Self> {
        Self::new(SecretSource::Literal(value), None)
    }

    pub fn source(&self) -> &SecretSource {
        &self.source
    }

    /// Resolve the secret for a request
    ///
    /// A per-request reference takes precedence over the configured source.
    pub async fn resolve(
        &self,
        reference_override: Option<&SecretReference>,
        namespace_hint: Option<&str>,
    ) -> GateResult<SecretValue> {
        match (reference_override, &self.source) {
            (Some(reference), _) => self
                .resolve_reference(reference, namespace_hint)
                .await
                .map_err(|e| match e {
                    GateError::InvalidConfig { message } => GateError::InvalidParams { message },
                    other => other,
                }),
            (None, SecretSource::Reference(reference)) => {
                self.resolve_reference(reference, namespace_hint).await
            }
            (None, SecretSource::Literal(value)) => Ok(value.clone()),
        }
    }

    /// Look up `reference` in the store
    #[instrument(skip(self), fields(secret = %reference))]
    pub async fn resolve_reference(
        &self,
        reference: &SecretReference,
        namespace_hint: Option<&str>,
    ) -> GateResult<SecretValue> {
        reference.validate()?;

        let store = self.store.as_ref().ok_or_else(|| GateError::InvalidConfig {
            message: format!("no secret store configured for '{}'", reference),
        })?;

        let namespace = reference.namespace.as_deref().or(namespace_hint);
        let value = store.get_secret(reference, namespace).await?;

        debug!(
            secret = %reference,
            namespace = namespace.unwrap_or(""),
            length = value.len(),
            "Resolved webhook secret"
        );

        Ok(value)
    }
}

impl fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResolver")
            .field("source", &self.source)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
