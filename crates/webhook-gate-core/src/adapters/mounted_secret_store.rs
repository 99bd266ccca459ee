//! # Mounted Secret Store
//!
//! Reads secrets projected into the filesystem by the cluster, laid out as
//! `<root>/<namespace>/<name>/<key>`.

use super::DEFAULT_NAMESPACE;
use crate::secret::{SecretError, SecretReference, SecretStore, SecretValue};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Filesystem-backed secret store
///
/// File contents are returned byte for byte; trailing newlines are kept.
///
/// # Examples
///
/// ```no_run
/// use webhook_gate_core::adapters::MountedSecretStore;
/// use std::path::PathBuf;
///
/// let store = MountedSecretStore::new(PathBuf::from("/var/run/secrets/webhook-gate"));
/// ```
#[derive(Debug, Clone)]
pub struct MountedSecretStore {
    root: PathBuf,
    default_namespace: String,
}

impl MountedSecretStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Namespace used when the lookup carries none
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a reference, rejecting segments that could escape the root
    pub fn secret_path(
        &self,
        reference: &SecretReference,
        namespace: Option<&str>,
    ) -> Result<PathBuf, SecretError> {
        let namespace = namespace.unwrap_or(&self.default_namespace);

        for segment in [namespace, reference.name.as_str(), reference.key.as_str()] {
            check_segment(segment)?;
        }

        Ok(self
            .root
            .join(namespace)
            .join(&reference.name)
            .join(&reference.key))
    }
}

fn check_segment(segment: &str) -> Result<(), SecretError> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains('\0');

    if invalid {
        return Err(SecretError::InvalidReference {
            message: format!("'{}' is not a valid path segment", segment),
        });
    }

    Ok(())
}

#[async_trait]
impl SecretStore for MountedSecretStore {
    async fn get_secret(
        &self,
        reference: &SecretReference,
        namespace: Option<&str>,
    ) -> Result<SecretValue, SecretError> {
        let path = self.secret_path(reference, namespace)?;
        let qualified = reference
            .clone()
            .with_namespace(namespace.unwrap_or(&self.default_namespace))
            .to_string();

        match fs::read(&path).await {
            Ok(bytes) => Ok(SecretValue::from_bytes(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Mounted secret file does not exist");
                Err(SecretError::NotFound {
                    reference: qualified,
                })
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read mounted secret");
                Err(SecretError::Unavailable {
                    reference: qualified,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "mounted_secret_store_tests.rs"]
mod tests;
