//! # Environment Secret Store
//!
//! Secrets supplied as environment variables, captured once at construction.

use crate::secret::{SecretError, SecretReference, SecretStore, SecretValue};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Default prefix for secret variables
pub const DEFAULT_ENV_PREFIX: &str = "WEBHOOK_GATE_SECRET_";

/// Store backed by a snapshot of environment variables
///
/// A reference `(name, key)` maps to `<PREFIX><NAME>_<KEY>`, upper-cased, with
/// every character outside `[A-Z0-9]` replaced by `_`. The namespace is not
/// part of the variable name. Changes to the process environment after
/// construction are not observed.
#[derive(Clone)]
pub struct EnvSecretStore {
    prefix: String,
    variables: HashMap<String, String>,
}

impl EnvSecretStore {
    /// Snapshot the current process environment
    pub fn from_env(prefix: impl Into<String>) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Build from explicit name/value pairs
    pub fn from_vars<I>(prefix: impl Into<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = prefix.into();
        let variables = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .collect();

        Self { prefix, variables }
    }

    /// Variable name a reference maps to
    pub fn variable_name(&self, reference: &SecretReference) -> String {
        format!(
            "{}{}_{}",
            self.prefix,
            normalize(&reference.name),
            normalize(&reference.key)
        )
    }

    /// Number of captured variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

fn normalize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

impl std::fmt::Debug for EnvSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSecretStore")
            .field("prefix", &self.prefix)
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(
        &self,
        reference: &SecretReference,
        _namespace: Option<&str>,
    ) -> Result<SecretValue, SecretError> {
        let variable = self.variable_name(reference);

        match self.variables.get(&variable) {
            Some(value) if !value.is_empty() => Ok(SecretValue::from_string(value.clone())),
            _ => {
                debug!(variable = %variable, "Secret variable is unset or empty");
                Err(SecretError::NotFound {
                    reference: reference.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "env_secret_store_tests.rs"]
mod tests;
