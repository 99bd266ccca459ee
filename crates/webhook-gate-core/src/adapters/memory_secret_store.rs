//! # In-Memory Secret Store
//!
//! Thread-safe in-memory store for tests and local development.

use super::DEFAULT_NAMESPACE;
use crate::secret::{SecretError, SecretReference, SecretStore, SecretValue};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

type SecretKey = (String, String, String);

/// In-memory secret store
///
/// Secrets are keyed by namespace, name and key. Every lookup is counted so
/// tests can assert whether (and how often) the store was consulted.
#[derive(Clone, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<SecretKey, SecretValue>>>,
    lookups: Arc<AtomicUsize>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with secrets
    pub fn with_secrets<I>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (SecretReference, SecretValue)>,
    {
        let store = Self::new();
        for (reference, value) in secrets {
            store.add_secret(&reference, value);
        }
        store
    }

    /// Add or replace a secret
    ///
    /// A reference without a namespace is stored in the default namespace.
    pub fn add_secret(&self, reference: &SecretReference, value: SecretValue) {
        let key = Self::storage_key(reference, reference.namespace.as_deref());
        self.secrets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, value);
    }

    pub fn remove_secret(&self, reference: &SecretReference) {
        let key = Self::storage_key(reference, reference.namespace.as_deref());
        self.secrets
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&key);
    }

    /// Number of lookups served so far, including misses
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn storage_key(reference: &SecretReference, namespace: Option<&str>) -> SecretKey {
        (
            namespace.unwrap_or(DEFAULT_NAMESPACE).to_string(),
            reference.name.clone(),
            reference.key.clone(),
        )
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(
        &self,
        reference: &SecretReference,
        namespace: Option<&str>,
    ) -> Result<SecretValue, SecretError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let key = Self::storage_key(reference, namespace);
        let secrets = self.secrets.read().map_err(|_| SecretError::Unavailable {
            reference: reference.to_string(),
        })?;

        secrets
            .get(&key)
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                reference: format!("{}/{}/{}", key.0, key.1, key.2),
            })
    }
}

#[cfg(test)]
#[path = "memory_secret_store_tests.rs"]
mod tests;
