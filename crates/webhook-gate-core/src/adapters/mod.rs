//! # Secret Store Adapters
//!
//! Infrastructure implementations of the secret store interface.

pub mod env_secret_store;
pub mod memory_secret_store;
pub mod mounted_secret_store;

pub use env_secret_store::EnvSecretStore;
pub use memory_secret_store::InMemorySecretStore;
pub use mounted_secret_store::MountedSecretStore;

/// Namespace used when neither the reference nor the request names one
pub const DEFAULT_NAMESPACE: &str = "default";
