//! Configuration types for the HTTP service
//!
//! The whole configuration is loaded once at startup, validated, and turned
//! into an immutable [`AdmissionPipeline`]. Nothing here is read per request.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, sync::Arc};
use webhook_gate_core::{
    adapters::env_secret_store::DEFAULT_ENV_PREFIX, AdmissionPipeline, CustomHeaderCheck,
    EnvSecretStore, EventTypeFilter, GatewayPolicy, MountedSecretStore, SecretReference,
    SecretResolver, SecretSource, SecretStore, SecretValue, SignatureScheme,
    DEFAULT_MAX_BODY_SIZE,
};

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Admission rules
    pub gateway: GatewayConfig,

    /// Backend for referenced secrets
    pub secret_store: SecretStoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the configuration by building everything it describes
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build_pipeline().map(|_| ())
    }

    /// Build the admission pipeline described by this configuration
    pub fn build_pipeline(&self) -> Result<AdmissionPipeline, ConfigError> {
        self.server.validate()?;

        let store = self.secret_store.build();
        let source = self
            .gateway
            .secret
            .as_ref()
            .ok_or_else(|| ConfigError::Missing {
                key: "gateway.secret".to_string(),
            })?
            .to_source()?;

        let resolver = SecretResolver::new(source, store).map_err(ConfigError::from)?;
        let policy = self.gateway.to_policy(self.server.max_body_size)?;

        AdmissionPipeline::new(policy, resolver).map_err(ConfigError::from)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl ServerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                message: "server.port must be greater than zero".to_string(),
            });
        }

        if self.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Admission rules for incoming webhooks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Signature format of the sender
    pub scheme: SignatureScheme,

    /// Override for the signature header name
    pub signature_header: Option<String>,

    /// Override for the event type header name
    pub event_type_header: Option<String>,

    /// Static header/value pair every request must carry
    pub custom_header: CustomHeaderConfig,

    /// Allowed event types (empty = all)
    pub allowed_event_types: Vec<String>,

    /// Webhook secret
    pub secret: Option<SecretConfig>,

    /// Reject verified bodies that are not JSON
    pub require_json_body: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scheme: SignatureScheme::default(),
            signature_header: None,
            event_type_header: None,
            custom_header: CustomHeaderConfig::default(),
            allowed_event_types: vec![],
            secret: None,
            require_json_body: true,
        }
    }
}

impl GatewayConfig {
    fn to_policy(&self, max_body_size: usize) -> Result<GatewayPolicy, ConfigError> {
        let custom_header = CustomHeaderCheck::from_config(
            self.custom_header.name.as_deref(),
            self.custom_header.value.as_deref(),
        )
        .map_err(ConfigError::from)?;

        Ok(GatewayPolicy {
            scheme: self.scheme,
            signature_header: self.signature_header.clone(),
            event_type_header: self.event_type_header.clone(),
            custom_header,
            allowed_event_types: EventTypeFilter::new(self.allowed_event_types.iter().cloned()),
            require_json_body: self.require_json_body,
            max_body_size,
        })
    }
}

/// Static header check settings
///
/// Both fields set enables the check; exactly one set is rejected.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomHeaderConfig {
    pub name: Option<String>,
    pub value: Option<String>,
}

impl fmt::Debug for CustomHeaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHeaderConfig")
            .field("name", &self.name)
            .field("value", &self.value.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Webhook secret configuration
///
/// # Variants
///
/// - `Literal`: the secret value itself, usually injected through the
///   environment.
/// - `Reference`: namespace/name/key looked up in the secret store for every
///   request.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretConfig {
    Literal {
        value: String,
    },
    Reference {
        #[serde(default)]
        namespace: Option<String>,
        name: String,
        key: String,
    },
}

impl SecretConfig {
    fn to_source(&self) -> Result<SecretSource, ConfigError> {
        match self {
            Self::Literal { value } => {
                if value.is_empty() {
                    return Err(ConfigError::Invalid {
                        message: "gateway.secret.value must not be empty".to_string(),
                    });
                }
                Ok(SecretSource::Literal(SecretValue::from_string(value.clone())))
            }
            Self::Reference {
                namespace,
                name,
                key,
            } => {
                let reference = SecretReference {
                    namespace: namespace.clone(),
                    name: name.clone(),
                    key: key.clone(),
                };
                reference.validate().map_err(|e| ConfigError::Invalid {
                    message: e.to_string(),
                })?;
                Ok(SecretSource::Reference(reference))
            }
        }
    }
}

impl fmt::Debug for SecretConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { .. } => f
                .debug_struct("Literal")
                .field("value", &"<REDACTED>")
                .finish(),
            Self::Reference {
                namespace,
                name,
                key,
            } => f
                .debug_struct("Reference")
                .field("namespace", namespace)
                .field("name", name)
                .field("key", key)
                .finish(),
        }
    }
}

/// Backend used to resolve secret references
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecretStoreConfig {
    /// No store; only literal secrets can be used
    #[default]
    None,

    /// Environment variables captured at startup
    Env {
        #[serde(default = "default_env_prefix")]
        prefix: String,
    },

    /// Secrets projected as files under `root/<namespace>/<name>/<key>`
    Mounted {
        root: PathBuf,
        #[serde(default)]
        default_namespace: Option<String>,
    },
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

impl SecretStoreConfig {
    /// Construct the configured store
    pub fn build(&self) -> Option<Arc<dyn SecretStore>> {
        match self {
            Self::None => None,
            Self::Env { prefix } => Some(Arc::new(EnvSecretStore::from_env(prefix.clone()))),
            Self::Mounted {
                root,
                default_namespace,
            } => {
                let mut store = MountedSecretStore::new(root.clone());
                if let Some(namespace) = default_namespace {
                    store = store.with_default_namespace(namespace.clone());
                }
                Some(Arc::new(store))
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
