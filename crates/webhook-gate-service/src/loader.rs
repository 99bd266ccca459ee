//! Layered configuration loading.
//!
//! Sources, later ones overriding earlier ones:
//!  1. `/etc/webhook-gate/service.yaml`
//!  2. `./config/service.yaml`
//!  3. the file named by `WEBHOOK_GATE_CONFIG_FILE` (must exist when set)
//!  4. `GATE__*` environment variables, `__` separating path segments,
//!     e.g. `GATE__SERVER__PORT=9090`
//!  5. the legacy variable names of earlier deployments
//!
//! Everything is read exactly once, at startup.

use std::collections::HashMap;
use std::path::PathBuf;
use webhook_gate_api::{ConfigError, ServiceConfig};
use webhook_gate_core::AdmissionPipeline;

/// Variable naming an operator-supplied configuration file
pub const CONFIG_FILE_VAR: &str = "WEBHOOK_GATE_CONFIG_FILE";

/// Prefix of structured environment overrides
pub const ENV_PREFIX: &str = "GATE";

/// Legacy variable holding the literal webhook secret
pub const LEGACY_TOKEN_VAR: &str = "PAGERDUTY_TEKTON_INTERCEPTOR_WEBHOOK_TOKEN";

/// Legacy variable holding the static header name
pub const LEGACY_HEADER_NAME_VAR: &str = "PAGERDUTY_TEKTON_INTERCEPTOR_CUSTOM_HEADER_NAME";

/// Legacy variable holding the static header value
pub const LEGACY_HEADER_SECRET_VAR: &str = "PAGERDUTY_TEKTON_INTERCEPTOR_CUSTOM_HEADER_SECRET";

/// Where configuration is read from
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub system_file: PathBuf,
    pub local_file: PathBuf,

    /// Process environment snapshot; `None` reads the live environment
    pub environment: Option<HashMap<String, String>>,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            system_file: PathBuf::from("/etc/webhook-gate/service"),
            local_file: PathBuf::from("config/service"),
            environment: None,
        }
    }
}

impl ConfigSources {
    fn snapshot(&self) -> HashMap<String, String> {
        match &self.environment {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        }
    }

    fn explicit_file(&self) -> Option<String> {
        match &self.environment {
            Some(vars) => vars.get(CONFIG_FILE_VAR).cloned(),
            None => std::env::var(CONFIG_FILE_VAR).ok(),
        }
        .filter(|path| !path.is_empty())
    }
}

/// Validated configuration together with the pipeline it describes
#[derive(Debug)]
pub struct LoadedService {
    pub config: ServiceConfig,
    pub pipeline: AdmissionPipeline,

    /// File named by `WEBHOOK_GATE_CONFIG_FILE`, if any
    pub config_file: Option<String>,
}

/// Load the configuration and build the admission pipeline from it
///
/// Building the pipeline is the validation step, so secret stores are
/// constructed exactly once.
pub fn load_service(sources: &ConfigSources) -> Result<LoadedService, ConfigError> {
    let config = load_config(sources)?;
    let pipeline = config.build_pipeline()?;

    Ok(LoadedService {
        config,
        pipeline,
        config_file: sources.explicit_file(),
    })
}

/// Merge every configuration source without validating the result
pub fn load_config(sources: &ConfigSources) -> Result<ServiceConfig, ConfigError> {
    let env = sources.snapshot();
    let lookup = |name: &str| env.get(name).filter(|v| !v.is_empty()).cloned();

    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name(&sources.system_file.to_string_lossy())
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name(&sources.local_file.to_string_lossy())
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Some(explicit_path) = lookup(CONFIG_FILE_VAR) {
        builder = builder.add_source(
            config::File::with_name(&explicit_path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("gateway.allowed_event_types")
            .try_parsing(true)
            .source(Some(env.clone())),
    );

    let token = lookup(LEGACY_TOKEN_VAR);
    builder = builder
        .set_override_option("gateway.secret.type", token.as_ref().map(|_| "literal"))
        .and_then(|b| b.set_override_option("gateway.secret.value", token.clone()))
        .and_then(|b| {
            b.set_override_option("gateway.custom_header.name", lookup(LEGACY_HEADER_NAME_VAR))
        })
        .and_then(|b| {
            b.set_override_option(
                "gateway.custom_header.value",
                lookup(LEGACY_HEADER_SECRET_VAR),
            )
        })
        .map_err(load_error)?;

    builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(load_error)
}

fn load_error(error: config::ConfigError) -> ConfigError {
    ConfigError::Load {
        message: error.to_string(),
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
