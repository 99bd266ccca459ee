//! Tests for layered configuration loading.

use super::*;
use std::io::Write;
use tempfile::TempDir;
use webhook_gate_api::{SecretConfig, SecretStoreConfig};
use webhook_gate_core::SignatureScheme;

/// Sources pointing at an empty directory, with the given environment
fn sources(dir: &TempDir, vars: &[(&str, &str)]) -> ConfigSources {
    ConfigSources {
        system_file: dir.path().join("system"),
        local_file: dir.path().join("local"),
        environment: Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ),
    }
}

fn write_yaml(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_missing_secret_fails() {
    let dir = TempDir::new().unwrap();

    let result = load_service(&sources(&dir, &[]));

    assert!(matches!(result, Err(ConfigError::Missing { .. })));
}

#[test]
fn test_legacy_token_sets_literal_secret() {
    let dir = TempDir::new().unwrap();

    let config = load_config(&sources(&dir, &[(LEGACY_TOKEN_VAR, "pd-secret")])).unwrap();

    match config.gateway.secret {
        Some(SecretConfig::Literal { value }) => assert_eq!(value, "pd-secret"),
        other => panic!("expected literal secret, got {:?}", other),
    }
}

#[test]
fn test_legacy_header_pair_is_honoured() {
    let dir = TempDir::new().unwrap();

    let config = load_config(&sources(
        &dir,
        &[
            (LEGACY_TOKEN_VAR, "pd-secret"),
            (LEGACY_HEADER_NAME_VAR, "X-Auth"),
            (LEGACY_HEADER_SECRET_VAR, "hunter2"),
        ],
    ))
    .unwrap();

    assert_eq!(config.gateway.custom_header.name.as_deref(), Some("X-Auth"));
    assert_eq!(config.gateway.custom_header.value.as_deref(), Some("hunter2"));
}

/// Only one half of the header pair is a startup failure.
#[test]
fn test_legacy_header_name_alone_fails() {
    let dir = TempDir::new().unwrap();

    let result = load_service(&sources(
        &dir,
        &[
            (LEGACY_TOKEN_VAR, "pd-secret"),
            (LEGACY_HEADER_NAME_VAR, "X-Auth"),
        ],
    ));

    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
}

#[test]
fn test_prefixed_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_yaml(
        &dir,
        "explicit.yaml",
        r#"
server:
  port: 9000
gateway:
  secret:
    type: literal
    value: from-file
"#,
    );

    let config = load_config(&sources(
        &dir,
        &[
            (CONFIG_FILE_VAR, path.to_str().unwrap()),
            ("GATE__SERVER__PORT", "9191"),
            (
                "GATE__GATEWAY__ALLOWED_EVENT_TYPES",
                "incident.triggered,incident.resolved",
            ),
            ("GATE__GATEWAY__EVENT_TYPE_HEADER", "X-Event-Type"),
        ],
    ))
    .unwrap();

    assert_eq!(config.server.port, 9191);
    assert_eq!(
        config.gateway.allowed_event_types,
        vec!["incident.triggered", "incident.resolved"]
    );
}

#[test]
fn test_local_file_is_read() {
    let dir = TempDir::new().unwrap();
    write_yaml(
        &dir,
        "local.yaml",
        r#"
gateway:
  scheme: github
  secret:
    type: reference
    name: github-webhook
    key: secret
secret_store:
  type: env
"#,
    );

    let config = load_config(&sources(&dir, &[])).unwrap();

    assert!(matches!(config.secret_store, SecretStoreConfig::Env { .. }));
}

#[test]
fn test_missing_explicit_file_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.yaml");

    let result = load_config(&sources(
        &dir,
        &[
            (CONFIG_FILE_VAR, missing.to_str().unwrap()),
            (LEGACY_TOKEN_VAR, "pd-secret"),
        ],
    ));

    assert!(matches!(result, Err(ConfigError::Load { .. })));
}

#[test]
fn test_malformed_value_fails() {
    let dir = TempDir::new().unwrap();

    let result = load_config(&sources(
        &dir,
        &[
            (LEGACY_TOKEN_VAR, "pd-secret"),
            ("GATE__SERVER__PORT", "not-a-port"),
        ],
    ));

    assert!(matches!(result, Err(ConfigError::Load { .. })));
}

/// Loading alone merges sources; building the pipeline is what validates.
#[test]
fn test_load_config_does_not_validate() {
    let dir = TempDir::new().unwrap();

    let config = load_config(&sources(&dir, &[])).unwrap();

    assert!(config.gateway.secret.is_none());
}

#[test]
fn test_load_service_builds_pipeline() {
    let dir = TempDir::new().unwrap();
    let path = write_yaml(
        &dir,
        "explicit.yaml",
        r#"
gateway:
  scheme: github
  secret:
    type: literal
    value: from-file
"#,
    );
    let path = path.to_str().unwrap();

    let loaded = load_service(&sources(&dir, &[(CONFIG_FILE_VAR, path)])).unwrap();

    assert_eq!(loaded.pipeline.scheme(), SignatureScheme::GitHub);
    assert_eq!(loaded.config_file.as_deref(), Some(path));
}
