//! Integration tests for configuration-driven pipelines

mod common;

use axum::http::StatusCode;
use common::{gateway_request, pagerduty_signature, response_text, PAGERDUTY_BODY};
use std::io::Write;
use tower::ServiceExt;
use webhook_gate_api::{create_router, AppState, ConfigError, GatewayMetrics, ServiceConfig};

#[test]
fn test_half_configured_custom_header_fails_startup() {
    let config: ServiceConfig = serde_json::from_value(serde_json::json!({
        "gateway": {
            "custom_header": { "value": "s3cr3t" },
            "secret": { "type": "literal", "value": "pd-secret" }
        }
    }))
    .unwrap();

    let error = config.build_pipeline().unwrap_err();

    assert!(matches!(error, ConfigError::Invalid { .. }));
    assert!(!error.to_string().contains("s3cr3t"));
}

#[test]
fn test_reference_without_store_fails_startup() {
    let config: ServiceConfig = serde_json::from_value(serde_json::json!({
        "gateway": {
            "secret": { "type": "reference", "name": "pagerduty", "key": "token" }
        }
    }))
    .unwrap();

    assert!(matches!(
        config.build_pipeline(),
        Err(ConfigError::Invalid { .. })
    ));
}

/// A mounted store resolves the configured reference from disk per request.
#[tokio::test]
async fn test_mounted_store_config_serves_requests() {
    // Arrange
    let dir = tempfile::TempDir::new().unwrap();
    let secret_dir = dir.path().join("ci").join("pagerduty");
    std::fs::create_dir_all(&secret_dir).unwrap();
    std::fs::File::create(secret_dir.join("token"))
        .unwrap()
        .write_all(b"from-disk")
        .unwrap();

    let config: ServiceConfig = serde_json::from_value(serde_json::json!({
        "gateway": {
            "secret": { "type": "reference", "name": "pagerduty", "key": "token" }
        },
        "secret_store": {
            "type": "mounted",
            "root": dir.path(),
            "default_namespace": "ci"
        }
    }))
    .unwrap();

    let pipeline = config.build_pipeline().unwrap();
    let app = create_router(AppState::new(pipeline, GatewayMetrics::new().unwrap()));

    // Act
    let good = pagerduty_signature("from-disk", PAGERDUTY_BODY.as_bytes());
    let response = app
        .clone()
        .oneshot(gateway_request(
            &[("X-PagerDuty-Signature", good.as_str())],
            PAGERDUTY_BODY,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    // Act: rotate the secret on disk without restarting
    std::fs::write(secret_dir.join("token"), b"rotated").unwrap();
    let response = app
        .oneshot(gateway_request(
            &[("X-PagerDuty-Signature", good.as_str())],
            PAGERDUTY_BODY,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response_text(response).await,
        "webhook signature does not match"
    );
}

/// Secret lookup failures never reveal where secrets live on disk.
#[tokio::test]
async fn test_store_failures_do_not_expose_store_root() {
    // Arrange
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().display().to_string();
    let config: ServiceConfig = serde_json::from_value(serde_json::json!({
        "gateway": {
            "secret": { "type": "reference", "name": "pagerduty", "key": "token" }
        },
        "secret_store": { "type": "mounted", "root": dir.path() }
    }))
    .unwrap();
    let app = create_router(AppState::new(
        config.build_pipeline().unwrap(),
        GatewayMetrics::new().unwrap(),
    ));
    let signature = pagerduty_signature("anything", PAGERDUTY_BODY.as_bytes());

    // Act: the key file does not exist
    let missing = app
        .clone()
        .oneshot(gateway_request(
            &[("X-PagerDuty-Signature", signature.as_str())],
            PAGERDUTY_BODY,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    let text = response_text(missing).await;
    assert_eq!(text, "secret not found: default/pagerduty/token");
    assert!(!text.contains(&root));

    // Act: the key path cannot be read as a file
    std::fs::create_dir_all(dir.path().join("default/pagerduty/token")).unwrap();
    let unreadable = app
        .oneshot(gateway_request(
            &[("X-PagerDuty-Signature", signature.as_str())],
            PAGERDUTY_BODY,
        ))
        .await
        .unwrap();

    // Assert
    assert_eq!(unreadable.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = response_text(unreadable).await;
    assert!(!text.contains(&root));
    assert!(!text.contains("os error"));
}
