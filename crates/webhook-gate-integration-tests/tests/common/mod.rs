//! Common test utilities for webhook-gate integration tests
//!
//! This module provides:
//! - Router builders over literal and store-backed secrets
//! - Signing helpers
//! - A secret store that fails the test if it is ever consulted

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use bytes::Bytes;
use std::sync::Arc;
use webhook_gate_api::{create_router, AppState, GatewayMetrics};
use webhook_gate_core::{
    AdmissionPipeline, GatewayPolicy, SecretError, SecretReference, SecretResolver, SecretSource,
    SecretStore, SecretValue, SignatureScheme,
};

pub const SECRET: &str = "pd-secret";

pub const PAGERDUTY_BODY: &str = r#"{"event":{"id":"01DEN4HPBQAGXFBH3GK3XZWP2K","event_type":"incident.triggered","resource_type":"incident","occurred_at":"2020-10-02T18:45:22.169Z","data":{"id":"PGR0VU2","type":"incident","title":"A little bump in the road"}}}"#;

// ============================================================================
// Secret stores
// ============================================================================

/// Store that panics when asked for a secret
#[allow(dead_code)]
pub struct UnreachableSecretStore;

#[async_trait]
impl SecretStore for UnreachableSecretStore {
    async fn get_secret(
        &self,
        reference: &SecretReference,
        _namespace: Option<&str>,
    ) -> Result<SecretValue, SecretError> {
        panic!("secret store must not be consulted, asked for {}", reference);
    }
}

// ============================================================================
// Routers
// ============================================================================

#[allow(dead_code)]
pub fn literal_resolver() -> SecretResolver {
    SecretResolver::literal(SecretValue::from_string(SECRET.to_string())).unwrap()
}

/// Resolver whose configured reference goes to the given store
#[allow(dead_code)]
pub fn store_resolver(store: Arc<dyn SecretStore>) -> SecretResolver {
    SecretResolver::new(
        SecretSource::Reference(SecretReference::new("pagerduty", "token")),
        Some(store),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn create_test_app(policy: GatewayPolicy, resolver: SecretResolver) -> Router {
    let pipeline = AdmissionPipeline::new(policy, resolver).unwrap();
    create_router(AppState::new(pipeline, GatewayMetrics::new().unwrap()))
}

#[allow(dead_code)]
pub fn create_literal_app(policy: GatewayPolicy) -> Router {
    create_test_app(policy, literal_resolver())
}

// ============================================================================
// Requests
// ============================================================================

#[allow(dead_code)]
pub fn pagerduty_signature(secret: &str, body: &[u8]) -> String {
    SignatureScheme::PagerDuty
        .sign(secret.as_bytes(), body)
        .unwrap()
}

/// POST to the standalone gateway
#[allow(dead_code)]
pub fn gateway_request(headers: &[(&str, &str)], body: impl Into<Bytes>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.into())).unwrap()
}

/// POST an envelope to the interceptor endpoint
#[allow(dead_code)]
pub fn interceptor_request(envelope: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/interceptor")
        .header("Content-Type", "application/json")
        .body(Body::from(envelope.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub async fn response_bytes(response: Response<Body>) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

#[allow(dead_code)]
pub async fn response_text(response: Response<Body>) -> String {
    String::from_utf8(response_bytes(response).await.to_vec()).unwrap()
}

#[allow(dead_code)]
pub async fn response_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&response_bytes(response).await).unwrap()
}
