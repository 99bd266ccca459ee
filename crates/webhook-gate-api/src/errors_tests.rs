//! Tests for HTTP error mapping.

use super::*;
use axum::body::to_bytes;

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Rejections become plain-text 400 responses carrying the message.
#[tokio::test]
async fn test_rejection_is_plain_text_bad_request() {
    let error = GatewayHandlerError::Rejected(GateError::HeaderMismatch {
        header: "X-Auth".to_string(),
    });

    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        body_text(response).await,
        "the header 'X-Auth' is not matching the secret value"
    );
}

/// Store outages become generic 500s; the reference stays in the logs.
#[tokio::test]
async fn test_store_outage_is_generic_server_error() {
    let error: GatewayHandlerError = GateError::SecretStoreUnavailable {
        reference: "ci/pagerduty/token".to_string(),
    }
    .into();

    assert!(matches!(error, GatewayHandlerError::InternalError { .. }));

    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_text(response).await.contains("pagerduty"));
}

#[test]
fn test_request_faults_stay_rejections() {
    let error: GatewayHandlerError = GateError::SignatureInvalid.into();

    assert!(matches!(
        error,
        GatewayHandlerError::Rejected(GateError::SignatureInvalid)
    ));
    assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
}

/// Internal details stay in the logs.
#[tokio::test]
async fn test_internal_error_message_is_generic() {
    let error = GatewayHandlerError::InternalError {
        message: "encoder exploded".to_string(),
    };

    let response = error.into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_text(response).await.contains("encoder"));
}

#[test]
fn test_config_error_from_gate_error() {
    let error: ConfigError = GateError::InvalidConfig {
        message: "custom header name and value must be set together".to_string(),
    }
    .into();

    assert!(matches!(error, ConfigError::Invalid { .. }));
    assert!(error.to_string().contains("set together"));
}
