//! Tests for gateway metrics.

use super::*;

#[test]
fn test_independent_registries() {
    let first = GatewayMetrics::new().unwrap();
    let second = GatewayMetrics::new().unwrap();

    first.record_admitted(GatewayShape::Standalone, 10, Duration::from_millis(1));

    assert_eq!(
        first
            .requests_total
            .with_label_values(&["standalone", "admitted"])
            .get(),
        1
    );
    assert_eq!(
        second
            .requests_total
            .with_label_values(&["standalone", "admitted"])
            .get(),
        0
    );
}

#[test]
fn test_rejections_are_labelled_by_classification() {
    let metrics = GatewayMetrics::new().unwrap();

    metrics.record_rejected(
        GatewayShape::Interceptor,
        Classification::FailedPrecondition,
        Duration::from_millis(2),
    );

    assert_eq!(
        metrics
            .rejections_total
            .with_label_values(&["interceptor", "failed_precondition"])
            .get(),
        1
    );
}

#[test]
fn test_encode_uses_prefix() {
    let metrics = GatewayMetrics::new().unwrap();
    metrics.record_admitted(GatewayShape::Standalone, 10, Duration::from_millis(1));

    let text = metrics.encode().unwrap();

    assert!(text.contains("webhook_gate_requests_total"));
}
