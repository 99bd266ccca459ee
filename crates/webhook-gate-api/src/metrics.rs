//! Metrics collection for the gateway.
//!
//! Each [`GatewayMetrics`] owns its own registry, so several routers (tests,
//! embedded use) can coexist in one process.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;
use webhook_gate_core::Classification;

/// Deployment shape a request arrived through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayShape {
    Standalone,
    Interceptor,
}

impl GatewayShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Interceptor => "interceptor",
        }
    }
}

/// Gateway metrics
#[derive(Debug)]
pub struct GatewayMetrics {
    registry: Registry,

    /// Requests by shape and outcome
    pub requests_total: IntCounterVec,

    /// Rejections by shape and classification
    pub rejections_total: IntCounterVec,

    /// Evaluation time by shape
    pub request_duration: HistogramVec,

    /// Accepted body sizes
    pub body_size: Histogram,
}

impl GatewayMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new_custom(Some("webhook_gate".to_string()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Webhook requests evaluated"),
            &["shape", "outcome"],
        )?;
        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Webhook requests rejected"),
            &["shape", "classification"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "Webhook evaluation time distribution",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["shape"],
        )?;
        let body_size = Histogram::with_opts(
            HistogramOpts::new("body_size_bytes", "Accepted webhook body size in bytes")
                .buckets(vec![256.0, 1024.0, 16384.0, 131072.0, 1048576.0, 2097152.0]),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(body_size.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        Ok(Arc::new(Self {
            registry,
            requests_total,
            rejections_total,
            request_duration,
            body_size,
        }))
    }

    pub fn record_admitted(&self, shape: GatewayShape, body_len: usize, elapsed: Duration) {
        self.requests_total
            .with_label_values(&[shape.as_str(), "admitted"])
            .inc();
        self.body_size.observe(body_len as f64);
        self.observe_duration(shape, elapsed);
    }

    pub fn record_rejected(
        &self,
        shape: GatewayShape,
        classification: Classification,
        elapsed: Duration,
    ) {
        self.requests_total
            .with_label_values(&[shape.as_str(), "rejected"])
            .inc();
        self.rejections_total
            .with_label_values(&[shape.as_str(), classification.as_str()])
            .inc();
        self.observe_duration(shape, elapsed);
    }

    fn observe_duration(&self, shape: GatewayShape, elapsed: Duration) {
        self.request_duration
            .with_label_values(&[shape.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
