//! # Webhook Gate HTTP Service
//!
//! HTTP surface for the admission pipeline.
//!
//! This service provides:
//! - Standalone gateway endpoint that echoes admitted bodies
//! - Interceptor endpoint for event-trigger hosts
//! - Health and metrics endpoints

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::*;
pub use errors::*;
pub use metrics::{GatewayMetrics, GatewayShape};
pub use responses::*;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::{future::IntoFuture, sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};
use webhook_gate_core::{
    request::check_declared_length, AdmissionDecision, AdmissionPipeline, GateError,
    InboundRequest, RequestHeaders, RequestOverrides, WebhookEventDetails,
};

/// Slack allowed on top of the body cap for the interceptor envelope
const ENVELOPE_OVERHEAD: usize = 64 * 1024;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Immutable admission pipeline
    pub pipeline: Arc<AdmissionPipeline>,

    /// Metrics collector for observability
    pub metrics: Arc<GatewayMetrics>,
}

impl AppState {
    pub fn new(pipeline: AdmissionPipeline, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_gateway))
        .route("/interceptor", post(handle_interceptor))
        .route("/health", get(handle_health_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Returns after a shutdown signal once in-flight requests finish, or once the
/// shutdown timeout elapses, whichever comes first.
pub async fn start_server(
    config: &ServerConfig,
    pipeline: AdmissionPipeline,
) -> Result<(), ServiceError> {
    let metrics = GatewayMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let app = create_router(AppState::new(pipeline, metrics));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_timeout = std::time::Duration::from_secs(config.shutdown_timeout_seconds);
    let (signal_tx, mut signal_rx) = tokio::sync::watch::channel(false);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(
                "Initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
            let _ = signal_tx.send(true);
        })
        .into_future();

    let deadline = async move {
        if signal_rx.wait_for(|fired| *fired).await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = deadline => {
            warn!("Shutdown timeout elapsed, abandoning in-flight requests");
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Gateway Handlers
// ============================================================================

/// Standalone gateway
///
/// Header-only checks run before the body is read. On success the body is
/// returned byte-for-byte with the caller's content type.
#[instrument(skip(state, request))]
pub async fn handle_gateway(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, GatewayHandlerError> {
    let start = Instant::now();
    let result = admit_standalone(&state.pipeline, request).await;

    match result {
        Ok(admitted) => {
            state.metrics.record_admitted(
                GatewayShape::Standalone,
                admitted.body().len(),
                start.elapsed(),
            );
            Ok(echo_response(admitted))
        }
        Err(e) => {
            state.metrics.record_rejected(
                GatewayShape::Standalone,
                e.classification(),
                start.elapsed(),
            );
            Err(e.into())
        }
    }
}

async fn admit_standalone(
    pipeline: &AdmissionPipeline,
    request: Request,
) -> Result<InboundRequest, GateError> {
    let (parts, body) = request.into_parts();
    let headers = request_headers(&parts.headers);
    let overrides = RequestOverrides::default();

    pipeline.admit_headers(&headers, &overrides)?;

    let max_body_size = pipeline.max_body_size();
    check_declared_length(&headers, max_body_size)?;
    let body = read_body(body, max_body_size).await?;

    let inbound = InboundRequest::new(headers, body, max_body_size)?;
    pipeline.authenticate(&inbound, &overrides).await?;

    Ok(inbound)
}

fn echo_response(request: InboundRequest) -> Response {
    let content_type = request
        .headers()
        .get_non_empty("content-type")
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let (_, body) = request.into_parts();
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}

/// Interceptor for event-trigger hosts
///
/// Parsed envelopes always get a 200 with the decision inside; only an
/// unreadable envelope is an HTTP error.
#[instrument(skip(state, request))]
pub async fn handle_interceptor(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<InterceptorResponse>, GatewayHandlerError> {
    let start = Instant::now();
    let envelope_cap = state
        .pipeline
        .max_body_size()
        .saturating_mul(2)
        .saturating_add(ENVELOPE_OVERHEAD);

    let raw = read_body(request.into_body(), envelope_cap)
        .await
        .map_err(|e| GatewayHandlerError::InvalidEnvelope {
            message: e.to_string(),
        })?;

    let envelope: InterceptorRequest =
        serde_json::from_slice(&raw).map_err(|e| GatewayHandlerError::InvalidEnvelope {
            message: e.to_string(),
        })?;

    let result = evaluate_envelope(&state.pipeline, envelope).await;

    let response = match result {
        Ok((details, body_len)) => {
            state.metrics.record_admitted(
                GatewayShape::Interceptor,
                body_len,
                start.elapsed(),
            );
            InterceptorResponse::admitted(&details)
        }
        Err(e) => {
            state.metrics.record_rejected(
                GatewayShape::Interceptor,
                e.classification(),
                start.elapsed(),
            );
            AdmissionDecision::from(e).into()
        }
    };

    Ok(Json(response))
}

async fn evaluate_envelope(
    pipeline: &AdmissionPipeline,
    envelope: InterceptorRequest,
) -> Result<(WebhookEventDetails, usize), GateError> {
    let headers = envelope.request_headers();
    let overrides = envelope.overrides()?;

    let inbound = InboundRequest::new(
        headers,
        Bytes::from(envelope.body),
        pipeline.max_body_size(),
    )?;
    let details = pipeline.process(&inbound, &overrides).await?;

    Ok((details, inbound.body().len()))
}

/// Read a body, failing once more than `max_body_size` bytes arrive
async fn read_body(body: Body, max_body_size: usize) -> Result<Bytes, GateError> {
    match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(GateError::BodyTooLarge {
            limit: max_body_size,
        }),
        Err(e) => Err(GateError::ReadFailure {
            message: e.to_string(),
        }),
    }
}

/// Convert HTTP headers, skipping values that are not valid text
fn request_headers(headers: &HeaderMap) -> RequestHeaders {
    RequestHeaders::from_pairs(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

// ============================================================================
// Health and Metrics
// ============================================================================

async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        scheme: state.pipeline.scheme().to_string(),
    })
}

async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            correlation_id = %correlation_id,
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
