//! # Admission Pipeline
//!
//! Runs the stages in a fixed order and stops at the first failure:
//!
//! 1. static header check
//! 2. event-type allow-list
//! 3. secret resolution
//! 4. signature verification
//! 5. event detail extraction (second read of the body)
//!
//! Stages 1 and 2 need only headers, so HTTP callers can run them before
//! reading the body with [`AdmissionPipeline::admit_headers`].

use crate::admission::{AdmissionFilter, CustomHeaderCheck, EventTypeFilter};
use crate::event::WebhookEventDetails;
use crate::request::{InboundRequest, RequestHeaders, DEFAULT_MAX_BODY_SIZE};
use crate::secret::{SecretReference, SecretResolver};
use crate::signature::{SignatureScheme, SignatureVerifier};
use crate::{AdmissionDecision, GateError, GateResult};
use tracing::{info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Admission rules, fixed at startup
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    /// Signature format of the sender
    pub scheme: SignatureScheme,

    /// Signature header; defaults to the scheme's header
    pub signature_header: Option<String>,

    /// Event type header; defaults to the scheme's header, if it has one
    pub event_type_header: Option<String>,

    /// Static header that must carry a fixed value
    pub custom_header: Option<CustomHeaderCheck>,

    /// Allowed event types; empty allows all
    pub allowed_event_types: EventTypeFilter,

    /// Reject verified bodies that are not JSON
    pub require_json_body: bool,

    /// Body size cap in bytes
    pub max_body_size: usize,
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self {
            scheme: SignatureScheme::default(),
            signature_header: None,
            event_type_header: None,
            custom_header: None,
            allowed_event_types: EventTypeFilter::allow_all(),
            require_json_body: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Per-request settings supplied by an embedding host
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    /// Secret to verify against instead of the configured one
    pub secret_ref: Option<SecretReference>,

    /// Allow-list replacing the configured one
    pub event_types: Option<EventTypeFilter>,

    /// Namespace used for secret references that name none
    pub namespace_hint: Option<String>,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Immutable, shareable request evaluator
#[derive(Debug, Clone)]
pub struct AdmissionPipeline {
    filter: AdmissionFilter,
    verifier: SignatureVerifier,
    resolver: SecretResolver,
    scheme: SignatureScheme,
    require_json_body: bool,
    max_body_size: usize,
}

impl AdmissionPipeline {
    /// Build the pipeline, validating the policy
    pub fn new(policy: GatewayPolicy, resolver: SecretResolver) -> GateResult<Self> {
        if policy.max_body_size == 0 {
            return Err(GateError::InvalidConfig {
                message: "maximum body size must be greater than zero".to_string(),
            });
        }

        let event_type_header = policy
            .event_type_header
            .filter(|header| !header.is_empty())
            .or_else(|| policy.scheme.event_type_header().map(str::to_string));

        let filter = AdmissionFilter::new(
            policy.custom_header,
            policy.allowed_event_types,
            event_type_header,
        )?;

        let mut verifier = SignatureVerifier::new(policy.scheme);
        if let Some(header) = policy.signature_header.filter(|header| !header.is_empty()) {
            verifier = verifier.with_header(header);
        }

        Ok(Self {
            filter,
            verifier,
            resolver,
            scheme: policy.scheme,
            require_json_body: policy.require_json_body,
            max_body_size: policy.max_body_size,
        })
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn admission_filter(&self) -> &AdmissionFilter {
        &self.filter
    }

    pub fn signature_header(&self) -> &str {
        self.verifier.header_name()
    }

    /// Header-only stages: static header, then event type
    pub fn admit_headers(
        &self,
        headers: &RequestHeaders,
        overrides: &RequestOverrides,
    ) -> GateResult<()> {
        self.filter
            .check(headers, overrides.event_types.as_ref())
            .inspect_err(log_rejection)
    }

    /// Body stages: resolve secret, verify signature, extract details
    pub async fn authenticate(
        &self,
        request: &InboundRequest,
        overrides: &RequestOverrides,
    ) -> GateResult<WebhookEventDetails> {
        self.authenticate_inner(request, overrides)
            .await
            .inspect_err(log_rejection)
    }

    async fn authenticate_inner(
        &self,
        request: &InboundRequest,
        overrides: &RequestOverrides,
    ) -> GateResult<WebhookEventDetails> {
        let secret = self
            .resolver
            .resolve(
                overrides.secret_ref.as_ref(),
                overrides.namespace_hint.as_deref(),
            )
            .await?;

        self.verifier
            .verify(request.headers(), request.body(), &secret)?;

        let details = if self.require_json_body {
            WebhookEventDetails::extract(
                request,
                self.scheme,
                self.filter.event_type_header(),
            )?
        } else {
            WebhookEventDetails::extract(request, self.scheme, self.filter.event_type_header())
                .unwrap_or_default()
        };

        info!(
            scheme = %self.scheme,
            event_id = details.event_id.as_deref().unwrap_or("unknown"),
            event_type = details.event_type.as_deref().unwrap_or("unknown"),
            body_len = request.body().len(),
            "Webhook admitted"
        );

        Ok(details)
    }

    /// Run every stage over a fully buffered request
    pub async fn process(
        &self,
        request: &InboundRequest,
        overrides: &RequestOverrides,
    ) -> GateResult<WebhookEventDetails> {
        self.admit_headers(request.headers(), overrides)?;
        self.authenticate(request, overrides).await
    }

    /// Decide admission for a fully buffered request
    pub async fn evaluate(
        &self,
        request: &InboundRequest,
        overrides: &RequestOverrides,
    ) -> AdmissionDecision {
        match self.process(request, overrides).await {
            Ok(_) => AdmissionDecision::Continue,
            Err(error) => error.into(),
        }
    }
}

fn log_rejection(error: &GateError) {
    if error.is_security_failure() {
        warn!(
            classification = %error.classification(),
            error = %error,
            "Webhook rejected: authentication failed"
        );
    } else {
        warn!(
            classification = %error.classification(),
            error = %error,
            "Webhook rejected"
        );
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
