//! Request and response bodies for the JSON endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use webhook_gate_core::{
    AdmissionDecision, EventTypeFilter, GateError, GateResult, RequestHeaders, RequestOverrides,
    SecretReference, WebhookEventDetails,
};

/// Extension key under which admitted event details are returned
pub const EXTENSIONS_KEY: &str = "webhook_gate";

// ============================================================================
// Interceptor envelope
// ============================================================================

/// Envelope posted by an embedding event-trigger host
///
/// `body` is the raw webhook payload as text. Header values are lists; only
/// the first value of each header is considered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterceptorRequest {
    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub header: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub extensions: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub interceptor_params: InterceptorParams,

    #[serde(default)]
    pub context: Option<InterceptorContext>,
}

impl InterceptorRequest {
    /// Flatten the multi-valued header map
    ///
    /// Names are visited in byte order, so when two spellings of one header
    /// collide (`X-Auth` and `x-auth`) the same one wins on every request.
    pub fn request_headers(&self) -> RequestHeaders {
        let mut names: Vec<&String> = self.header.keys().collect();
        names.sort();

        RequestHeaders::from_pairs(names.into_iter().filter_map(|name| {
            self.header[name]
                .first()
                .map(|value| (name.as_str(), value.as_str()))
        }))
    }

    /// Per-request overrides carried by the envelope
    pub fn overrides(&self) -> GateResult<RequestOverrides> {
        Ok(RequestOverrides {
            secret_ref: self
                .interceptor_params
                .secret_ref
                .as_ref()
                .map(InterceptorSecretRef::to_reference)
                .transpose()?,
            event_types: self
                .interceptor_params
                .event_types
                .as_ref()
                .map(|types| EventTypeFilter::new(types.iter().cloned())),
            namespace_hint: self
                .context
                .as_ref()
                .and_then(|context| context.trigger_id.as_deref())
                .and_then(namespace_from_trigger_id)
                .map(str::to_string),
        })
    }
}

/// Trigger context supplied by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterceptorContext {
    #[serde(default)]
    pub event_url: Option<String>,

    #[serde(default)]
    pub event_id: Option<String>,

    /// `namespaces/<namespace>/triggers/<name>`
    #[serde(default)]
    pub trigger_id: Option<String>,
}

/// Per-trigger parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptorParams {
    #[serde(default)]
    pub secret_ref: Option<InterceptorSecretRef>,

    #[serde(default)]
    pub event_types: Option<Vec<String>>,
}

/// Secret reference in the host's naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptorSecretRef {
    pub secret_name: String,
    pub secret_key: String,

    #[serde(default)]
    pub namespace: Option<String>,
}

impl InterceptorSecretRef {
    fn to_reference(&self) -> GateResult<SecretReference> {
        if self.secret_name.is_empty() || self.secret_key.is_empty() {
            return Err(GateError::InvalidParams {
                message: "secretRef needs both secretName and secretKey".to_string(),
            });
        }

        Ok(SecretReference {
            namespace: self.namespace.clone().filter(|ns| !ns.is_empty()),
            name: self.secret_name.clone(),
            key: self.secret_key.clone(),
        })
    }
}

/// Namespace segment of a `namespaces/<ns>/triggers/<name>` identifier
pub fn namespace_from_trigger_id(trigger_id: &str) -> Option<&str> {
    let mut parts = trigger_id.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("namespaces"), Some(namespace), Some("triggers")) if !namespace.is_empty() => {
            Some(namespace)
        }
        _ => None,
    }
}

/// Decision returned to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorResponse {
    #[serde(rename = "continue")]
    pub continue_flow: bool,

    pub status: InterceptorStatus,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// Status carried by an interceptor decision
///
/// `code` is zero on success and the classification's numeric code otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptorStatus {
    pub code: u32,

    #[serde(default)]
    pub message: String,
}

impl InterceptorResponse {
    /// Response for an admitted request
    pub fn admitted(details: &WebhookEventDetails) -> Self {
        let mut extensions = HashMap::new();
        if !details.is_empty() {
            if let Ok(value) = serde_json::to_value(details) {
                extensions.insert(EXTENSIONS_KEY.to_string(), value);
            }
        }

        Self {
            continue_flow: true,
            status: InterceptorStatus {
                code: 0,
                message: String::new(),
            },
            extensions,
        }
    }
}

impl From<AdmissionDecision> for InterceptorResponse {
    fn from(decision: AdmissionDecision) -> Self {
        match decision {
            AdmissionDecision::Continue => Self::admitted(&WebhookEventDetails::default()),
            AdmissionDecision::Reject(rejection) => Self {
                continue_flow: false,
                status: InterceptorStatus {
                    code: rejection.classification.code(),
                    message: rejection.message,
                },
                extensions: HashMap::new(),
            },
        }
    }
}

// ============================================================================
// Health
// ============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub scheme: String,
}

#[cfg(test)]
#[path = "responses_tests.rs"]
mod tests;
