//! # Webhook Event Details
//!
//! Identifying fields pulled from a verified payload for logging and for the
//! interceptor response. The payload itself is never modified.

use crate::request::InboundRequest;
use crate::signature::SignatureScheme;
use crate::{GateError, GateResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Header carrying the GitHub delivery id
pub const GITHUB_DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Identifying fields of a webhook event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEventDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl WebhookEventDetails {
    /// Extract details from a request's body and headers
    ///
    /// PagerDuty carries both fields in the body under `event`. GitHub sends
    /// them as headers. The body must be JSON either way.
    pub fn extract(
        request: &InboundRequest,
        scheme: SignatureScheme,
        event_type_header: Option<&str>,
    ) -> GateResult<Self> {
        let payload: Value =
            serde_json::from_slice(request.body()).map_err(|e| GateError::MalformedPayload {
                message: e.to_string(),
            })?;

        let header = |name: &str| request.headers().get_non_empty(name).map(str::to_string);

        let details = match scheme {
            SignatureScheme::PagerDuty => Self {
                event_id: string_at(&payload, "/event/id"),
                event_type: string_at(&payload, "/event/event_type")
                    .or_else(|| event_type_header.and_then(header)),
            },
            SignatureScheme::GitHub | SignatureScheme::GitHubLegacy => Self {
                event_id: header(GITHUB_DELIVERY_HEADER),
                event_type: event_type_header.and_then(header),
            },
        };

        Ok(details)
    }

    pub fn is_empty(&self) -> bool {
        self.event_id.is_none() && self.event_type.is_none()
    }
}

fn string_at(payload: &Value, pointer: &str) -> Option<String> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
