//! # Admission Filter
//!
//! Cheap header-only checks that run before the body is read or any secret is
//! resolved:
//!
//! 1. an optional static header that must carry a configured value
//! 2. an optional allow-list of event types read from a designated header

use crate::request::RequestHeaders;
use crate::secret::SecretValue;
use crate::{AdmissionDecision, GateError, GateResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::warn;

// ============================================================================
// Static Header Check
// ============================================================================

/// Header that must carry a fixed shared value
#[derive(Clone)]
pub struct CustomHeaderCheck {
    name: String,
    expected: SecretValue,
}

impl CustomHeaderCheck {
    pub fn new(name: impl Into<String>, expected: SecretValue) -> Self {
        Self {
            name: name.into(),
            expected,
        }
    }

    /// Build from optional configuration values
    ///
    /// Empty strings count as unset. Both unset disables the check; exactly one
    /// set is a configuration error.
    pub fn from_config(name: Option<&str>, value: Option<&str>) -> GateResult<Option<Self>> {
        let name = name.filter(|n| !n.is_empty());
        let value = value.filter(|v| !v.is_empty());

        match (name, value) {
            (Some(name), Some(value)) => Ok(Some(Self::new(
                name,
                SecretValue::from_string(value.to_string()),
            ))),
            (None, None) => Ok(None),
            _ => Err(GateError::InvalidConfig {
                message: "custom header name and value must be set together".to_string(),
            }),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.name
    }

    /// Compare the request header with the expected value in constant time
    pub fn check(&self, headers: &RequestHeaders) -> GateResult<()> {
        let presented = headers.get(&self.name).unwrap_or("").as_bytes();
        let matches: bool = presented.ct_eq(self.expected.expose_bytes()).into();

        if matches {
            Ok(())
        } else {
            Err(GateError::HeaderMismatch {
                header: self.name.clone(),
            })
        }
    }
}

impl fmt::Debug for CustomHeaderCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHeaderCheck")
            .field("name", &self.name)
            .field("expected", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Event Type Filter
// ============================================================================

/// Allow-list of event types
///
/// Matching is exact and case-sensitive. An empty filter allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct EventTypeFilter {
    allowed: BTreeSet<String>,
}

impl From<Vec<String>> for EventTypeFilter {
    fn from(event_types: Vec<String>) -> Self {
        Self::new(event_types)
    }
}

impl From<EventTypeFilter> for Vec<String> {
    fn from(filter: EventTypeFilter) -> Self {
        filter.allowed.into_iter().collect()
    }
}

impl EventTypeFilter {
    pub fn new<I, S>(event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: event_types
                .into_iter()
                .map(Into::into)
                .filter(|event_type: &String| !event_type.is_empty())
                .collect(),
        }
    }

    /// Filter that allows every event
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Whether an event with the given type may pass
    ///
    /// An absent event type never matches a non-empty filter.
    pub fn allows(&self, event_type: Option<&str>) -> bool {
        if self.allowed.is_empty() {
            return true;
        }

        event_type.is_some_and(|event_type| self.allowed.contains(event_type))
    }

    /// Check the event type header of a request
    ///
    /// An absent header is checked as the empty event type.
    pub fn check(&self, headers: &RequestHeaders, header_name: Option<&str>) -> GateResult<()> {
        if self.allowed.is_empty() {
            return Ok(());
        }

        // Configured allow-lists are checked for a header at startup, so only a
        // per-request list can get here without one.
        let header_name = header_name.ok_or_else(|| GateError::InvalidParams {
            message: "eventTypes needs an event type header, and none is configured".to_string(),
        })?;

        let event_type = headers.get(header_name);
        if self.allows(event_type) {
            Ok(())
        } else {
            Err(GateError::EventNotAllowed {
                event_type: event_type.unwrap_or_default().to_string(),
            })
        }
    }
}

// ============================================================================
// Admission Filter
// ============================================================================

/// Header-only admission stage
#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    custom_header: Option<CustomHeaderCheck>,
    event_types: EventTypeFilter,
    event_type_header: Option<String>,
}

impl AdmissionFilter {
    /// Create a filter, rejecting an allow-list with nowhere to read event types from
    pub fn new(
        custom_header: Option<CustomHeaderCheck>,
        event_types: EventTypeFilter,
        event_type_header: Option<String>,
    ) -> GateResult<Self> {
        let event_type_header = event_type_header.filter(|h| !h.is_empty());

        if !event_types.is_empty() && event_type_header.is_none() {
            return Err(GateError::InvalidConfig {
                message: "allowed event types are configured but no event type header is set"
                    .to_string(),
            });
        }

        Ok(Self {
            custom_header,
            event_types,
            event_type_header,
        })
    }

    pub fn custom_header(&self) -> Option<&CustomHeaderCheck> {
        self.custom_header.as_ref()
    }

    pub fn event_types(&self) -> &EventTypeFilter {
        &self.event_types
    }

    pub fn event_type_header(&self) -> Option<&str> {
        self.event_type_header.as_deref()
    }

    /// Run both checks in order, with an optional per-request allow-list
    pub fn check(
        &self,
        headers: &RequestHeaders,
        event_types_override: Option<&EventTypeFilter>,
    ) -> GateResult<()> {
        if let Some(custom_header) = &self.custom_header {
            custom_header.check(headers)?;
        }

        let event_types = event_types_override.unwrap_or(&self.event_types);
        event_types.check(headers, self.event_type_header.as_deref())
    }

    /// Decide admission for a request's headers
    pub fn filter(&self, headers: &RequestHeaders) -> AdmissionDecision {
        match self.check(headers, None) {
            Ok(()) => AdmissionDecision::Continue,
            Err(error) => {
                warn!(
                    classification = %error.classification(),
                    error = %error,
                    "Request refused by admission filter"
                );
                error.into()
            }
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
