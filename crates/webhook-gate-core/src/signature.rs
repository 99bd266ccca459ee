//! # Signature Verification
//!
//! HMAC signatures computed by webhook senders over the raw request body.
//!
//! | Scheme | Header | Envelope | Digest |
//! |--------|--------|----------|--------|
//! | [`SignatureScheme::PagerDuty`] | `X-PagerDuty-Signature` | `v1=<hex>[,v1=<hex>...]` | HMAC-SHA256 |
//! | [`SignatureScheme::GitHub`] | `X-Hub-Signature-256` | `sha256=<hex>` | HMAC-SHA256 |
//! | [`SignatureScheme::GitHubLegacy`] | `X-Hub-Signature` | `sha1=<hex>` | HMAC-SHA1 |
//!
//! Digests are compared with [`subtle`], and every candidate in a
//! multi-signature header is compared before deciding.

use crate::request::RequestHeaders;
use crate::secret::SecretValue;
use crate::{GateError, GateResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::{fmt, str::FromStr};
use subtle::{Choice, ConstantTimeEq};
use tracing::{debug, instrument};

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

// ============================================================================
// Schemes
// ============================================================================

/// Signature format used by a webhook sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// PagerDuty webhooks v3
    #[default]
    #[serde(rename = "pagerduty")]
    PagerDuty,
    /// GitHub `X-Hub-Signature-256`
    #[serde(rename = "github")]
    GitHub,
    /// GitHub `X-Hub-Signature` (SHA-1)
    #[serde(rename = "github_legacy")]
    GitHubLegacy,
}

impl SignatureScheme {
    /// Header carrying the signature by default
    pub fn signature_header(&self) -> &'static str {
        match self {
            Self::PagerDuty => "X-PagerDuty-Signature",
            Self::GitHub => "X-Hub-Signature-256",
            Self::GitHubLegacy => "X-Hub-Signature",
        }
    }

    /// Header carrying the event type by default, if the sender has one
    pub fn event_type_header(&self) -> Option<&'static str> {
        match self {
            Self::PagerDuty => None,
            Self::GitHub | Self::GitHubLegacy => Some("X-GitHub-Event"),
        }
    }

    /// Prefix of each signature entry
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::PagerDuty => "v1=",
            Self::GitHub => "sha256=",
            Self::GitHubLegacy => "sha1=",
        }
    }

    /// Whether the header may carry several comma-separated signatures
    pub fn allows_multiple(&self) -> bool {
        matches!(self, Self::PagerDuty)
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            Self::PagerDuty | Self::GitHub => 32,
            Self::GitHubLegacy => 20,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PagerDuty => "pagerduty",
            Self::GitHub => "github",
            Self::GitHubLegacy => "github_legacy",
        }
    }

    /// Raw HMAC digest of `body` keyed by `secret`
    pub fn compute_digest(&self, secret: &[u8], body: &[u8]) -> GateResult<Vec<u8>> {
        let invalid_key = |_| GateError::InvalidConfig {
            message: "secret cannot be used as HMAC key".to_string(),
        };

        let digest = match self {
            Self::PagerDuty | Self::GitHub => {
                let mut mac = HmacSha256::new_from_slice(secret).map_err(invalid_key)?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
            Self::GitHubLegacy => {
                let mut mac = HmacSha1::new_from_slice(secret).map_err(invalid_key)?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
        };

        Ok(digest)
    }

    /// Header value a sender would attach to `body`
    pub fn sign(&self, secret: &[u8], body: &[u8]) -> GateResult<String> {
        let digest = self.compute_digest(secret, body)?;
        Ok(format!("{}{}", self.prefix(), hex::encode(digest)))
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignatureScheme {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pagerduty" => Ok(Self::PagerDuty),
            "github" => Ok(Self::GitHub),
            "github_legacy" | "github-legacy" => Ok(Self::GitHubLegacy),
            other => Err(GateError::InvalidConfig {
                message: format!("unknown signature scheme '{}'", other),
            }),
        }
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Verifies the signature header of a request against its body
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    scheme: SignatureScheme,
    header_name: String,
}

impl SignatureVerifier {
    /// Verifier reading the scheme's default header
    pub fn new(scheme: SignatureScheme) -> Self {
        Self {
            scheme,
            header_name: scheme.signature_header().to_string(),
        }
    }

    /// Read the signature from a different header
    pub fn with_header(mut self, header_name: impl Into<String>) -> Self {
        self.header_name = header_name.into();
        self
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Check the request signature
    ///
    /// Passes when any well-formed entry in the header matches the HMAC of
    /// `body` keyed by `secret`.
    #[instrument(
        skip(self, headers, body, secret),
        fields(scheme = %self.scheme, body_len = body.len())
    )]
    pub fn verify(
        &self,
        headers: &RequestHeaders,
        body: &[u8],
        secret: &SecretValue,
    ) -> GateResult<()> {
        let header_value =
            headers
                .get_non_empty(&self.header_name)
                .ok_or_else(|| GateError::MissingSignature {
                    header: self.header_name.clone(),
                })?;

        if secret.is_empty() {
            return Err(GateError::InvalidConfig {
                message: "resolved webhook secret is empty".to_string(),
            });
        }

        let candidates = self.parse_candidates(header_value);
        if candidates.is_empty() {
            return Err(GateError::MalformedSignature {
                header: self.header_name.clone(),
                reason: format!(
                    "no '{}' entry with a valid hex digest",
                    self.scheme.prefix()
                ),
            });
        }

        let expected = self.scheme.compute_digest(secret.expose_bytes(), body)?;

        let matched = any_candidate(&candidates, |candidate| {
            candidate.ct_eq(expected.as_slice())
        });

        if bool::from(matched) {
            debug!(candidates = candidates.len(), "Webhook signature verified");
            Ok(())
        } else {
            Err(GateError::SignatureInvalid)
        }
    }

    /// Decoded digests of every recognised entry in the header
    ///
    /// Entries with an unknown prefix, bad hex or the wrong length are skipped.
    fn parse_candidates(&self, header_value: &str) -> Vec<Vec<u8>> {
        let entries: Vec<&str> = if self.scheme.allows_multiple() {
            header_value.split(',').collect()
        } else {
            vec![header_value]
        };

        entries
            .into_iter()
            .filter_map(|entry| entry.trim().strip_prefix(self.scheme.prefix()))
            .filter_map(|digest| hex::decode(digest).ok())
            .filter(|digest| digest.len() == self.scheme.digest_len())
            .collect()
    }
}

/// OR of `compare` over every candidate, with no early exit
fn any_candidate<F>(candidates: &[Vec<u8>], mut compare: F) -> Choice
where
    F: FnMut(&[u8]) -> Choice,
{
    candidates
        .iter()
        .fold(Choice::from(0u8), |matched, candidate| {
            matched | compare(candidate)
        })
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
