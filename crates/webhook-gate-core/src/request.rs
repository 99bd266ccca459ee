//! # Inbound Request
//!
//! Immutable view of a webhook request: case-insensitive headers plus the raw
//! body bytes, read once under a size cap.

use crate::{GateError, GateResult};
use bytes::Bytes;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Maximum accepted body size (2 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// ============================================================================
// Headers
// ============================================================================

/// Case-insensitive header map
///
/// Names are stored lowercased. When a name repeats, the first value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    values: HashMap<String, String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from name/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name.as_ref(), value);
        }
        headers
    }

    /// Add a header unless one with the same name is already present
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.values
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    /// Look up a header by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Header value if present and non-empty
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Declared body length, if a parseable `Content-Length` is present
    pub fn content_length(&self) -> Option<u64> {
        self.get("content-length")
            .and_then(|value| value.trim().parse().ok())
    }
}

// ============================================================================
// Request
// ============================================================================

/// Webhook request as seen by the admission pipeline
///
/// The body is held as [`Bytes`], so it can be read any number of times and
/// every read yields the same bytes.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    headers: RequestHeaders,
    body: Bytes,
}

impl InboundRequest {
    /// Create a request from an already-buffered body
    ///
    /// Fails with `BodyTooLarge` when the body is longer than `max_body_size`.
    pub fn new(headers: RequestHeaders, body: Bytes, max_body_size: usize) -> GateResult<Self> {
        if body.len() > max_body_size {
            return Err(GateError::BodyTooLarge {
                limit: max_body_size,
            });
        }

        Ok(Self { headers, body })
    }

    /// Read the body from `reader` under the size cap
    pub async fn read_from<R>(
        headers: RequestHeaders,
        reader: R,
        max_body_size: usize,
    ) -> GateResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        check_declared_length(&headers, max_body_size)?;
        let body = read_capped(reader, max_body_size).await?;
        Ok(Self { headers, body })
    }

    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// Raw body bytes
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Shared handle to the body, for passing downstream unchanged
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn into_parts(self) -> (RequestHeaders, Bytes) {
        (self.headers, self.body)
    }
}

/// Reject early when the declared `Content-Length` already exceeds the cap
pub fn check_declared_length(headers: &RequestHeaders, max_body_size: usize) -> GateResult<()> {
    match headers.content_length() {
        Some(length) if length > max_body_size as u64 => Err(GateError::BodyTooLarge {
            limit: max_body_size,
        }),
        _ => Ok(()),
    }
}

/// Read at most `max_body_size` bytes from `reader`
///
/// Reads one byte past the cap to tell "exactly at the cap" apart from
/// "over the cap".
pub async fn read_capped<R>(reader: R, max_body_size: usize) -> GateResult<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    reader
        .take(max_body_size as u64 + 1)
        .read_to_end(&mut buffer)
        .await
        .map_err(|e| GateError::ReadFailure {
            message: e.to_string(),
        })?;

    if buffer.len() > max_body_size {
        return Err(GateError::BodyTooLarge {
            limit: max_body_size,
        });
    }

    Ok(Bytes::from(buffer))
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
