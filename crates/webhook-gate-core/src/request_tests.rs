//! Tests for the inbound request module.

use super::*;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::ReadBuf;

/// Reader that fails on the first poll
struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset",
        )))
    }
}

mod header_tests {
    use super::*;

    /// Lookups ignore the case of the header name.
    #[test]
    fn test_case_insensitive_lookup() {
        let headers = RequestHeaders::from_pairs([("X-PagerDuty-Signature", "v1=abc")]);

        assert_eq!(headers.get("x-pagerduty-signature"), Some("v1=abc"));
        assert_eq!(headers.get("X-PAGERDUTY-SIGNATURE"), Some("v1=abc"));
        assert!(headers.contains("X-Pagerduty-Signature"));
    }

    /// The first value of a repeated header is kept.
    #[test]
    fn test_first_value_wins() {
        let headers = RequestHeaders::from_pairs([("X-Event", "first"), ("x-event", "second")]);

        assert_eq!(headers.get("X-Event"), Some("first"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_get_non_empty_skips_empty_values() {
        let headers = RequestHeaders::from_pairs([("X-Empty", "")]);

        assert_eq!(headers.get("X-Empty"), Some(""));
        assert_eq!(headers.get_non_empty("X-Empty"), None);
    }

    #[test]
    fn test_content_length_parsing() {
        let headers = RequestHeaders::from_pairs([("Content-Length", " 42 ")]);
        assert_eq!(headers.content_length(), Some(42));

        let headers = RequestHeaders::from_pairs([("Content-Length", "lots")]);
        assert_eq!(headers.content_length(), None);
    }
}

mod body_tests {
    use super::*;

    /// A body of exactly the cap is accepted.
    #[tokio::test]
    async fn test_body_at_cap_is_accepted() {
        let body = vec![b'a'; DEFAULT_MAX_BODY_SIZE];

        let read = read_capped(body.as_slice(), DEFAULT_MAX_BODY_SIZE)
            .await
            .unwrap();

        assert_eq!(read.len(), DEFAULT_MAX_BODY_SIZE);
    }

    /// One byte over the cap is rejected.
    #[tokio::test]
    async fn test_body_over_cap_is_rejected() {
        let body = vec![b'a'; DEFAULT_MAX_BODY_SIZE + 1];

        let result = read_capped(body.as_slice(), DEFAULT_MAX_BODY_SIZE).await;

        assert_eq!(
            result,
            Err(GateError::BodyTooLarge {
                limit: DEFAULT_MAX_BODY_SIZE
            })
        );
    }

    #[tokio::test]
    async fn test_read_failure_is_reported() {
        let result = read_capped(FailingReader, 16).await;

        assert!(matches!(result, Err(GateError::ReadFailure { .. })));
    }

    /// Failure after some bytes arrived still fails the read.
    #[tokio::test]
    async fn test_mid_stream_failure_is_reported() {
        let reader = tokio_test::io::Builder::new()
            .read(b"{\"event\":")
            .read_error(io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed"))
            .build();

        let result = read_capped(reader, 64).await;

        assert!(matches!(result, Err(GateError::ReadFailure { .. })));
    }

    /// The cap applies to the total, not to each chunk.
    #[tokio::test]
    async fn test_cap_spans_chunks() {
        let reader = tokio_test::io::Builder::new()
            .read(b"12345")
            .read(b"67890")
            .read(b"X")
            .build();

        let result = read_capped(reader, 10).await;

        assert_eq!(result, Err(GateError::BodyTooLarge { limit: 10 }));
    }

    /// A declared length above the cap fails before anything is read.
    #[tokio::test]
    async fn test_declared_length_over_cap() {
        let headers = RequestHeaders::from_pairs([("Content-Length", "11")]);

        let result = InboundRequest::read_from(headers, FailingReader, 10).await;

        assert!(matches!(result, Err(GateError::BodyTooLarge { limit: 10 })));
    }

    #[test]
    fn test_new_rejects_oversized_buffer() {
        let result = InboundRequest::new(RequestHeaders::new(), Bytes::from_static(b"12345"), 4);

        assert!(matches!(result, Err(GateError::BodyTooLarge { limit: 4 })));
    }

    /// Reading the body twice yields identical bytes.
    #[tokio::test]
    async fn test_body_reads_are_repeatable() {
        let payload = br#"{"event":{"id":"01ABC","event_type":"incident.triggered"}}"#;
        let request = InboundRequest::read_from(
            RequestHeaders::new(),
            payload.as_slice(),
            DEFAULT_MAX_BODY_SIZE,
        )
        .await
        .unwrap();

        let first = request.body().to_vec();
        let second = request.body().to_vec();
        let shared = request.body_bytes();

        assert_eq!(first, payload.to_vec());
        assert_eq!(first, second);
        assert_eq!(shared.as_ref(), payload.as_slice());
    }
}
