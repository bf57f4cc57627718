use axum::body::Bytes;
use axum::http::StatusCode;
use serde::de::IgnoredAny;

/// Caller-supplied JSON, forwarded upstream byte-for-byte.
///
/// The relay never inspects the shape. It only checks that the bytes are
/// well-formed JSON so a malformed request is rejected before it costs an
/// upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    body: Bytes,
}

impl RequestEnvelope {
    /// Validate raw request bytes. An empty body stands in for `{}`.
    pub fn from_bytes(body: Bytes) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self {
                body: Bytes::from_static(b"{}"),
            });
        }

        serde_json::from_slice::<IgnoredAny>(&body)?;
        Ok(Self { body })
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }
}

/// Status and parsed JSON body returned by the upstream API.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: serde_json::Value,
}
