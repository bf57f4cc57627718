//! Gemini `generateContent` client.
//!
//! Posts the caller's JSON to the configured model with the server-held API key
//! appended as the `key` query parameter. The body is never rewritten.

use crate::config::RelaySettings;
use crate::error::RelayError;
use crate::models::{RequestEnvelope, UpstreamReply};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, Secret};

/// Gemini upstream client, shared by every request.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    model: String,
    api_key: Option<Secret<String>>,
}

impl GeminiClient {
    pub fn new(settings: &RelaySettings) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.upstream_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_base: settings.gemini_api_base.trim_end_matches('/').to_string(),
            model: settings.gemini_model.clone(),
            api_key: settings.api_key().cloned(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// API URL for the configured model, without the key.
    fn api_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.api_base, self.model, method)
    }

    /// Forward `envelope` to `generateContent` and parse the upstream body as JSON.
    ///
    /// Fails with [`RelayError::MissingApiKey`] before any network I/O when no
    /// key is configured. Any status code is returned as-is; deciding what a
    /// non-2xx status means is left to the caller.
    pub async fn generate_content(
        &self,
        envelope: RequestEnvelope,
    ) -> Result<UpstreamReply, RelayError> {
        let api_key = self.api_key.as_ref().ok_or(RelayError::MissingApiKey)?;

        let body = envelope.into_bytes();

        tracing::debug!(
            model = %self.model,
            body_len = body.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .query(&[("key", api_key.expose_secret())])
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes)?;

        tracing::debug!(
            model = %self.model,
            status = status.as_u16(),
            "Received response from Gemini API"
        );

        Ok(UpstreamReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use std::time::Duration;
    use wiremock::matchers::{body_bytes, header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base: &str, key: Option<&str>) -> RelaySettings {
        RelaySettings {
            gemini_api_base: base.to_string(),
            gemini_api_key: key.map(|k| Secret::new(k.to_string())),
            ..RelaySettings::default()
        }
    }

    fn envelope(raw: &'static str) -> RequestEnvelope {
        RequestEnvelope::from_bytes(Bytes::from(raw)).unwrap()
    }

    #[tokio::test]
    async fn forwards_body_unchanged_with_key_in_query() {
        let server = MockServer::start().await;
        let raw = r#"{"contents":[{"parts":[{"text":"hi"}]}]}"#;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "ABC123"))
            .and(header_eq("content-type", "application/json"))
            .and(body_bytes(raw.as_bytes()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&settings(&server.uri(), Some("ABC123"))).unwrap();
        let reply = client.generate_content(envelope(raw)).await.unwrap();

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body, serde_json::json!({ "candidates": [] }));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0]
            .url
            .as_str()
            .ends_with(":generateContent?key=ABC123"));
    }

    #[tokio::test]
    async fn missing_key_short_circuits_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&settings(&server.uri(), None)).unwrap();
        assert!(!client.is_configured());

        let err = client.generate_content(envelope("{}")).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingApiKey));
    }

    #[tokio::test]
    async fn non_success_status_is_returned_not_failed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "bad key" }
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&settings(&server.uri(), Some("nope"))).unwrap();
        let reply = client.generate_content(envelope("{}")).await.unwrap();

        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"]["message"], "bad key");
    }

    #[tokio::test]
    async fn non_json_body_is_a_malformed_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&settings(&server.uri(), Some("ABC123"))).unwrap();
        let err = client.generate_content(envelope("{}")).await.unwrap_err();

        assert!(matches!(err, RelayError::MalformedUpstreamBody(_)));
    }

    #[tokio::test]
    async fn timeout_error_does_not_leak_the_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut settings = settings(&server.uri(), Some("SUPERSECRET"));
        settings.upstream_timeout_secs = Some(1);

        let client = GeminiClient::new(&settings).unwrap();
        let err = client.generate_content(envelope("{}")).await.unwrap_err();

        assert!(matches!(err, RelayError::Upstream(_)));
        let message = err.to_string();
        assert!(message.starts_with("upstream request timed out: "));
        assert!(!message.contains("SUPERSECRET"));
    }
}
