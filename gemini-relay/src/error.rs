//! Error type for the relay handler.
//!
//! Every recoverable failure is converted into a JSON [`ErrorEnvelope`] here, so
//! callers never see anything but a well-formed JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::{AppError, ErrorEnvelope};
use thiserror::Error;

/// Message returned when no API key is configured.
pub const MISSING_KEY_MESSAGE: &str = "Server configuration error: Gemini API Key missing.";

/// Message returned for any failure talking to the upstream API.
pub const COMMUNICATION_FAILURE_MESSAGE: &str = "Failed to communicate with AI.";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    /// Transport failure or timeout. The URL is stripped before this is built
    /// because it carries the API key.
    #[error("{}", describe_upstream(.0))]
    Upstream(#[source] reqwest::Error),

    #[error("upstream returned a non-JSON body: {0}")]
    MalformedUpstreamBody(#[from] serde_json::Error),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Upstream(err.without_url())
    }
}

/// Render a transport error with its kind and full cause chain, e.g.
/// `upstream request timed out: error sending request: operation timed out`.
fn describe_upstream(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "upstream request timed out"
    } else if err.is_connect() {
        "upstream connection failed"
    } else {
        "upstream request failed"
    };

    let mut message = format!("{}: {}", kind, err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::MissingApiKey => ErrorEnvelope::new(MISSING_KEY_MESSAGE)
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR),
            RelayError::Upstream(_) | RelayError::MalformedUpstreamBody(_) => {
                ErrorEnvelope::with_details(COMMUNICATION_FAILURE_MESSAGE, self.to_string())
                    .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RelayError::App(err) => err.into_response(),
        }
    }
}
