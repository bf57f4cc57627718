use crate::config::UpstreamErrorPolicy;
use crate::error::RelayError;
use crate::models::{RequestEnvelope, UpstreamReply};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::{AppError, ErrorEnvelope};

/// Error label used when a non-2xx upstream response is wrapped.
pub const UPSTREAM_ERROR_MESSAGE: &str = "Gemini API error";

/// `POST /ask-gemini`: forward the caller's JSON to Gemini and relay the answer.
pub async fn ask_gemini(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match forward(&state, body).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                RelayError::MissingApiKey => {
                    tracing::error!("Rejecting /ask-gemini: GEMINI_API_KEY is not configured")
                }
                RelayError::App(app) => {
                    tracing::warn!(error = %app, "Rejecting malformed /ask-gemini request")
                }
                other => tracing::error!(error = %other, "Error communicating with Gemini API"),
            }
            err.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let body = body.map_err(reject_body)?;
    let envelope = RequestEnvelope::from_bytes(body).map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e))
    })?;

    let reply = state.gemini.generate_content(envelope).await?;

    Ok(render_reply(reply, state.settings.upstream_error_policy))
}

fn reject_body(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(rejection.body_text())
    } else {
        AppError::BadRequest(anyhow::anyhow!(rejection.body_text()))
    }
}

/// Turn an upstream reply into the caller's response under `policy`.
pub fn render_reply(reply: UpstreamReply, policy: UpstreamErrorPolicy) -> Response {
    let UpstreamReply { status, body } = reply;

    if status.is_success() || policy == UpstreamErrorPolicy::Passthrough {
        return (status, Json(body)).into_response();
    }

    tracing::warn!(
        status = status.as_u16(),
        "Gemini API returned a non-success status"
    );

    ErrorEnvelope::with_details(UPSTREAM_ERROR_MESSAGE, body).into_response_with(status)
}
