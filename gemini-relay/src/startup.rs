//! Application startup and lifecycle management.
//!
//! Builds the shared state and router, binds the listener and runs the HTTP
//! server until a shutdown signal arrives.

use crate::config::{AllowedOrigins, RelaySettings};
use crate::handlers::{ask_gemini, health_check, index};
use crate::services::GeminiClient;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::from_fn,
    response::Response,
    routing::{get, post},
    Router,
};
use service_core::error::ErrorEnvelope;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::any::Any;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RelaySettings>,
    pub gemini: Arc<GeminiClient>,
}

impl AppState {
    pub fn new(settings: RelaySettings) -> anyhow::Result<Self> {
        let gemini = GeminiClient::new(&settings)
            .map_err(|e| anyhow::anyhow!("Failed to build Gemini HTTP client: {}", e))?;

        Ok(Self {
            settings: Arc::new(settings),
            gemini: Arc::new(gemini),
        })
    }
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/ask-gemini", post(ask_gemini));

    let settings = Arc::clone(&state.settings);
    with_middleware(routes, &settings).with_state(state)
}

/// Wrap `routes` in the shared middleware stack, innermost first.
fn with_middleware(routes: Router<AppState>, settings: &RelaySettings) -> Router<AppState> {
    routes
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(settings))
        .layer(from_fn(security_headers_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(from_fn(request_id_middleware))
}

fn cors_layer(settings: &RelaySettings) -> CorsLayer {
    let allow_origin = match settings.allowed_origins() {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");

    ErrorEnvelope::new("Internal server error")
        .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given settings.
    ///
    /// A missing API key is logged but does not stop startup; `/ask-gemini`
    /// answers with a configuration error until the key is provided.
    pub async fn build(settings: RelaySettings) -> anyhow::Result<Self> {
        let address = format!("{}:{}", settings.host, settings.port);

        let state = AppState::new(settings)?;

        if state.gemini.is_configured() {
            tracing::info!(model = %state.gemini.model(), "Initialized Gemini client");
        } else {
            tracing::warn!(
                "GEMINI_API_KEY is not set; /ask-gemini will return a configuration error"
            );
        }

        // Port 0 binds a random port for testing
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Gemini relay listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}
