use gemini_relay::config::RelaySettings;
use gemini_relay::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = RelaySettings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "gemini-relay",
        &settings.log_level,
        settings.otlp_endpoint.as_deref(),
    );

    let app = Application::build(settings).await.map_err(|e| {
        tracing::error!("Failed to start gemini-relay: {:#}", e);
        e
    })?;

    app.run_until_stopped().await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    tracing::info!("Gemini relay stopped");
    Ok(())
}
