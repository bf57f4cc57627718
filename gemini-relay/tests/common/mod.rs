//! Test helpers for gemini-relay integration tests.
//!
//! Each test spawns its own relay on a random port, pointed at a `wiremock`
//! server standing in for the Gemini API.

#![allow(dead_code)]

use gemini_relay::config::{RelaySettings, UpstreamErrorPolicy};
use gemini_relay::startup::Application;
use reqwest::Client;
use secrecy::Secret;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "ABC123";
pub const TEST_MODEL: &str = "gemini-2.0-flash";
pub const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

/// Running relay plus the mock upstream it forwards to.
pub struct TestApp {
    pub address: String,
    pub upstream: MockServer,
    client: Client,
}

impl TestApp {
    /// Spawn with a configured key and the default (`wrap`) policy.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn after letting the caller adjust the settings.
    pub async fn spawn_with(customize: impl FnOnce(&mut RelaySettings)) -> Self {
        let upstream = MockServer::start().await;

        let mut settings = RelaySettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            gemini_api_key: Some(Secret::new(TEST_API_KEY.to_string())),
            gemini_model: TEST_MODEL.to_string(),
            gemini_api_base: format!("{}/v1beta", upstream.uri()),
            upstream_error_policy: UpstreamErrorPolicy::Wrap,
            ..RelaySettings::default()
        };
        customize(&mut settings);

        let app = Application::build(settings)
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            let _ = app.run_until_stopped().await;
        });

        Self {
            address,
            upstream,
            client: Client::new(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn post_ask(&self, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}/ask-gemini", self.address))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
