use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::time::Duration;

/// Default Gemini API base URL.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model addressed by `/ask-gemini`.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default cap on inbound request bodies (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Relay settings, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Secret appended to every upstream call. Unset or empty disables forwarding.
    #[serde(default)]
    pub gemini_api_key: Option<Secret<String>>,
    #[serde(default = "default_model")]
    pub gemini_model: String,
    #[serde(default = "default_api_base")]
    pub gemini_api_base: String,
    /// Whole-request upstream timeout. `None` keeps the transport defaults.
    #[serde(default)]
    pub upstream_timeout_secs: Option<u64>,
    #[serde(default)]
    pub upstream_error_policy: UpstreamErrorPolicy,
    /// Comma-separated list of allowed CORS origins, or `*`.
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

/// How a non-2xx upstream response is surfaced to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamErrorPolicy {
    /// Keep the upstream status, wrap the body as `{"error": "Gemini API error", "details": ...}`.
    #[default]
    Wrap,
    /// Mirror the upstream status and body unchanged.
    Passthrough,
}

/// Parsed form of `cors_allowed_origins`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_api_base() -> String {
    DEFAULT_GEMINI_API_BASE.to_string()
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelaySettings {
    /// Load from `configuration.*`, `.env` and the process environment.
    pub fn load() -> Result<Self, AppError> {
        core_config::load_settings()
    }

    /// The configured API key, treating an empty value as absent.
    pub fn api_key(&self) -> Option<&Secret<String>> {
        self.gemini_api_key
            .as_ref()
            .filter(|key| !key.expose_secret().trim().is_empty())
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }

    pub fn allowed_origins(&self) -> AllowedOrigins {
        let origins: Vec<String> = self
            .cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gemini_api_key: None,
            gemini_model: default_model(),
            gemini_api_base: default_api_base(),
            upstream_timeout_secs: None,
            upstream_error_policy: UpstreamErrorPolicy::default(),
            cors_allowed_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<RelaySettings, AppError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        core_config::load_settings_from(::config::Environment::default().source(Some(map)))
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = load(&[]).expect("settings should load");

        assert_eq!(settings.port, 3000);
        assert_eq!(settings.host, "0.0.0.0");
        assert!(settings.api_key().is_none());
        assert_eq!(settings.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(settings.gemini_api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(settings.upstream_timeout(), None);
        assert_eq!(settings.upstream_error_policy, UpstreamErrorPolicy::Wrap);
        assert_eq!(settings.allowed_origins(), AllowedOrigins::Any);
        assert_eq!(settings.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = load(&[
            ("PORT", "8081"),
            ("GEMINI_API_KEY", "ABC123"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("UPSTREAM_TIMEOUT_SECS", "30"),
            ("UPSTREAM_ERROR_POLICY", "passthrough"),
        ])
        .expect("settings should load");

        assert_eq!(settings.port, 8081);
        assert_eq!(
            settings.api_key().map(|k| k.expose_secret().as_str()),
            Some("ABC123")
        );
        assert_eq!(settings.gemini_model, "gemini-1.5-pro");
        assert_eq!(settings.upstream_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            settings.upstream_error_policy,
            UpstreamErrorPolicy::Passthrough
        );
    }

    #[test]
    fn numeric_looking_key_is_kept_verbatim() {
        let settings = load(&[("GEMINI_API_KEY", "0012345")]).expect("settings should load");

        assert_eq!(
            settings.api_key().map(|k| k.expose_secret().as_str()),
            Some("0012345")
        );
    }

    #[test]
    fn empty_key_counts_as_missing() {
        let settings = load(&[("GEMINI_API_KEY", "")]).expect("settings should load");
        assert!(settings.api_key().is_none());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let settings = RelaySettings {
            cors_allowed_origins: "https://a.example, https://b.example,".to_string(),
            ..RelaySettings::default()
        };

        assert_eq!(
            settings.allowed_origins(),
            AllowedOrigins::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let settings = RelaySettings {
            gemini_api_key: Some(Secret::new("ABC123".to_string())),
            ..RelaySettings::default()
        };

        assert!(!format!("{:?}", settings).contains("ABC123"));
    }
}
