//! Layered configuration loading shared by every service in the workspace.
//!
//! Sources, lowest precedence first:
//! 1. an optional `configuration.{yaml,toml,json}` file in the working directory
//! 2. process environment variables (after `.env` has been merged in)
//!
//! Environment keys are unprefixed and lowercased, so `PORT` fills `port` and
//! `GEMINI_API_KEY` fills `gemini_api_key`.

use crate::error::AppError;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;

/// Base name of the optional configuration file.
pub const CONFIGURATION_FILE: &str = "configuration";

/// Load settings of type `T` from the configuration file and the process environment.
pub fn load_settings<T: DeserializeOwned>() -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    load_settings_from(Environment::default())
}

/// Load settings of type `T` using the given environment source.
///
/// Tests pass `Environment::default().source(Some(map))` to avoid touching
/// the real process environment.
pub fn load_settings_from<T: DeserializeOwned>(env: Environment) -> Result<T, AppError> {
    let config = Config::builder()
        .add_source(File::with_name(CONFIGURATION_FILE).required(false))
        .add_source(env)
        .build()?;

    Ok(config.try_deserialize()?)
}
