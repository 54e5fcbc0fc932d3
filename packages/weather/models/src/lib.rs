#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live weather source settings.

use serde::{Deserialize, Serialize};

/// Environment variable holding the OpenWeatherMap API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Connection settings for the live weather source.
///
/// The API key is not part of this struct; it is read from
/// [`API_KEY_ENV`] so it never ends up in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Base URL of the OpenWeatherMap data API.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries for transient failures after the first attempt.
    pub max_retries: u32,
    /// Initial backoff delay; doubled after each retry.
    pub retry_base_delay_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            timeout_secs: 5,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}
