#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Live weather and air quality for Raahi.
//!
//! Provides [`OpenWeatherMapSource`], a [`WeatherSource`] backed by the
//! OpenWeatherMap current-weather and air-pollution endpoints, and
//! [`select_source`], which picks the live source when an API key is
//! configured and the offline mock otherwise.

pub mod openweathermap;
pub mod retry;

pub use openweathermap::OpenWeatherMapSource;

pub use raahi_weather_models::{API_KEY_ENV, WeatherConfig};

use raahi_environment::{MockWeatherSource, WeatherSource};

/// Reads the API key from [`API_KEY_ENV`], ignoring blank values.
#[must_use]
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Chooses the weather source once at startup.
///
/// With a non-blank `api_key` the live OpenWeatherMap source is used;
/// otherwise, or if the HTTP client cannot be built, the mock source.
#[must_use]
pub fn select_source(api_key: Option<String>, config: &WeatherConfig) -> Box<dyn WeatherSource> {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        log::info!("No {API_KEY_ENV} configured; using mock weather data");
        return Box::new(MockWeatherSource::new());
    };

    match OpenWeatherMapSource::new(api_key, config.clone()) {
        Ok(source) => {
            log::info!("Using OpenWeatherMap at {}", config.base_url);
            Box::new(source)
        }
        Err(e) => {
            log::warn!("Failed to initialise OpenWeatherMap client: {e}; using mock weather data");
            Box::new(MockWeatherSource::new())
        }
    }
}
