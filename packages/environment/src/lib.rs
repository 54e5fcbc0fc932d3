#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! City-level environmental scoring.
//!
//! Turns a [`WeatherReading`](raahi_environment_models::WeatherReading)
//! into a 0-100 score plus a list of alerts and green-travel
//! recommendations. Readings come from a [`WeatherSource`]; when a source
//! is unavailable the neutral fallback reading is scored instead, so
//! callers always get a result.

pub mod advisories;
pub mod scorer;
pub mod source;

pub use advisories::advisories;
pub use scorer::{CityReport, EnvironmentalScorer, ReadingSource};
pub use source::{MockWeatherSource, WeatherSource};

use thiserror::Error;

/// Errors from constructing an [`EnvironmentalScorer`].
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// The scoring configuration is unusable.
    #[error("Invalid environment configuration: {message}")]
    InvalidConfig {
        /// Description of what was wrong.
        message: String,
    },
}

/// Errors reported by a [`WeatherSource`].
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The source could not produce a reading (network failure, missing
    /// credentials, upstream error status).
    #[error("Weather data unavailable: {message}")]
    Unavailable {
        /// Why the reading could not be fetched.
        message: String,
    },

    /// The upstream responded but the payload could not be interpreted.
    #[error("Malformed weather response: {message}")]
    Malformed {
        /// Description of the problem.
        message: String,
    },
}
