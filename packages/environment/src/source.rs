//! Weather source abstraction.
//!
//! The live OpenWeatherMap implementation lives in `raahi_weather`; this
//! module only defines the capability and the offline mock.

use chrono::Utc;
use raahi_environment_models::WeatherReading;
use raahi_geo_models::Coordinate;

use crate::WeatherError;

/// Something that can report current conditions at a coordinate.
#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Fetches the current reading for `at`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] if no reading could be produced.
    async fn current(&self, at: Coordinate) -> Result<WeatherReading, WeatherError>;
}

/// Offline source that always answers with a fixed reading.
///
/// Without an explicit reading it serves
/// [`WeatherReading::fallback`] stamped with the request time.
#[derive(Debug, Clone, Default)]
pub struct MockWeatherSource {
    reading: Option<WeatherReading>,
}

impl MockWeatherSource {
    #[must_use]
    pub const fn new() -> Self {
        Self { reading: None }
    }

    #[must_use]
    pub const fn with_reading(reading: WeatherReading) -> Self {
        Self {
            reading: Some(reading),
        }
    }
}

#[async_trait::async_trait]
impl WeatherSource for MockWeatherSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn current(&self, _at: Coordinate) -> Result<WeatherReading, WeatherError> {
        Ok(self
            .reading
            .clone()
            .unwrap_or_else(|| WeatherReading::fallback(Utc::now())))
    }
}
