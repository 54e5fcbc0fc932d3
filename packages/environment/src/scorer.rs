//! Weighted composite scoring of weather readings.

use chrono::{DateTime, Utc};
use raahi_environment_models::{
    Advisory, EnvironmentConfig, EnvironmentalScore, ScoreComponents, ScoreLevel, WeatherReading,
};
use raahi_geo_models::Coordinate;

use crate::{EnvironmentError, WeatherSource, advisories::advisories};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// A scored reading for one place.
#[derive(Debug, Clone, PartialEq)]
pub struct CityReport {
    pub reading: WeatherReading,
    pub score: EnvironmentalScore,
    pub advisories: Vec<Advisory>,
    /// Where the reading came from.
    pub source: ReadingSource,
}

/// Provenance of the reading in a [`CityReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingSource {
    /// Fetched from the named weather source.
    Live(&'static str),
    /// The source failed; the neutral fallback was scored instead.
    Fallback,
}

/// Scores weather readings against an [`EnvironmentConfig`].
#[derive(Debug, Clone)]
pub struct EnvironmentalScorer {
    config: EnvironmentConfig,
}

impl EnvironmentalScorer {
    /// # Errors
    ///
    /// Returns [`EnvironmentError::InvalidConfig`] if a weight is negative,
    /// the weights do not sum to 1.0, or a band is empty or inverted.
    pub fn new(config: EnvironmentConfig) -> Result<Self, EnvironmentError> {
        let w = &config.weights;
        if [w.aqi, w.temperature, w.visibility, w.wind]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(EnvironmentError::InvalidConfig {
                message: "weights must be non-negative numbers".to_string(),
            });
        }
        if (w.sum() - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(EnvironmentError::InvalidConfig {
                message: format!("weights must sum to 1.0, got {}", w.sum()),
            });
        }
        if config.comfort_min_c > config.comfort_max_c {
            return Err(EnvironmentError::InvalidConfig {
                message: format!(
                    "comfort band {}..{} C is inverted",
                    config.comfort_min_c, config.comfort_max_c
                ),
            });
        }
        if config.calm_wind_kmh > config.strong_wind_kmh {
            return Err(EnvironmentError::InvalidConfig {
                message: format!(
                    "wind band {}..{} km/h is inverted",
                    config.calm_wind_kmh, config.strong_wind_kmh
                ),
            });
        }
        for (name, value) in [
            ("aqi_ceiling", config.aqi_ceiling),
            ("temperature_falloff_c", config.temperature_falloff_c),
            ("clear_visibility_km", config.clear_visibility_km),
            ("wind_falloff_kmh", config.wind_falloff_kmh),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EnvironmentError::InvalidConfig {
                    message: format!("{name} must be positive, got {value}"),
                });
            }
        }

        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Scores a reading. Never fails: non-finite fields are replaced with
    /// the corresponding fallback value before scoring.
    #[must_use]
    pub fn score_city(&self, weather: &WeatherReading) -> EnvironmentalScore {
        let weather = sanitize(weather);
        let c = &self.config;

        let components = ScoreComponents {
            aqi: 100.0 * (1.0 - (weather.aqi / c.aqi_ceiling).clamp(0.0, 1.0)),
            temperature: self.temperature_score(weather.temperature_c),
            visibility: 100.0 * (weather.visibility_km / c.clear_visibility_km).clamp(0.0, 1.0),
            wind: self.wind_score(weather.wind_speed_kmh),
        };

        let composite = c.weights.aqi * components.aqi
            + c.weights.temperature * components.temperature
            + c.weights.visibility * components.visibility
            + c.weights.wind * components.wind;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let score = composite.round().clamp(0.0, 100.0) as u8;

        log::debug!(
            "Environmental score {score} (aqi {:.0}, temp {:.0}, vis {:.0}, wind {:.0})",
            components.aqi,
            components.temperature,
            components.visibility,
            components.wind,
        );

        EnvironmentalScore {
            score,
            level: ScoreLevel::from_score(score),
            components,
        }
    }

    /// Fetches a reading for `at` and scores it, substituting the fallback
    /// reading if the source fails.
    pub async fn score_from_source(
        &self,
        source: &dyn WeatherSource,
        at: Coordinate,
        now: DateTime<Utc>,
    ) -> CityReport {
        let (reading, provenance) = match source.current(at).await {
            Ok(reading) => (reading, ReadingSource::Live(source.name())),
            Err(e) => {
                log::warn!(
                    "Weather source '{}' failed for {at}: {e}; using fallback reading",
                    source.name()
                );
                (WeatherReading::fallback(now), ReadingSource::Fallback)
            }
        };

        let score = self.score_city(&reading);
        let advisories = advisories(&self.config, &reading);
        CityReport {
            reading,
            score,
            advisories,
            source: provenance,
        }
    }

    fn temperature_score(&self, temperature_c: f64) -> f64 {
        let c = &self.config;
        let outside = if temperature_c < c.comfort_min_c {
            c.comfort_min_c - temperature_c
        } else if temperature_c > c.comfort_max_c {
            temperature_c - c.comfort_max_c
        } else {
            0.0
        };
        100.0 * (1.0 - outside / c.temperature_falloff_c).clamp(0.0, 1.0)
    }

    fn wind_score(&self, wind_kmh: f64) -> f64 {
        let c = &self.config;
        if wind_kmh < c.calm_wind_kmh {
            let stillness = if c.calm_wind_kmh > 0.0 {
                (c.calm_wind_kmh - wind_kmh.max(0.0)) / c.calm_wind_kmh
            } else {
                0.0
            };
            100.0 - c.calm_wind_penalty * stillness
        } else if wind_kmh > c.strong_wind_kmh {
            100.0 * (1.0 - (wind_kmh - c.strong_wind_kmh) / c.wind_falloff_kmh).clamp(0.0, 1.0)
        } else {
            100.0
        }
    }
}

fn sanitize(weather: &WeatherReading) -> WeatherReading {
    let fallback = WeatherReading::fallback(weather.timestamp);
    let pick = |value: f64, default: f64, field: &str| {
        if value.is_finite() {
            value
        } else {
            log::warn!("Ignoring non-finite {field} in weather reading");
            default
        }
    };

    WeatherReading {
        temperature_c: pick(weather.temperature_c, fallback.temperature_c, "temperature"),
        humidity: pick(weather.humidity, fallback.humidity, "humidity"),
        wind_speed_kmh: pick(weather.wind_speed_kmh, fallback.wind_speed_kmh, "wind speed"),
        visibility_km: pick(weather.visibility_km, fallback.visibility_km, "visibility"),
        aqi: pick(weather.aqi, fallback.aqi, "aqi"),
        ..weather.clone()
    }
}
