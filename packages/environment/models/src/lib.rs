#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weather and air quality readings, and the environmental scores and
//! advisories derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Current conditions at a location, as reported by a weather source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Air temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub wind_speed_kmh: f64,
    pub visibility_km: f64,
    /// Air quality index on the 0-500 scale.
    pub aqi: f64,
    /// Category name for the AQI ("Good", "Moderate", ...).
    pub aqi_label: String,
    /// Short free-text sky description ("Partly Cloudy", "Light Rain").
    pub description: String,
    /// Place the reading refers to.
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

impl WeatherReading {
    /// The neutral reading used whenever live data is unavailable.
    #[must_use]
    pub fn fallback(timestamp: DateTime<Utc>) -> Self {
        Self {
            temperature_c: 28.0,
            humidity: 65.0,
            wind_speed_kmh: 12.0,
            visibility_km: 10.0,
            aqi: 85.0,
            aqi_label: "Moderate".to_string(),
            description: "Partly Cloudy".to_string(),
            location: "Bhopal".to_string(),
            timestamp,
        }
    }

    #[must_use]
    pub fn is_rainy(&self) -> bool {
        self.description.to_lowercase().contains("rain")
    }
}

/// Qualitative band for an environmental score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoreLevel {
    Poor,
    Moderate,
    Good,
    Excellent,
}

impl ScoreLevel {
    /// `excellent` at 80+, `good` at 60+, `moderate` at 40+, else `poor`.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Moderate,
            _ => Self::Poor,
        }
    }
}

/// Normalised 0-100 sub-scores that make up an [`EnvironmentalScore`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub aqi: f64,
    pub temperature: f64,
    pub visibility: f64,
    pub wind: f64,
}

/// City-level environmental rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalScore {
    /// 0-100; higher means better conditions.
    pub score: u8,
    pub level: ScoreLevel,
    pub components: ScoreComponents,
}

/// Whether an advisory warns about conditions or suggests a green choice.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdvisoryKind {
    Alert,
    Recommendation,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdvisorySeverity {
    Low,
    Medium,
    High,
}

/// A user-facing note derived from a [`WeatherReading`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub severity: AdvisorySeverity,
    pub title: String,
    pub message: String,
}

/// Relative importance of each sub-score. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub aqi: f64,
    pub temperature: f64,
    pub visibility: f64,
    pub wind: f64,
}

impl ScoreWeights {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.aqi + self.temperature + self.visibility + self.wind
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            aqi: 0.55,
            temperature: 0.2,
            visibility: 0.15,
            wind: 0.1,
        }
    }
}

/// Tunables for environmental scoring and advisories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub weights: ScoreWeights,
    /// AQI at or above which the air sub-score is 0.
    pub aqi_ceiling: f64,
    /// Temperatures inside `[comfort_min_c, comfort_max_c]` score 100.
    pub comfort_min_c: f64,
    pub comfort_max_c: f64,
    /// Degrees outside the comfort band at which the temperature
    /// sub-score reaches 0.
    pub temperature_falloff_c: f64,
    /// Visibility at or above which the visibility sub-score is 100.
    pub clear_visibility_km: f64,
    /// Winds inside `[calm_wind_kmh, strong_wind_kmh]` score 100.
    pub calm_wind_kmh: f64,
    pub strong_wind_kmh: f64,
    /// Points lost by dead-still air.
    pub calm_wind_penalty: f64,
    /// km/h above `strong_wind_kmh` at which the wind sub-score reaches 0.
    pub wind_falloff_kmh: f64,
    /// Advisory thresholds.
    pub poor_air_aqi: f64,
    pub moderate_air_aqi: f64,
    pub good_air_aqi: f64,
    pub heat_alert_c: f64,
    pub strong_wind_alert_kmh: f64,
    pub low_visibility_km: f64,
    pub cycling_min_c: f64,
    pub cycling_max_c: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            aqi_ceiling: 500.0,
            comfort_min_c: 18.0,
            comfort_max_c: 30.0,
            temperature_falloff_c: 15.0,
            clear_visibility_km: 10.0,
            calm_wind_kmh: 5.0,
            strong_wind_kmh: 25.0,
            calm_wind_penalty: 30.0,
            wind_falloff_kmh: 25.0,
            poor_air_aqi: 150.0,
            moderate_air_aqi: 100.0,
            good_air_aqi: 100.0,
            heat_alert_c: 35.0,
            strong_wind_alert_kmh: 20.0,
            low_visibility_km: 5.0,
            cycling_min_c: 20.0,
            cycling_max_c: 30.0,
        }
    }
}
