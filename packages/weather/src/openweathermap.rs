//! OpenWeatherMap client.
//!
//! Combines the `/weather` (current conditions, metric units) and
//! `/air_pollution` endpoints into a single [`WeatherReading`].
//!
//! See <https://openweathermap.org/current> and
//! <https://openweathermap.org/api/air-pollution>.

use std::time::Duration;

use chrono::Utc;
use raahi_environment::{WeatherError, WeatherSource};
use raahi_environment_models::WeatherReading;
use raahi_geo_models::Coordinate;

use crate::{WeatherConfig, retry};

/// OWM air-quality levels 1-5 mapped onto the 0-500 AQI scale.
const AQI_LEVELS: [(f64, &str); 5] = [
    (50.0, "Good"),
    (100.0, "Moderate"),
    (150.0, "Unhealthy for Sensitive Groups"),
    (200.0, "Unhealthy"),
    (300.0, "Very Unhealthy"),
];

/// Used when a response omits visibility.
const DEFAULT_VISIBILITY_KM: f64 = 10.0;

/// Live [`WeatherSource`] backed by OpenWeatherMap.
pub struct OpenWeatherMapSource {
    client: reqwest::Client,
    api_key: String,
    config: WeatherConfig,
}

impl std::fmt::Debug for OpenWeatherMapSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapSource")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherMapSource {
    /// # Errors
    ///
    /// Returns [`WeatherError::Unavailable`] if the HTTP client cannot be
    /// built.
    pub fn new(api_key: String, config: WeatherConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| WeatherError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    async fn get(
        &self,
        endpoint: &str,
        at: Coordinate,
        metric: bool,
    ) -> Result<serde_json::Value, WeatherError> {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();

        retry::send_json(
            || {
                let mut params = vec![
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                ];
                if metric {
                    params.push(("units", "metric"));
                }
                self.client.get(url.as_str()).query(&params)
            },
            self.config.max_retries,
            Duration::from_millis(self.config.retry_base_delay_ms),
        )
        .await
    }
}

#[async_trait::async_trait]
impl WeatherSource for OpenWeatherMapSource {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    async fn current(&self, at: Coordinate) -> Result<WeatherReading, WeatherError> {
        let (weather, air) = tokio::try_join!(
            self.get("weather", at, true),
            self.get("air_pollution", at, false),
        )?;

        let conditions = parse_weather(&weather)?;
        let (aqi, aqi_label) = parse_air_quality(&air)?;

        log::debug!(
            "OpenWeatherMap {at}: {:.1}C, AQI {aqi} ({aqi_label})",
            conditions.temperature_c
        );

        Ok(WeatherReading {
            temperature_c: conditions.temperature_c,
            humidity: conditions.humidity,
            wind_speed_kmh: conditions.wind_speed_kmh,
            visibility_km: conditions.visibility_km,
            aqi,
            aqi_label: aqi_label.to_string(),
            description: conditions.description,
            location: conditions.location,
            timestamp: Utc::now(),
        })
    }
}

#[derive(Debug)]
struct Conditions {
    temperature_c: f64,
    humidity: f64,
    wind_speed_kmh: f64,
    visibility_km: f64,
    description: String,
    location: String,
}

/// Parses a `/weather` response requested with `units=metric`.
fn parse_weather(body: &serde_json::Value) -> Result<Conditions, WeatherError> {
    let temperature_c = body["main"]["temp"]
        .as_f64()
        .ok_or_else(|| WeatherError::Malformed {
            message: "Missing main.temp in weather response".to_string(),
        })?;

    let humidity = body["main"]["humidity"].as_f64().unwrap_or(0.0);
    // m/s -> km/h, one decimal
    let wind_speed_kmh = (body["wind"]["speed"].as_f64().unwrap_or(0.0) * 36.0).round() / 10.0;
    let visibility_km = body["visibility"]
        .as_f64()
        .map_or(DEFAULT_VISIBILITY_KM, |m| m / 1000.0);
    let description = body["weather"][0]["description"]
        .as_str()
        .map(title_case)
        .unwrap_or_default();
    let location = body["name"].as_str().unwrap_or_default().to_string();

    Ok(Conditions {
        temperature_c,
        humidity,
        wind_speed_kmh,
        visibility_km,
        description,
        location,
    })
}

/// Parses an `/air_pollution` response. Unknown levels are treated as
/// level 1.
fn parse_air_quality(body: &serde_json::Value) -> Result<(f64, &'static str), WeatherError> {
    let level = body["list"][0]["main"]["aqi"]
        .as_u64()
        .ok_or_else(|| WeatherError::Malformed {
            message: "Missing list[0].main.aqi in air pollution response".to_string(),
        })?;

    let index = usize::try_from(level)
        .ok()
        .and_then(|l| l.checked_sub(1))
        .filter(|i| *i < AQI_LEVELS.len())
        .unwrap_or(0);

    Ok(AQI_LEVELS[index])
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
