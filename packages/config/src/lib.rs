#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Runtime configuration for Raahi.
//!
//! All tunables live in one TOML file with a table per component:
//!
//! ```toml
//! [window]
//! window_seconds = 600
//!
//! [hotspot]
//! crowd_threshold = 8
//!
//! [eco.modes.car]
//! emission_g_per_km = 150.0
//!
//! [environment.weights]
//! aqi = 0.6
//! temperature = 0.15
//! visibility = 0.15
//! wind = 0.1
//!
//! [weather]
//! timeout_secs = 10
//! ```
//!
//! Any omitted table or key keeps its default.

use std::path::{Path, PathBuf};

use raahi_eco_models::EcoConfig;
use raahi_environment_models::EnvironmentConfig;
use raahi_hotspot_models::HotspotConfig;
use raahi_ingest_models::WindowConfig;
use raahi_weather_models::WeatherConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "RAAHI_CONFIG";

/// Errors from loading or rendering configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("Invalid config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize config: {message}")]
    Serialize { message: String },
}

/// Every tunable of the alerting core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaahiConfig {
    pub window: WindowConfig,
    pub hotspot: HotspotConfig,
    pub eco: EcoConfig,
    pub environment: EnvironmentConfig,
    pub weather: WeatherConfig,
}

impl RaahiConfig {
    /// Parses a TOML document. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is invalid.
    pub fn from_toml_str(toml_str: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::de::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads configuration from `path`, or from [`CONFIG_ENV`] when `path`
    /// is `None`. With neither, or when the file does not exist, the
    /// defaults are returned.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::Io`] if the file exists but cannot be read.
    /// * [`ConfigError::Parse`] if it is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let Some(path) = path else {
            log::debug!("No config file given; using defaults");
            return Ok(Self::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let config = Self::from_toml_str(&contents, &path)?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file {} not found; using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if rendering fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> &'static Path {
        Path::new("test.toml")
    }

    #[test]
    fn empty_document_is_default() {
        let config = RaahiConfig::from_toml_str("", origin()).unwrap();
        assert_eq!(config, RaahiConfig::default());
    }

    #[test]
    fn partial_tables_override_only_given_keys() {
        let config = RaahiConfig::from_toml_str(
            r#"
            [window]
            window_seconds = 600

            [hotspot]
            aqi_alert_threshold = 120.0

            [eco.modes.car]
            emission_g_per_km = 150.0

            [weather]
            base_url = "http://localhost:8080"
            "#,
            origin(),
        )
        .unwrap();

        assert_eq!(config.window.window_seconds, 600);
        assert_eq!(
            config.window.max_samples,
            WindowConfig::default().max_samples
        );
        assert!((config.hotspot.aqi_alert_threshold - 120.0).abs() < f64::EPSILON);
        assert_eq!(config.hotspot.crowd_threshold, 5);
        assert!((config.eco.modes["car"].emission_g_per_km - 150.0).abs() < f64::EPSILON);
        assert_eq!(config.weather.base_url, "http://localhost:8080");
        assert_eq!(config.weather.timeout_secs, 5);
    }

    #[test]
    fn overriding_one_mode_keeps_the_rest() {
        let config = RaahiConfig::from_toml_str(
            r"
            [eco.modes.bus]
            emission_g_per_km = 40.0
            ",
            origin(),
        )
        .unwrap();
        assert!((config.eco.modes["bus"].emission_g_per_km - 40.0).abs() < f64::EPSILON);
        assert!(config.eco.modes.contains_key("car"));
    }

    #[test]
    fn mode_alias_key_lands_on_canonical_mode() {
        let config = RaahiConfig::from_toml_str(
            r"
            [eco.modes.bicycle]
            emission_g_per_km = 10.0
            ",
            origin(),
        )
        .unwrap();
        assert!((config.eco.modes["cycle"].emission_g_per_km - 10.0).abs() < f64::EPSILON);
        assert!(!config.eco.modes.contains_key("bicycle"));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = RaahiConfig::from_toml_str("[window]\nwindow_seconds = \"soon\"", origin())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("test.toml"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            RaahiConfig::load(Some(Path::new("/nonexistent/raahi/config.toml"))).unwrap();
        assert_eq!(config, RaahiConfig::default());
    }

    #[test]
    fn rendered_defaults_parse_back() {
        let rendered = RaahiConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("[window]"));
        let parsed = RaahiConfig::from_toml_str(&rendered, origin()).unwrap();
        assert_eq!(parsed, RaahiConfig::default());
    }
}
