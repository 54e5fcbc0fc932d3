#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Position sample and sliding-window configuration types.

use chrono::{DateTime, TimeDelta, Utc};
use raahi_geo_models::Coordinate;
use serde::{Deserialize, Serialize};

/// A single timestamped user position pushed from the presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Opaque user identifier. Crowding counts distinct values of this.
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// When the position was observed (not when it was received).
    pub timestamp: DateTime<Utc>,
    /// AQI reading attached to the event by the client, if any.
    #[serde(default)]
    pub aqi: Option<f64>,
}

impl PositionSample {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            latitude,
            longitude,
            timestamp,
            aqi: None,
        }
    }

    /// Attaches a per-sample AQI reading.
    #[must_use]
    pub fn with_aqi(mut self, aqi: f64) -> Self {
        self.aqi = Some(aqi);
        self
    }

    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Tunables for the sliding window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Samples older than this many seconds relative to "now" are evicted.
    pub window_seconds: u64,
    /// How far into the future a sample timestamp may be before it is
    /// rejected.
    pub clock_skew_tolerance_seconds: u64,
    /// H3 resolution of the spatial cells. Resolution 8 cells have an
    /// edge of roughly 500 m.
    pub cell_resolution: u8,
    /// Hard cap on retained samples; the oldest are dropped first.
    pub max_samples: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_seconds: 300,
            clock_skew_tolerance_seconds: 30,
            cell_resolution: 8,
            max_samples: 10_000,
        }
    }
}

impl WindowConfig {
    #[must_use]
    pub fn window_duration(&self) -> TimeDelta {
        seconds(self.window_seconds)
    }

    #[must_use]
    pub fn clock_skew_tolerance(&self) -> TimeDelta {
        seconds(self.clock_skew_tolerance_seconds)
    }

    /// Window length in whole minutes, for human-readable messages.
    #[must_use]
    pub const fn window_minutes(&self) -> u64 {
        self.window_seconds / 60
    }
}

fn seconds(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
