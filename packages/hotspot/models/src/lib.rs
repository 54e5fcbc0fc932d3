#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crowd and pollution hotspot types.
//!
//! A [`Hotspot`] is derived on every aggregation pass and never persisted.

use chrono::{DateTime, Utc};
use raahi_geo_models::Coordinate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Why a cell was flagged.
///
/// Variant order defines presentation priority: `Both > Polluted >
/// Crowded`.
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
pub enum Severity {
    /// Unique users in the window reached the crowd threshold.
    Crowded,
    /// Air quality for the cell exceeded the AQI alert threshold.
    Polluted,
    /// Both conditions at once.
    Both,
}

impl Severity {
    /// Combines the two conditions; `None` if neither holds.
    #[must_use]
    pub const fn from_flags(crowded: bool, polluted: bool) -> Option<Self> {
        match (crowded, polluted) {
            (true, true) => Some(Self::Both),
            (false, true) => Some(Self::Polluted),
            (true, false) => Some(Self::Crowded),
            (false, false) => None,
        }
    }

    #[must_use]
    pub const fn is_crowded(self) -> bool {
        matches!(self, Self::Crowded | Self::Both)
    }

    #[must_use]
    pub const fn is_polluted(self) -> bool {
        matches!(self, Self::Polluted | Self::Both)
    }

    /// Advice shown alongside the alert.
    #[must_use]
    pub const fn recommendation(self) -> &'static str {
        match self {
            Self::Both => "Avoid this area right now. Prefer green routes or public transport.",
            Self::Polluted => "Air quality is poor. Limit outdoor exposure, consider masks or PT.",
            Self::Crowded => "Area is crowded. Prefer alternate less crowded spots.",
        }
    }
}

/// Where to send people instead of a hotspot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Alternative {
    /// A catalogued green space outside any hotspot.
    GreenSpace {
        /// Catalog entry id.
        id: String,
        /// Catalog entry name.
        name: String,
        /// Centre of the green space.
        location: Coordinate,
        /// Distance from the hotspot centre in kilometres.
        distance_km: f64,
        /// Distinct users currently in the green space's cell.
        unique_users: usize,
    },
    /// A nearby cell that is neither crowded nor polluted.
    QuietCell {
        /// Cell identifier.
        cell_key: String,
        /// Centre of the cell.
        location: Coordinate,
        /// Distance from the hotspot centre in kilometres.
        distance_km: f64,
        /// Distinct users currently in that cell.
        unique_users: usize,
    },
}

impl Alternative {
    #[must_use]
    pub const fn distance_km(&self) -> f64 {
        match self {
            Self::GreenSpace { distance_km, .. } | Self::QuietCell { distance_km, .. } => {
                *distance_km
            }
        }
    }

    #[must_use]
    pub const fn unique_users(&self) -> usize {
        match self {
            Self::GreenSpace { unique_users, .. } | Self::QuietCell { unique_users, .. } => {
                *unique_users
            }
        }
    }
}

/// A flagged spatial cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// Spatial cell identifier.
    pub cell_key: String,
    /// AQI region the cell centre falls into.
    pub region_id: String,
    /// Centre of the cell.
    pub representative_location: Coordinate,
    /// Retained samples in the cell.
    pub sample_count: usize,
    /// Distinct users among those samples.
    pub unique_users: usize,
    /// Worst AQI known for the cell (regional or per-sample), if any.
    pub aqi_at_location: Option<f64>,
    pub severity: Severity,
    /// Human-readable description of the conditions.
    pub message: String,
    pub recommendation: String,
    pub recommended_alternative: Option<Alternative>,
    /// The `now` of the pass that produced this hotspot.
    pub generated_at: DateTime<Utc>,
}

/// Thresholds for hotspot detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    /// Minimum distinct users in a cell for it to count as crowded.
    pub crowd_threshold: usize,
    /// A cell is polluted when its AQI is strictly above this value.
    pub aqi_alert_threshold: f64,
    /// How far to look for green-space alternatives.
    pub alternative_search_radius_km: f64,
    /// How many H3 rings around a hotspot to consider for quiet-cell
    /// alternatives.
    pub alternative_ring_size: u32,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            crowd_threshold: 5,
            aqi_alert_threshold: 150.0,
            alternative_search_radius_km: 3.0,
            alternative_ring_size: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_puts_both_first() {
        let mut severities = vec![Severity::Crowded, Severity::Both, Severity::Polluted];
        severities.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            severities,
            vec![Severity::Both, Severity::Polluted, Severity::Crowded]
        );
    }

    #[test]
    fn severity_from_flags() {
        assert_eq!(Severity::from_flags(true, true), Some(Severity::Both));
        assert_eq!(Severity::from_flags(true, false), Some(Severity::Crowded));
        assert_eq!(Severity::from_flags(false, true), Some(Severity::Polluted));
        assert_eq!(Severity::from_flags(false, false), None);
        assert!(Severity::Both.is_crowded() && Severity::Both.is_polluted());
    }

    #[test]
    fn alternative_is_tagged_on_the_wire() {
        let alt = Alternative::QuietCell {
            cell_key: "88608b0a1bfffff".to_string(),
            location: Coordinate::new(23.25, 77.40),
            distance_km: 0.9,
            unique_users: 0,
        };
        let json = serde_json::to_value(&alt).unwrap();
        assert_eq!(json["type"], "quiet_cell");
    }
}
