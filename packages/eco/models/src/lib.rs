#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Green-routing types: transport modes, route requests, and eco-score
//! results.

use std::collections::BTreeMap;
use std::str::FromStr;

use raahi_geo_models::{Coordinate, NearbyEntry};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a route is travelled.
///
/// Declaration order runs from greenest to least green and is used to
/// break ties between modes with equal emission factors.
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TransportMode {
    #[strum(to_string = "walk", serialize = "walking")]
    #[serde(alias = "walking")]
    Walk,
    #[strum(to_string = "cycle", serialize = "bicycle")]
    #[serde(alias = "bicycle")]
    Cycle,
    /// Buses and other public transport.
    #[strum(to_string = "bus", serialize = "public_transport")]
    #[serde(alias = "public_transport")]
    Bus,
    /// Electric car.
    #[strum(to_string = "ev", serialize = "electric_vehicle")]
    #[serde(alias = "electric_vehicle")]
    Ev,
    Motorcycle,
    Car,
}

impl TransportMode {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Walk,
            Self::Cycle,
            Self::Bus,
            Self::Ev,
            Self::Motorcycle,
            Self::Car,
        ]
    }
}

/// Emission and viability data for one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    /// Grams of CO2 emitted per kilometre travelled.
    pub emission_g_per_km: f64,
    /// Longest trip for which the mode is a reasonable recommendation.
    /// `None` means any distance.
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

/// A route to score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    /// Route length in kilometres. Must be positive.
    pub distance_km: f64,
    pub mode: TransportMode,
    /// Optional route polyline (as returned by the routing service). When
    /// present, it is sampled for green-space proximity in addition to
    /// origin, midpoint, and destination.
    #[serde(default)]
    pub path: Vec<Coordinate>,
}

impl RouteRequest {
    #[must_use]
    pub const fn new(
        origin: Coordinate,
        destination: Coordinate,
        distance_km: f64,
        mode: TransportMode,
    ) -> Self {
        Self {
            origin,
            destination,
            distance_km,
            mode,
            path: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: Vec<Coordinate>) -> Self {
        self.path = path;
        self
    }
}

/// Environmental assessment of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcoScoreResult {
    /// 0-100; higher is greener.
    pub eco_score: f64,
    /// The mode the route was scored for.
    pub mode: TransportMode,
    /// Estimated CO2 for the requested mode.
    pub carbon_kg: f64,
    /// Estimated CO2 if the trip were made by public transport.
    pub carbon_public_transport_kg: f64,
    /// CO2 avoided compared with driving a car. Negative when the requested
    /// mode emits more than a car.
    pub carbon_saved_kg: f64,
    /// Green spaces near the route, nearest first.
    pub nearby_green_spaces: Vec<NearbyEntry>,
    /// Points added for passing green spaces.
    pub green_bonus: f64,
    /// Greenest viable mode for this distance.
    pub recommended_mode: TransportMode,
}

/// Tunables for route scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcoConfig {
    /// Emission and viability data keyed by canonical mode name (`car`,
    /// `bus`, ...). Deserialized entries may use any mode alias; they are
    /// stored under the canonical name and laid over the defaults, so a
    /// config only needs to name the modes it changes.
    #[serde(deserialize_with = "overlay_default_modes")]
    pub modes: BTreeMap<String, ModeProfile>,
    /// Score points deducted per kilogram of CO2.
    pub penalty_per_kg: f64,
    /// Upper bound on the carbon deduction.
    pub max_carbon_penalty: f64,
    /// Trips shorter than this get [`Self::short_trip_bonus`].
    pub short_trip_km: f64,
    pub short_trip_bonus: f64,
    /// Trips shorter than this (but not short) get
    /// [`Self::medium_trip_bonus`].
    pub medium_trip_km: f64,
    pub medium_trip_bonus: f64,
    /// Green spaces within this distance of a sampled route point count
    /// towards the bonus.
    pub green_radius_km: f64,
    pub bonus_per_green_space: f64,
    /// Ceiling on the total green-space bonus.
    pub max_green_bonus: f64,
    /// The route polyline is sampled every `len / path_sample_divisor`
    /// points.
    pub path_sample_divisor: usize,
}

fn default_modes() -> BTreeMap<String, ModeProfile> {
    let profile = |emission_g_per_km: f64, max_distance_km: Option<f64>| ModeProfile {
        emission_g_per_km,
        max_distance_km,
    };

    [
        (TransportMode::Car, profile(120.0, None)),
        (TransportMode::Motorcycle, profile(60.0, None)),
        (TransportMode::Bus, profile(50.0, None)),
        (TransportMode::Ev, profile(20.0, None)),
        (TransportMode::Cycle, profile(0.0, Some(8.0))),
        (TransportMode::Walk, profile(0.0, Some(2.0))),
    ]
    .into_iter()
    .map(|(mode, p)| (mode.to_string(), p))
    .collect()
}

fn overlay_default_modes<'de, D>(deserializer: D) -> Result<BTreeMap<String, ModeProfile>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, ModeProfile>::deserialize(deserializer)?;
    let mut modes = default_modes();
    let mut seen: BTreeMap<TransportMode, String> = BTreeMap::new();

    for (name, profile) in overrides {
        let mode = TransportMode::from_str(name.trim())
            .map_err(|_| D::Error::custom(format!("unknown transport mode '{name}'")))?;
        if let Some(previous) = seen.insert(mode, name.clone()) {
            return Err(D::Error::custom(format!(
                "transport mode {mode} is configured twice, as '{previous}' and '{name}'"
            )));
        }
        modes.insert(mode.to_string(), profile);
    }

    Ok(modes)
}

impl EcoConfig {
    /// Sets the profile for `mode` under its canonical name.
    pub fn set_mode(&mut self, mode: TransportMode, profile: ModeProfile) {
        self.modes.insert(mode.to_string(), profile);
    }
}

impl Default for EcoConfig {
    fn default() -> Self {
        Self {
            modes: default_modes(),
            penalty_per_kg: 100.0,
            max_carbon_penalty: 50.0,
            short_trip_km: 5.0,
            short_trip_bonus: 10.0,
            medium_trip_km: 10.0,
            medium_trip_bonus: 5.0,
            green_radius_km: 1.0,
            bonus_per_green_space: 5.0,
            max_green_bonus: 20.0,
            path_sample_divisor: 10,
        }
    }
}
