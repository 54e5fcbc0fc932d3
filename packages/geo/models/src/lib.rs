#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Static geographic catalog types.
//!
//! These types describe the named places Raahi knows about (green spaces,
//! hazard zones, points of interest), the coarse regions used to key live
//! AQI readings, and the cities the environmental scorer can be asked
//! about. Everything here is immutable after load.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, `-90..=90`.
    pub latitude: f64,
    /// Longitude in degrees, `-180..=180`.
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are finite and inside the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Midpoint by simple averaging of the components.
    ///
    /// Good enough for the city-scale spans this catalog deals with; not
    /// meant for antimeridian-crossing segments.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new(
            (self.latitude + other.latitude) / 2.0,
            (self.longitude + other.longitude) / 2.0,
        )
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Error returned when a `"lat,lng"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCoordinateError {
    /// The input that failed to parse.
    pub input: String,
}

impl std::fmt::Display for ParseCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate '{}': expected \"LAT,LNG\" in valid degree ranges",
            self.input
        )
    }
}

impl std::error::Error for ParseCoordinateError {}

impl std::str::FromStr for Coordinate {
    type Err = ParseCoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCoordinateError {
            input: s.to_string(),
        };

        let (lat, lng) = s.split_once(',').ok_or_else(err)?;
        let latitude: f64 = lat.trim().parse().map_err(|_| err())?;
        let longitude: f64 = lng.trim().parse().map_err(|_| err())?;

        let coord = Self::new(latitude, longitude);
        if coord.is_valid() { Ok(coord) } else { Err(err()) }
    }
}

/// Broad classification of a catalog entry.
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
pub enum GeoCategory {
    /// Parks, lakes, and other eco-friendly areas. Used for routing
    /// bonuses and as emergency safe zones.
    GreenSpace,
    /// Areas to steer people away from (industrial belts, construction).
    HazardZone,
    /// Any other notable place.
    Poi,
}

impl GeoCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::GreenSpace, Self::HazardZone, Self::Poi]
    }
}

/// A named point of interest in the static catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEntry {
    /// Stable identifier (e.g. `"upper_lake"`).
    pub id: String,
    /// Human-readable name (e.g. "Upper Lake (Bada Talab)").
    pub name: String,
    pub category: GeoCategory,
    /// Finer-grained kind within the category (`lake`, `park`, `waterbody`,
    /// `green_area`, ...).
    #[serde(default)]
    pub kind: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Approximate extent of the place around its centre point.
    #[serde(default)]
    pub radius_meters: f64,
}

impl GeoEntry {
    /// Returns the centre of this entry as a [`Coordinate`].
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// A catalog entry paired with its distance from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntry {
    pub entry: GeoEntry,
    /// Great-circle distance from the query point in kilometres.
    pub distance_km: f64,
}

/// A named rectangular area used to key regional AQI readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Region key as it appears in `aqi_by_region` maps (e.g. `"upper_lake"`).
    pub id: String,
    /// Human-readable name (e.g. "Upper Lake").
    pub name: String,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl Region {
    /// Returns `true` if the point lies inside this region (bounds
    /// inclusive).
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

/// A city the environmental scorer can be asked about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Lowercase identifier (e.g. `"bhopal"`).
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}
