//! Compile-time registry of catalog data.
//!
//! Each catalog file lives under `catalog/` and is embedded via
//! `include_str!`. Adding a new set of places means creating a TOML file
//! with `[[entries]]` tables and adding it to [`ENTRY_TOMLS`].

use raahi_geo_models::{City, GeoEntry, Region};
use serde::Deserialize;

/// Number of embedded catalog entries across all files. Enforced by a test.
#[cfg(test)]
const EXPECTED_ENTRY_COUNT: usize = 13;

const ENTRY_TOMLS: &[(&str, &str)] = &[
    ("green_spaces", include_str!("../catalog/green_spaces.toml")),
    ("hazard_zones", include_str!("../catalog/hazard_zones.toml")),
    ("pois", include_str!("../catalog/pois.toml")),
];

const REGIONS_TOML: &str = include_str!("../catalog/regions.toml");

const CITIES_TOML: &str = include_str!("../catalog/cities.toml");

#[derive(Deserialize)]
struct EntryFile {
    entries: Vec<GeoEntry>,
}

/// Raw contents of `regions.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionFile {
    /// Region key assigned to points outside every box.
    pub fallback_id: String,
    /// Display name of the fallback region.
    pub fallback_name: String,
    /// Named boxes, in match-priority order.
    pub regions: Vec<Region>,
}

#[derive(Deserialize)]
struct CityFile {
    cities: Vec<City>,
}

/// Returns every embedded catalog entry (green spaces, hazard zones, POIs).
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. These are compile-time
/// constants, so a parse failure is a development error caught by tests.
#[must_use]
pub fn all_entries() -> Vec<GeoEntry> {
    ENTRY_TOMLS
        .iter()
        .flat_map(|(name, toml_str)| {
            let file: EntryFile = toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse catalog file '{name}': {e}"));
            file.entries
        })
        .collect()
}

/// Returns the embedded region definitions.
///
/// # Panics
///
/// Panics if the embedded `regions.toml` fails to parse.
#[must_use]
pub fn region_file() -> RegionFile {
    toml::de::from_str(REGIONS_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded regions: {e}"))
}

/// Returns all embedded cities.
///
/// # Panics
///
/// Panics if the embedded `cities.toml` fails to parse.
#[must_use]
pub fn all_cities() -> Vec<City> {
    let file: CityFile = toml::de::from_str(CITIES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse embedded cities: {e}"));
    file.cities
}

/// Looks up a city by id, case-insensitively.
#[must_use]
pub fn find_city(id: &str) -> Option<City> {
    all_cities()
        .into_iter()
        .find(|c| c.id.eq_ignore_ascii_case(id.trim()))
}
