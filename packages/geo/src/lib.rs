#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory geographic catalog for Raahi.
//!
//! Loads the embedded green space, hazard zone, and POI definitions once
//! at startup and answers proximity queries ("which parks are within 1 km
//! of this point?") using great-circle distances. Also exposes the coarse
//! AQI regions and the city list.

pub mod catalog;
pub mod regions;
pub mod registry;

pub use catalog::GeoCatalog;
pub use regions::RegionMap;

use geo::{Distance, Haversine, Point};
use raahi_geo_models::{Coordinate, GeoCategory};
use thiserror::Error;

/// Errors from catalog construction and queries.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The catalog holds no entries matching the requested category.
    #[error("No catalog entries for category {}", category_label(*category))]
    NotFound {
        /// The category filter that matched nothing (`None` = unfiltered).
        category: Option<GeoCategory>,
    },

    /// A query or entry had an invalid coordinate or radius.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Description of what was wrong.
        message: String,
    },

    /// Two catalog entries share the same identifier.
    #[error("Duplicate catalog entry id: {id}")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },
}

fn category_label(category: Option<GeoCategory>) -> String {
    category.map_or_else(|| "any".to_string(), |c| c.to_string())
}

/// Great-circle distance between two coordinates in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let from = Point::new(a.longitude, a.latitude);
    let to = Point::new(b.longitude, b.latitude);
    Haversine.distance(from, to) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        let p = Coordinate::new(23.2599, 77.4126);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let a = Coordinate::new(23.0, 77.0);
        let b = Coordinate::new(24.0, 77.0);
        let d = haversine_km(a, b);
        assert!((d - 111.19).abs() < 0.1, "unexpected distance {d}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = Coordinate::new(23.2500, 77.4000);
        let b = Coordinate::new(23.2300, 77.4100);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }
}
