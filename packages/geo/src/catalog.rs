//! Proximity queries over the static catalog.

use std::collections::BTreeSet;

use raahi_geo_models::{Coordinate, GeoCategory, GeoEntry, NearbyEntry};

use crate::{GeoError, haversine_km, registry};

/// Radius used when looking for emergency safe zones.
pub const SAFE_ZONE_RADIUS_KM: f64 = 3.0;

/// Immutable registry of named places.
///
/// Constructed once at startup and shared by reference with every
/// consumer. Entries are kept sorted by id so that query output is
/// deterministic.
#[derive(Debug, Clone)]
pub struct GeoCatalog {
    entries: Vec<GeoEntry>,
}

impl GeoCatalog {
    /// Builds a catalog from a list of entries.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::DuplicateId`] if two entries share an id, or
    /// [`GeoError::InvalidQuery`] if an entry has an out-of-range
    /// coordinate or a negative radius.
    pub fn new(mut entries: Vec<GeoEntry>) -> Result<Self, GeoError> {
        let mut seen = BTreeSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(GeoError::DuplicateId {
                    id: entry.id.clone(),
                });
            }
            if !entry.coordinate().is_valid() {
                return Err(GeoError::InvalidQuery {
                    message: format!("entry {} has an invalid coordinate", entry.id),
                });
            }
            if !entry.radius_meters.is_finite() || entry.radius_meters < 0.0 {
                return Err(GeoError::InvalidQuery {
                    message: format!("entry {} has an invalid radius", entry.id),
                });
            }
        }

        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { entries })
    }

    /// Loads the catalog embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded data violates catalog invariants.
    pub fn builtin() -> Result<Self, GeoError> {
        let catalog = Self::new(registry::all_entries())?;
        log::info!("Loaded {} catalog entries", catalog.entries.len());
        Ok(catalog)
    }

    #[must_use]
    pub fn entries(&self) -> &[GeoEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GeoEntry> {
        self.entries
            .binary_search_by(|e| e.id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns entries within `radius_km` of the point, nearest first.
    ///
    /// Ties in distance are broken by entry id ascending. An empty result
    /// is not an error: [`GeoError::NotFound`] is only returned when the
    /// catalog has no entries at all for the requested category.
    ///
    /// # Errors
    ///
    /// * [`GeoError::InvalidQuery`] if the point or radius is invalid.
    /// * [`GeoError::NotFound`] if no entry matches `category` anywhere.
    pub fn entries_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        category: Option<GeoCategory>,
    ) -> Result<Vec<NearbyEntry>, GeoError> {
        let at = Coordinate::new(latitude, longitude);
        if !at.is_valid() {
            return Err(GeoError::InvalidQuery {
                message: format!("coordinate {latitude},{longitude} is out of range"),
            });
        }
        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(GeoError::InvalidQuery {
                message: format!("radius {radius_km} km must be a non-negative number"),
            });
        }

        let mut candidates = self
            .entries
            .iter()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .peekable();

        if candidates.peek().is_none() {
            return Err(GeoError::NotFound { category });
        }

        let mut nearby: Vec<NearbyEntry> = candidates
            .filter_map(|entry| {
                let distance_km = haversine_km(at, entry.coordinate());
                (distance_km <= radius_km).then(|| NearbyEntry {
                    entry: entry.clone(),
                    distance_km,
                })
            })
            .collect();

        nearby.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });

        Ok(nearby)
    }

    /// Green spaces within `radius_km`, nearest first.
    ///
    /// A catalog without any green spaces yields an empty list here; the
    /// callers of this helper treat "none configured" and "none nearby"
    /// the same way.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidQuery`] if the point or radius is
    /// invalid.
    pub fn green_spaces_near(
        &self,
        at: Coordinate,
        radius_km: f64,
    ) -> Result<Vec<NearbyEntry>, GeoError> {
        match self.entries_near(
            at.latitude,
            at.longitude,
            radius_km,
            Some(GeoCategory::GreenSpace),
        ) {
            Err(GeoError::NotFound { .. }) => Ok(Vec::new()),
            other => other,
        }
    }

    /// The nearest entry of a category regardless of distance.
    ///
    /// # Errors
    ///
    /// Same as [`Self::entries_near`].
    pub fn nearest(
        &self,
        at: Coordinate,
        category: Option<GeoCategory>,
    ) -> Result<Option<NearbyEntry>, GeoError> {
        let all = self.entries_near(at.latitude, at.longitude, f64::MAX, category)?;
        Ok(all.into_iter().next())
    }

    /// Green spaces usable as emergency safe zones: at most `limit` within
    /// [`SAFE_ZONE_RADIUS_KM`], nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidQuery`] if the point is invalid.
    pub fn safe_zones_near(
        &self,
        at: Coordinate,
        limit: usize,
    ) -> Result<Vec<NearbyEntry>, GeoError> {
        let mut zones = self.green_spaces_near(at, SAFE_ZONE_RADIUS_KM)?;
        zones.truncate(limit);
        Ok(zones)
    }
}
