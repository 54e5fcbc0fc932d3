//! Coarse named regions used to key regional AQI readings.

use raahi_geo_models::Region;

use crate::{GeoError, registry};

/// Ordered list of named boxes plus a catch-all fallback region.
#[derive(Debug, Clone)]
pub struct RegionMap {
    regions: Vec<Region>,
    fallback_id: String,
    fallback_name: String,
}

impl RegionMap {
    /// # Errors
    ///
    /// Returns [`GeoError::DuplicateId`] if two regions (or a region and
    /// the fallback) share an id.
    pub fn new(
        regions: Vec<Region>,
        fallback_id: impl Into<String>,
        fallback_name: impl Into<String>,
    ) -> Result<Self, GeoError> {
        let fallback_id = fallback_id.into();
        let mut ids: Vec<&str> = regions.iter().map(|r| r.id.as_str()).collect();
        ids.push(&fallback_id);
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(GeoError::DuplicateId {
                id: pair[0].to_string(),
            });
        }

        Ok(Self {
            regions,
            fallback_id,
            fallback_name: fallback_name.into(),
        })
    }

    /// Loads the regions embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded region ids collide.
    pub fn builtin() -> Result<Self, GeoError> {
        let file = registry::region_file();
        log::info!("Loaded {} AQI regions", file.regions.len());
        Self::new(file.regions, file.fallback_id, file.fallback_name)
    }

    /// Returns the id of the first region containing the point, or the
    /// fallback id.
    #[must_use]
    pub fn region_for(&self, latitude: f64, longitude: f64) -> &str {
        self.regions
            .iter()
            .find(|r| r.contains(latitude, longitude))
            .map_or(self.fallback_id.as_str(), |r| r.id.as_str())
    }

    /// Display name for a region id, if known.
    #[must_use]
    pub fn name_of(&self, id: &str) -> Option<&str> {
        if id == self.fallback_id {
            return Some(&self.fallback_name);
        }
        self.regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.as_str())
    }

    /// Returns `true` if `id` is a named region or the fallback.
    #[must_use]
    pub fn is_known(&self, id: &str) -> bool {
        self.name_of(id).is_some()
    }

    #[must_use]
    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    /// Every known region id, fallback last.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.regions
            .iter()
            .map(|r| r.id.as_str())
            .chain(std::iter::once(self.fallback_id.as_str()))
    }
}
