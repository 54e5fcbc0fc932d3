//! Spatial cell keys.
//!
//! Samples are bucketed into H3 hexagons at a configurable resolution.
//! Hexagons give every cell the same six equidistant neighbours, which
//! keeps "nearby low-density cell" lookups uniform.

use h3o::{CellIndex, LatLng, Resolution};
use raahi_geo_models::Coordinate;

use crate::IngestError;

/// Opaque identifier of a spatial cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey(CellIndex);

impl CellKey {
    /// Centre of the cell.
    #[must_use]
    pub fn center(self) -> Coordinate {
        let center = LatLng::from(self.0);
        Coordinate::new(center.lat(), center.lng())
    }

    /// Every cell within `k` rings of this one, excluding itself.
    #[must_use]
    pub fn neighbors(self, k: u32) -> Vec<Self> {
        self.0
            .grid_disk::<Vec<_>>(k)
            .into_iter()
            .filter(|c| *c != self.0)
            .map(Self)
            .collect()
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CellKey {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<CellIndex>()
            .map(Self)
            .map_err(|e| IngestError::InvalidCell {
                message: format!("{s}: {e}"),
            })
    }
}

/// Maps coordinates to [`CellKey`]s at a fixed resolution.
#[derive(Debug, Clone, Copy)]
pub struct CellGrid {
    resolution: Resolution,
}

impl CellGrid {
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidConfig`] if `resolution` is not a
    /// valid H3 resolution (0-15).
    pub fn new(resolution: u8) -> Result<Self, IngestError> {
        let resolution =
            Resolution::try_from(resolution).map_err(|e| IngestError::InvalidConfig {
                message: format!("cell resolution {resolution}: {e}"),
            })?;
        Ok(Self { resolution })
    }

    /// # Errors
    ///
    /// Returns [`IngestError::InvalidSample`] if the coordinate is out of
    /// range.
    pub fn cell_for(&self, latitude: f64, longitude: f64) -> Result<CellKey, IngestError> {
        let coord = LatLng::new(latitude, longitude).map_err(|e| IngestError::InvalidSample {
            message: format!("coordinate {latitude},{longitude}: {e}"),
        })?;
        Ok(CellKey(coord.to_cell(self.resolution)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_points_share_a_cell() {
        let grid = CellGrid::new(8).unwrap();
        let a = grid.cell_for(23.2500, 77.4000).unwrap();
        let b = grid.cell_for(23.2501, 77.4001).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distant_points_do_not_share_a_cell() {
        let grid = CellGrid::new(8).unwrap();
        let a = grid.cell_for(23.2500, 77.4000).unwrap();
        let b = grid.cell_for(23.2700, 77.4500).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn center_lies_close_to_member_point() {
        let grid = CellGrid::new(8).unwrap();
        let cell = grid.cell_for(23.2500, 77.4000).unwrap();
        let center = cell.center();
        assert!((center.latitude - 23.25).abs() < 0.01);
        assert!((center.longitude - 77.40).abs() < 0.01);
    }

    #[test]
    fn first_ring_has_six_neighbors() {
        let grid = CellGrid::new(8).unwrap();
        let cell = grid.cell_for(23.2500, 77.4000).unwrap();
        let ring = cell.neighbors(1);
        assert_eq!(ring.len(), 6);
        assert!(!ring.contains(&cell));
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        let grid = CellGrid::new(8).unwrap();
        let cell = grid.cell_for(23.2500, 77.4000).unwrap();
        let parsed: CellKey = cell.to_string().parse().unwrap();
        assert_eq!(parsed, cell);
    }

    #[test]
    fn rejects_bad_resolution_and_coordinates() {
        assert!(matches!(
            CellGrid::new(16),
            Err(IngestError::InvalidConfig { .. })
        ));
        let grid = CellGrid::new(8).unwrap();
        assert!(matches!(
            grid.cell_for(f64::NAN, 77.0),
            Err(IngestError::InvalidSample { .. })
        ));
    }
}
