//! Recommended-alternative resolution for a hotspot.
//!
//! Candidates come from two places: catalogued green spaces within the
//! search radius, and the cells in the surrounding H3 rings. Either kind
//! is eligible only if its cell is not the hotspot and is neither crowded
//! nor polluted. All candidates are ranked together by distinct users
//! (fewest first), then distance, then green spaces ahead of plain cells,
//! then id.

use std::collections::BTreeMap;

use raahi_geo::haversine_km;
use raahi_geo_models::Coordinate;
use raahi_hotspot_models::{Alternative, Severity};
use raahi_ingest::CellKey;

use crate::{CellStats, HotspotAggregator, HotspotError, max_reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    GreenSpace,
    QuietCell,
}

struct Candidate {
    unique_users: usize,
    distance_km: f64,
    kind: Kind,
    tiebreak: String,
    alternative: Alternative,
}

pub(crate) fn resolve(
    agg: &HotspotAggregator,
    hotspot: CellKey,
    location: Coordinate,
    stats: &BTreeMap<CellKey, CellStats>,
    flagged: &BTreeMap<CellKey, Severity>,
    aqi_by_region: &BTreeMap<String, f64>,
) -> Result<Option<Alternative>, HotspotError> {
    let mut candidates = Vec::new();

    for nearby in agg
        .catalog
        .green_spaces_near(location, agg.config.alternative_search_radius_km)?
    {
        let cell = agg
            .ingest
            .grid()
            .cell_for(nearby.entry.latitude, nearby.entry.longitude)?;
        if cell == hotspot || flagged.contains_key(&cell) {
            continue;
        }
        let Some(unique_users) = quiet_count(agg, cell, stats, aqi_by_region) else {
            continue;
        };

        candidates.push(Candidate {
            unique_users,
            distance_km: nearby.distance_km,
            kind: Kind::GreenSpace,
            tiebreak: nearby.entry.id.clone(),
            alternative: Alternative::GreenSpace {
                id: nearby.entry.id,
                name: nearby.entry.name,
                location: Coordinate::new(nearby.entry.latitude, nearby.entry.longitude),
                distance_km: nearby.distance_km,
                unique_users,
            },
        });
    }

    candidates.extend(
        hotspot
            .neighbors(agg.config.alternative_ring_size)
            .into_iter()
            .filter(|cell| !flagged.contains_key(cell))
            .filter_map(|cell| {
                let unique_users = quiet_count(agg, cell, stats, aqi_by_region)?;
                let center = cell.center();
                let distance_km = haversine_km(location, center);
                Some(Candidate {
                    unique_users,
                    distance_km,
                    kind: Kind::QuietCell,
                    tiebreak: cell.to_string(),
                    alternative: Alternative::QuietCell {
                        cell_key: cell.to_string(),
                        location: center,
                        distance_km,
                        unique_users,
                    },
                })
            }),
    );

    Ok(best(candidates))
}

/// Distinct users in `cell` if it is neither crowded nor polluted.
fn quiet_count(
    agg: &HotspotAggregator,
    cell: CellKey,
    stats: &BTreeMap<CellKey, CellStats>,
    aqi_by_region: &BTreeMap<String, f64>,
) -> Option<usize> {
    let (unique_users, aqi) = stats.get(&cell).map_or_else(
        || {
            let region = agg.region_of(cell);
            (0, max_reading(aqi_by_region.get(&region).copied(), None))
        },
        |s| (s.unique_users, s.aqi),
    );

    (!agg.is_crowded(unique_users) && !agg.is_polluted(aqi)).then_some(unique_users)
}

fn best(mut candidates: Vec<Candidate>) -> Option<Alternative> {
    candidates.sort_by(|a, b| {
        a.unique_users
            .cmp(&b.unique_users)
            .then_with(|| a.distance_km.total_cmp(&b.distance_km))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.tiebreak.cmp(&b.tiebreak))
    });
    candidates.into_iter().next().map(|c| c.alternative)
}
