#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Crowd and pollution hotspot detection.
//!
//! Each call to [`HotspotAggregator::compute_alerts`] takes a consistent
//! snapshot of the location window, groups the retained samples by cell,
//! and flags cells that are crowded (enough distinct users) and/or
//! polluted (regional or per-sample AQI above the alert threshold). Every
//! flagged cell gets a recommended alternative: the least busy, then
//! nearest, of the nearby green spaces and quiet neighbouring cells.
//!
//! The computation is pure given the window contents, `now`, and the AQI
//! map, so repeated calls with the same inputs return identical results.

mod alternative;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use raahi_geo::{GeoCatalog, GeoError, RegionMap};
use raahi_hotspot_models::{Hotspot, HotspotConfig, Severity};
use raahi_ingest::{CellKey, IngestError, LocationIngest};
use raahi_ingest_models::PositionSample;
use thiserror::Error;

/// Errors from an aggregation pass.
#[derive(Debug, Error)]
pub enum HotspotError {
    /// The AQI map references a region the region map does not know, or
    /// carries an unusable reading.
    #[error("Invalid region '{region}': {message}")]
    InvalidRegion {
        /// The offending region key.
        region: String,
        /// Description of what was wrong.
        message: String,
    },

    /// Sample or cell handling failed.
    #[error(transparent)]
    InvalidSample(#[from] IngestError),

    /// A catalog lookup failed.
    #[error(transparent)]
    Catalog(#[from] GeoError),
}

/// Per-cell aggregate for one pass.
#[derive(Debug, Clone)]
pub(crate) struct CellStats {
    pub(crate) sample_count: usize,
    pub(crate) unique_users: usize,
    pub(crate) region_id: String,
    pub(crate) aqi: Option<f64>,
}

/// Detects hotspots over the shared location window.
///
/// Holds handles to the window and the static geo data; cloning the
/// aggregator is cheap and every clone observes the same window.
#[derive(Debug, Clone)]
pub struct HotspotAggregator {
    config: HotspotConfig,
    ingest: Arc<LocationIngest>,
    catalog: Arc<GeoCatalog>,
    regions: Arc<RegionMap>,
}

impl HotspotAggregator {
    #[must_use]
    pub const fn new(
        config: HotspotConfig,
        ingest: Arc<LocationIngest>,
        catalog: Arc<GeoCatalog>,
        regions: Arc<RegionMap>,
    ) -> Self {
        Self {
            config,
            ingest,
            catalog,
            regions,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &HotspotConfig {
        &self.config
    }

    /// The window this aggregator reads from.
    #[must_use]
    pub const fn ingest(&self) -> &Arc<LocationIngest> {
        &self.ingest
    }

    /// Runs one aggregation pass.
    ///
    /// `aqi_by_region` maps region ids (see [`RegionMap`]) to the current
    /// AQI for that region. A cell takes the worst reading among the
    /// regions its samples fall in. Regions missing from the map simply
    /// have no regional reading.
    ///
    /// Results are ordered by severity (`both`, then `polluted`, then
    /// `crowded`), then by distinct users descending, then by cell key.
    ///
    /// # Errors
    ///
    /// Returns [`HotspotError::InvalidRegion`] if `aqi_by_region` contains
    /// an unknown region id or a negative/non-finite reading.
    pub fn compute_alerts(
        &self,
        now: DateTime<Utc>,
        aqi_by_region: &BTreeMap<String, f64>,
    ) -> Result<Vec<Hotspot>, HotspotError> {
        self.validate_regions(aqi_by_region)?;

        let snapshot = self.ingest.snapshot(now);
        let stats: BTreeMap<CellKey, CellStats> = snapshot
            .iter()
            .map(|(cell, samples)| (*cell, self.cell_stats(*cell, samples, aqi_by_region)))
            .collect();

        let flagged: BTreeMap<CellKey, Severity> = stats
            .iter()
            .filter_map(|(cell, s)| self.severity_of(s).map(|severity| (*cell, severity)))
            .collect();

        let mut hotspots = Vec::with_capacity(flagged.len());
        for (cell, severity) in &flagged {
            let s = &stats[cell];
            let location = cell.center();
            let recommended_alternative = alternative::resolve(
                self,
                *cell,
                location,
                &stats,
                &flagged,
                aqi_by_region,
            )?;

            hotspots.push(Hotspot {
                cell_key: cell.to_string(),
                region_id: s.region_id.clone(),
                representative_location: location,
                sample_count: s.sample_count,
                unique_users: s.unique_users,
                aqi_at_location: s.aqi,
                severity: *severity,
                message: self.describe(*severity, s),
                recommendation: severity.recommendation().to_string(),
                recommended_alternative,
                generated_at: now,
            });
        }

        hotspots.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.unique_users.cmp(&a.unique_users))
                .then_with(|| a.cell_key.cmp(&b.cell_key))
        });

        log::debug!(
            "Aggregation pass at {now}: {} cell(s), {} hotspot(s)",
            stats.len(),
            hotspots.len()
        );

        Ok(hotspots)
    }

    fn validate_regions(&self, aqi_by_region: &BTreeMap<String, f64>) -> Result<(), HotspotError> {
        for (region, aqi) in aqi_by_region {
            if !self.regions.is_known(region) {
                return Err(HotspotError::InvalidRegion {
                    region: region.clone(),
                    message: "unknown region".to_string(),
                });
            }
            if !aqi.is_finite() || *aqi < 0.0 {
                return Err(HotspotError::InvalidRegion {
                    region: region.clone(),
                    message: format!("AQI {aqi} must be a non-negative number"),
                });
            }
        }
        Ok(())
    }

    fn cell_stats(
        &self,
        cell: CellKey,
        samples: &[PositionSample],
        aqi_by_region: &BTreeMap<String, f64>,
    ) -> CellStats {
        let unique_users = samples
            .iter()
            .map(|s| s.user_id.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        // A cell can straddle a region boundary, so the regional reading is
        // the worst over the regions its samples actually fall in.
        let regional_aqi = samples
            .iter()
            .map(|s| self.regions.region_for(s.latitude, s.longitude))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|region| aqi_by_region.get(region).copied())
            .reduce(f64::max);
        let sample_aqi = samples.iter().filter_map(|s| s.aqi).reduce(f64::max);
        let aqi = max_reading(regional_aqi, sample_aqi);
        let region_id = self.region_of(cell);

        CellStats {
            sample_count: samples.len(),
            unique_users,
            region_id,
            aqi,
        }
    }

    pub(crate) fn region_of(&self, cell: CellKey) -> String {
        let center = cell.center();
        self.regions
            .region_for(center.latitude, center.longitude)
            .to_string()
    }

    pub(crate) const fn is_crowded(&self, unique_users: usize) -> bool {
        unique_users >= self.config.crowd_threshold
    }

    pub(crate) fn is_polluted(&self, aqi: Option<f64>) -> bool {
        aqi.is_some_and(|a| a > self.config.aqi_alert_threshold)
    }

    fn severity_of(&self, stats: &CellStats) -> Option<Severity> {
        Severity::from_flags(
            self.is_crowded(stats.unique_users),
            self.is_polluted(stats.aqi),
        )
    }

    fn describe(&self, severity: Severity, stats: &CellStats) -> String {
        let mut parts = Vec::with_capacity(2);
        if severity.is_crowded() {
            parts.push(format!(
                "high crowd density ({} users in last {} min)",
                stats.unique_users,
                self.ingest.config().window_minutes()
            ));
        }
        if let Some(aqi) = stats.aqi.filter(|_| severity.is_polluted()) {
            parts.push(format!("high AQI (~{aqi:.0})"));
        }
        parts.join(" and ")
    }
}

pub(crate) fn max_reading(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use raahi_ingest_models::WindowConfig;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn aggregator(window_seconds: u64, crowd_threshold: usize) -> HotspotAggregator {
        let ingest = LocationIngest::new(WindowConfig {
            window_seconds,
            ..WindowConfig::default()
        })
        .unwrap();
        HotspotAggregator::new(
            HotspotConfig {
                crowd_threshold,
                ..HotspotConfig::default()
            },
            Arc::new(ingest),
            Arc::new(GeoCatalog::builtin().unwrap()),
            Arc::new(RegionMap::builtin().unwrap()),
        )
    }

    // Middle of the New Market region box, away from every green space.
    const CROWD_LAT: f64 = 23.2600;
    const CROWD_LNG: f64 = 77.4200;

    fn crowd(agg: &HotspotAggregator, users: usize, at: DateTime<Utc>) {
        for i in 0..users {
            let sample = PositionSample::new(
                format!("user-{i}"),
                CROWD_LAT,
                CROWD_LNG,
                at + TimeDelta::seconds(i64::try_from(i).unwrap() * 10),
            );
            agg.ingest().record(sample, at + TimeDelta::minutes(1)).unwrap();
        }
    }

    #[test]
    fn crowded_then_expired() {
        let agg = aggregator(600, 5);
        crowd(&agg, 5, t0());

        let now = t0() + TimeDelta::minutes(1);
        let alerts = agg.compute_alerts(now, &BTreeMap::new()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Crowded);
        assert_eq!(alerts[0].unique_users, 5);
        assert!(alerts[0].message.contains("5 users in last 10 min"));

        let later = t0() + TimeDelta::minutes(12);
        let alerts = agg.compute_alerts(later, &BTreeMap::new()).unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn threshold_is_inclusive() {
        let agg = aggregator(600, 5);
        crowd(&agg, 4, t0());
        let now = t0() + TimeDelta::minutes(1);
        assert!(agg.compute_alerts(now, &BTreeMap::new()).unwrap().is_empty());

        crowd(&agg, 5, t0());
        assert_eq!(agg.compute_alerts(now, &BTreeMap::new()).unwrap().len(), 1);
    }

    #[test]
    fn repeated_samples_from_one_user_are_not_a_crowd() {
        let agg = aggregator(600, 5);
        for i in 0..10 {
            let sample = PositionSample::new(
                "same-user",
                CROWD_LAT,
                CROWD_LNG,
                t0() + TimeDelta::seconds(i),
            );
            agg.ingest().record(sample, t0() + TimeDelta::minutes(1)).unwrap();
        }
        let alerts = agg
            .compute_alerts(t0() + TimeDelta::minutes(1), &BTreeMap::new())
            .unwrap();
        assert!(alerts.is_empty());
    }

    #[test]
    fn regional_aqi_marks_polluted_and_both() {
        let agg = aggregator(600, 5);
        crowd(&agg, 5, t0());
        let lone = PositionSample::new("walker", 23.2550, 77.4000, t0());
        agg.ingest().record(lone, t0()).unwrap();

        let aqi: BTreeMap<String, f64> = [
            ("new_market".to_string(), 180.0),
            ("upper_lake".to_string(), 200.0),
        ]
        .into_iter()
        .collect();

        let alerts = agg.compute_alerts(t0() + TimeDelta::minutes(1), &aqi).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::Both);
        assert_eq!(alerts[0].region_id, "new_market");
        assert_eq!(alerts[1].severity, Severity::Polluted);
        assert_eq!(alerts[1].aqi_at_location, Some(200.0));
    }

    #[test]
    fn aqi_at_threshold_is_not_polluted() {
        let agg = aggregator(600, 5);
        let lone = PositionSample::new("walker", CROWD_LAT, CROWD_LNG, t0());
        agg.ingest().record(lone, t0()).unwrap();

        let at_threshold: BTreeMap<String, f64> =
            [("new_market".to_string(), 150.0)].into_iter().collect();
        assert!(agg.compute_alerts(t0(), &at_threshold).unwrap().is_empty());
    }

    #[test]
    fn sample_inside_polluted_region_flags_cell_across_boundary() {
        let agg = aggregator(600, 5);
        // Inside the Upper Lake box, in a cell whose centre lies outside it.
        let sample = PositionSample::new("walker", 23.2450, 77.3900, t0());
        let cell = agg.ingest().record(sample, t0()).unwrap();
        assert_eq!(
            agg.regions.region_for(23.2450, 77.3900),
            "upper_lake"
        );
        assert_ne!(agg.region_of(cell), "upper_lake");

        let aqi: BTreeMap<String, f64> =
            [("upper_lake".to_string(), 300.0)].into_iter().collect();
        let alerts = agg.compute_alerts(t0(), &aqi).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Polluted);
        assert_eq!(alerts[0].aqi_at_location, Some(300.0));
        assert_eq!(alerts[0].region_id, agg.region_of(cell));
    }

    #[test]
    fn per_sample_aqi_counts() {
        let agg = aggregator(600, 5);
        let sample = PositionSample::new("walker", CROWD_LAT, CROWD_LNG, t0()).with_aqi(220.0);
        agg.ingest().record(sample, t0()).unwrap();

        let alerts = agg.compute_alerts(t0(), &BTreeMap::new()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Polluted);
        assert_eq!(alerts[0].aqi_at_location, Some(220.0));
        assert!(alerts[0].message.contains("~220"));
    }

    #[test]
    fn unknown_region_is_rejected() {
        let agg = aggregator(600, 5);
        let aqi: BTreeMap<String, f64> = [("atlantis".to_string(), 10.0)].into_iter().collect();
        assert!(matches!(
            agg.compute_alerts(t0(), &aqi),
            Err(HotspotError::InvalidRegion { .. })
        ));

        let aqi: BTreeMap<String, f64> =
            [("new_market".to_string(), f64::NAN)].into_iter().collect();
        assert!(matches!(
            agg.compute_alerts(t0(), &aqi),
            Err(HotspotError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn compute_alerts_is_idempotent() {
        let agg = aggregator(600, 3);
        crowd(&agg, 6, t0());
        let aqi: BTreeMap<String, f64> =
            [("upper_lake".to_string(), 170.0)].into_iter().collect();
        let now = t0() + TimeDelta::minutes(2);
        let first = agg.compute_alerts(now, &aqi).unwrap();
        let second = agg.compute_alerts(now, &aqi).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hotspot_gets_an_uncrowded_alternative() {
        let agg = aggregator(600, 5);
        crowd(&agg, 5, t0());
        let alerts = agg
            .compute_alerts(t0() + TimeDelta::minutes(1), &BTreeMap::new())
            .unwrap();
        let alt = alerts[0]
            .recommended_alternative
            .as_ref()
            .expect("a hotspot in the city should have an alternative");
        assert_eq!(alt.unique_users(), 0);
        assert!(alt.distance_km() > 0.0);
        assert!(alt.distance_km() <= agg.config().alternative_search_radius_km);
    }
}
