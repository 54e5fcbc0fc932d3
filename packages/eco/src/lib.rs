#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route eco-scoring.
//!
//! Estimates a route's carbon footprint from its length and transport
//! mode, turns it into a 0-100 score, adds a bounded bonus for green
//! spaces the route passes, and suggests the greenest mode that is
//! practical for the distance.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use raahi_eco_models::{EcoConfig, EcoScoreResult, ModeProfile, RouteRequest, TransportMode};
use raahi_geo::{GeoCatalog, GeoError};
use raahi_geo_models::{Coordinate, NearbyEntry};
use thiserror::Error;

const MAX_SCORE: f64 = 100.0;

/// Errors from eco-scoring.
#[derive(Debug, Error)]
pub enum EcoError {
    /// The route request is malformed (bad distance, coordinates, or an
    /// unconfigured mode).
    #[error("Invalid route request: {message}")]
    InvalidRequest {
        /// Description of what was wrong.
        message: String,
    },

    /// The scorer configuration is unusable.
    #[error("Invalid eco configuration: {message}")]
    InvalidConfig {
        /// Description of what was wrong.
        message: String,
    },

    /// A catalog query failed.
    #[error(transparent)]
    Catalog(#[from] GeoError),
}

/// Scores routes against the configured emission table and green-space
/// catalog.
#[derive(Debug)]
pub struct EcoScorer {
    config: EcoConfig,
    catalog: Arc<GeoCatalog>,
    profiles: BTreeMap<TransportMode, ModeProfile>,
}

impl EcoScorer {
    /// Builds a scorer, resolving the mode names in `config.modes`.
    ///
    /// # Errors
    ///
    /// Returns [`EcoError::InvalidConfig`] if a mode name is unknown, an
    /// emission factor is negative or not finite, two names for the same
    /// mode carry different profiles, the car or bus profile is missing,
    /// or `path_sample_divisor` is zero.
    pub fn new(config: EcoConfig, catalog: Arc<GeoCatalog>) -> Result<Self, EcoError> {
        let mut profiles = BTreeMap::new();
        for (name, profile) in &config.modes {
            let mode = TransportMode::from_str(name).map_err(|_| EcoError::InvalidConfig {
                message: format!("unknown transport mode '{name}'"),
            })?;
            if !profile.emission_g_per_km.is_finite() || profile.emission_g_per_km < 0.0 {
                return Err(EcoError::InvalidConfig {
                    message: format!(
                        "emission factor for {mode} must be a non-negative number, got {}",
                        profile.emission_g_per_km
                    ),
                });
            }
            match profiles.get(&mode) {
                Some((previous, existing)) if existing != profile => {
                    return Err(EcoError::InvalidConfig {
                        message: format!(
                            "transport mode {mode} is configured twice, as '{previous}' and '{name}'"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    profiles.insert(mode, (name.as_str(), profile.clone()));
                }
            }
        }
        let profiles: BTreeMap<TransportMode, ModeProfile> = profiles
            .into_iter()
            .map(|(mode, (_, profile))| (mode, profile))
            .collect();

        for required in [TransportMode::Car, TransportMode::Bus] {
            if !profiles.contains_key(&required) {
                return Err(EcoError::InvalidConfig {
                    message: format!("missing profile for {required}"),
                });
            }
        }

        if config.path_sample_divisor == 0 {
            return Err(EcoError::InvalidConfig {
                message: "path_sample_divisor must be at least 1".to_string(),
            });
        }

        Ok(Self {
            config,
            catalog,
            profiles,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EcoConfig {
        &self.config
    }

    /// Parses a user-supplied mode name, accepting the usual aliases.
    ///
    /// # Errors
    ///
    /// Returns [`EcoError::InvalidRequest`] for an unknown or unconfigured
    /// mode.
    pub fn parse_mode(&self, name: &str) -> Result<TransportMode, EcoError> {
        let mode = TransportMode::from_str(name.trim()).map_err(|_| EcoError::InvalidRequest {
            message: format!("unknown transport mode '{name}'"),
        })?;
        self.profile(mode)?;
        Ok(mode)
    }

    /// Estimated CO2 in kilograms for travelling `distance_km` by `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`EcoError::InvalidRequest`] if `mode` has no configured
    /// profile.
    pub fn carbon_kg(&self, distance_km: f64, mode: TransportMode) -> Result<f64, EcoError> {
        Ok(distance_km * self.profile(mode)?.emission_g_per_km / 1000.0)
    }

    /// The lowest-emission configured mode whose distance limit allows
    /// `distance_km`. Ties go to the mode declared first.
    ///
    /// If no mode is viable the lowest-emission mode overall is returned.
    #[must_use]
    pub fn recommended_mode(&self, distance_km: f64) -> TransportMode {
        let lowest = |viable_only: bool| {
            self.profiles
                .iter()
                .filter(|(_, p)| !viable_only || p.max_distance_km.is_none_or(|max| distance_km <= max))
                .min_by(|(a_mode, a), (b_mode, b)| {
                    a.emission_g_per_km
                        .total_cmp(&b.emission_g_per_km)
                        .then_with(|| a_mode.cmp(b_mode))
                })
                .map(|(mode, _)| *mode)
        };

        lowest(true)
            .or_else(|| lowest(false))
            .unwrap_or(TransportMode::Bus)
    }

    /// Scores a route.
    ///
    /// # Errors
    ///
    /// * [`EcoError::InvalidRequest`] if the distance is not a positive
    ///   number, a coordinate is out of range, or the mode is not
    ///   configured.
    /// * [`EcoError::Catalog`] if a green-space lookup fails.
    pub fn score_route(&self, request: &RouteRequest) -> Result<EcoScoreResult, EcoError> {
        if !request.distance_km.is_finite() || request.distance_km <= 0.0 {
            return Err(EcoError::InvalidRequest {
                message: format!(
                    "distance must be a positive number of kilometres, got {}",
                    request.distance_km
                ),
            });
        }
        if let Some(bad) = std::iter::once(&request.origin)
            .chain(std::iter::once(&request.destination))
            .chain(&request.path)
            .find(|c| !c.is_valid())
        {
            return Err(EcoError::InvalidRequest {
                message: format!(
                    "coordinate {},{} is out of range",
                    bad.latitude, bad.longitude
                ),
            });
        }

        let carbon_kg = self.carbon_kg(request.distance_km, request.mode)?;
        let carbon_car_kg = self.carbon_kg(request.distance_km, TransportMode::Car)?;
        let carbon_public_transport_kg = self.carbon_kg(request.distance_km, TransportMode::Bus)?;

        let penalty = (carbon_kg * self.config.penalty_per_kg).min(self.config.max_carbon_penalty);
        let trip_bonus = self.trip_bonus(request.distance_km);

        let nearby_green_spaces = self.green_spaces_along(request)?;
        #[allow(clippy::cast_precision_loss)]
        let green_bonus = (nearby_green_spaces.len() as f64 * self.config.bonus_per_green_space)
            .min(self.config.max_green_bonus);

        let eco_score = (MAX_SCORE - penalty + trip_bonus + green_bonus).clamp(0.0, MAX_SCORE);
        let recommended_mode = self.recommended_mode(request.distance_km);

        log::debug!(
            "Scored {:.2} km by {}: {:.3} kg CO2, penalty {penalty:.1}, trip bonus {trip_bonus:.1}, \
             {} green spaces (+{green_bonus:.1}) => {eco_score:.1}",
            request.distance_km,
            request.mode,
            carbon_kg,
            nearby_green_spaces.len(),
        );

        Ok(EcoScoreResult {
            eco_score,
            mode: request.mode,
            carbon_kg,
            carbon_public_transport_kg,
            carbon_saved_kg: carbon_car_kg - carbon_kg,
            nearby_green_spaces,
            green_bonus,
            recommended_mode,
        })
    }

    fn profile(&self, mode: TransportMode) -> Result<&ModeProfile, EcoError> {
        self.profiles
            .get(&mode)
            .ok_or_else(|| EcoError::InvalidRequest {
                message: format!("transport mode {mode} is not configured"),
            })
    }

    fn trip_bonus(&self, distance_km: f64) -> f64 {
        if distance_km < self.config.short_trip_km {
            self.config.short_trip_bonus
        } else if distance_km < self.config.medium_trip_km {
            self.config.medium_trip_bonus
        } else {
            0.0
        }
    }

    /// Origin, midpoint, destination, then every `len / divisor`-th path
    /// point.
    fn sample_points(&self, request: &RouteRequest) -> Vec<Coordinate> {
        let mut points = vec![
            request.origin,
            request.origin.midpoint(&request.destination),
            request.destination,
        ];
        let step = (request.path.len() / self.config.path_sample_divisor).max(1);
        points.extend(request.path.iter().step_by(step).copied());
        points
    }

    /// Distinct green spaces within range of any sample point, each at its
    /// closest distance, nearest first.
    fn green_spaces_along(&self, request: &RouteRequest) -> Result<Vec<NearbyEntry>, EcoError> {
        let mut closest: BTreeMap<String, NearbyEntry> = BTreeMap::new();
        for point in self.sample_points(request) {
            for nearby in self
                .catalog
                .green_spaces_near(point, self.config.green_radius_km)?
            {
                match closest.get_mut(&nearby.entry.id) {
                    Some(existing) if existing.distance_km <= nearby.distance_km => {}
                    Some(existing) => *existing = nearby,
                    None => {
                        closest.insert(nearby.entry.id.clone(), nearby);
                    }
                }
            }
        }

        let mut spaces: Vec<NearbyEntry> = closest.into_values().collect();
        spaces.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        Ok(spaces)
    }
}

#[cfg(test)]
mod tests {
    use raahi_geo_models::{GeoCategory, GeoEntry};

    use super::*;

    fn park(id: &str, latitude: f64, longitude: f64) -> GeoEntry {
        GeoEntry {
            id: id.to_string(),
            name: id.to_string(),
            category: GeoCategory::GreenSpace,
            kind: Some("park".to_string()),
            latitude,
            longitude,
            radius_meters: 200.0,
        }
    }

    fn scorer(entries: Vec<GeoEntry>) -> EcoScorer {
        EcoScorer::new(
            EcoConfig::default(),
            Arc::new(GeoCatalog::new(entries).unwrap()),
        )
        .unwrap()
    }

    // Far from anything in the builtin catalog.
    fn remote_request(distance_km: f64, mode: TransportMode) -> RouteRequest {
        RouteRequest::new(
            Coordinate::new(10.0, 10.0),
            Coordinate::new(10.01, 10.01),
            distance_km,
            mode,
        )
    }

    #[test]
    fn car_scores_lower_than_cycle_without_green_spaces() {
        let scorer = scorer(Vec::new());
        let car = scorer
            .score_route(&remote_request(5.0, TransportMode::Car))
            .unwrap();
        let cycle = scorer
            .score_route(&remote_request(5.0, TransportMode::Cycle))
            .unwrap();

        assert!(car.eco_score < cycle.eco_score);
        assert!(car.nearby_green_spaces.is_empty());
        assert!(car.green_bonus.abs() < f64::EPSILON);
    }

    #[test]
    fn car_score_matches_penalty_and_trip_bonus() {
        let scorer = scorer(Vec::new());
        // 5 km by car = 0.6 kg, penalty capped at 50; 5 km earns the
        // medium-trip bonus.
        let result = scorer
            .score_route(&remote_request(5.0, TransportMode::Car))
            .unwrap();
        assert!((result.carbon_kg - 0.6).abs() < 1e-9);
        assert!((result.eco_score - 55.0).abs() < 1e-9);
        assert!((result.carbon_saved_kg).abs() < 1e-9);
        assert!((result.carbon_public_transport_kg - 0.25).abs() < 1e-9);
    }

    #[test]
    fn scores_stay_within_bounds() {
        let scorer = scorer(vec![
            park("a", 10.0, 10.0),
            park("b", 10.001, 10.001),
            park("c", 10.002, 10.002),
            park("d", 10.003, 10.003),
            park("e", 10.004, 10.004),
            park("f", 10.005, 10.005),
        ]);
        for &mode in TransportMode::all() {
            for distance in [0.1, 1.0, 5.0, 50.0, 5000.0] {
                let result = scorer.score_route(&remote_request(distance, mode)).unwrap();
                assert!(
                    (0.0..=100.0).contains(&result.eco_score),
                    "{mode} at {distance} km scored {}",
                    result.eco_score
                );
                assert!(result.green_bonus <= 20.0);
            }
        }
    }

    #[test]
    fn carbon_grows_with_distance() {
        let scorer = scorer(Vec::new());
        let mut previous = 0.0;
        for distance in [1.0, 2.0, 4.0, 8.0, 16.0] {
            let carbon = scorer.carbon_kg(distance, TransportMode::Bus).unwrap();
            assert!(carbon > previous);
            previous = carbon;
        }
    }

    #[test]
    fn rejects_non_positive_and_nan_distance() {
        let scorer = scorer(Vec::new());
        for distance in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                scorer.score_route(&remote_request(distance, TransportMode::Car)),
                Err(EcoError::InvalidRequest { .. })
            ));
        }
    }

    #[test]
    fn rejects_out_of_range_path_point() {
        let scorer = scorer(Vec::new());
        let request = remote_request(3.0, TransportMode::Walk)
            .with_path(vec![Coordinate::new(10.0, 10.0), Coordinate::new(95.0, 10.0)]);
        assert!(matches!(
            scorer.score_route(&request),
            Err(EcoError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn unconfigured_mode_is_invalid_request() {
        let mut config = EcoConfig::default();
        config.modes.remove("ev");
        let scorer = EcoScorer::new(config, Arc::new(GeoCatalog::new(Vec::new()).unwrap())).unwrap();

        assert!(matches!(
            scorer.score_route(&remote_request(3.0, TransportMode::Ev)),
            Err(EcoError::InvalidRequest { .. })
        ));
        assert!(matches!(
            scorer.parse_mode("electric_vehicle"),
            Err(EcoError::InvalidRequest { .. })
        ));
        assert!(matches!(
            scorer.parse_mode("teleport"),
            Err(EcoError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn parse_mode_accepts_aliases() {
        let scorer = scorer(Vec::new());
        assert_eq!(
            scorer.parse_mode("public_transport").unwrap(),
            TransportMode::Bus
        );
        assert_eq!(scorer.parse_mode(" Walking ").unwrap(), TransportMode::Walk);
    }

    #[test]
    fn config_with_unknown_mode_is_rejected() {
        let mut config = EcoConfig::default();
        config.modes.insert(
            "jetpack".to_string(),
            ModeProfile {
                emission_g_per_km: 900.0,
                max_distance_km: None,
            },
        );
        assert!(matches!(
            EcoScorer::new(config, Arc::new(GeoCatalog::new(Vec::new()).unwrap())),
            Err(EcoError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn alias_override_from_toml_reaches_the_scorer() {
        let config: EcoConfig = toml::from_str(
            r"
            [modes.bicycle]
            emission_g_per_km = 10.0

            [modes.electric_vehicle]
            emission_g_per_km = 30.0
            ",
        )
        .unwrap();
        let scorer = EcoScorer::new(config, Arc::new(GeoCatalog::new(Vec::new()).unwrap())).unwrap();
        assert!((scorer.carbon_kg(10.0, TransportMode::Cycle).unwrap() - 0.1).abs() < 1e-9);
        assert!((scorer.carbon_kg(10.0, TransportMode::Ev).unwrap() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn conflicting_alias_entries_are_rejected() {
        let mut config = EcoConfig::default();
        config.modes.insert(
            "bicycle".to_string(),
            ModeProfile {
                emission_g_per_km: 10.0,
                max_distance_km: Some(8.0),
            },
        );
        let err = EcoScorer::new(config, Arc::new(GeoCatalog::new(Vec::new()).unwrap()))
            .unwrap_err();
        assert!(matches!(err, EcoError::InvalidConfig { .. }));
        assert!(err.to_string().contains("bicycle"));
    }

    #[test]
    fn recommends_by_distance() {
        let scorer = scorer(Vec::new());
        assert_eq!(scorer.recommended_mode(1.5), TransportMode::Walk);
        assert_eq!(scorer.recommended_mode(6.0), TransportMode::Cycle);
        assert_eq!(scorer.recommended_mode(25.0), TransportMode::Ev);
    }

    #[test]
    fn green_spaces_add_bonus_and_are_deduplicated() {
        let scorer = scorer(vec![park("riverside", 10.0, 10.0), park("far", 11.0, 11.0)]);
        // Path revisits the park; it must only count once.
        let request = remote_request(12.0, TransportMode::Car).with_path(vec![
            Coordinate::new(10.0, 10.0),
            Coordinate::new(10.001, 10.0),
            Coordinate::new(10.0, 10.001),
        ]);

        let result = scorer.score_route(&request).unwrap();
        assert_eq!(result.nearby_green_spaces.len(), 1);
        assert_eq!(result.nearby_green_spaces[0].entry.id, "riverside");
        assert!(result.nearby_green_spaces[0].distance_km < 1e-6);
        assert!((result.green_bonus - 5.0).abs() < 1e-9);
    }

    #[test]
    fn builtin_catalog_rewards_lakeside_route() {
        let scorer = EcoScorer::new(EcoConfig::default(), Arc::new(GeoCatalog::builtin().unwrap()))
            .unwrap();
        let request = RouteRequest::new(
            Coordinate::new(23.2599, 77.4126),
            Coordinate::new(23.2500, 77.3950),
            2.5,
            TransportMode::Cycle,
        );

        let result = scorer.score_route(&request).unwrap();
        assert!(!result.nearby_green_spaces.is_empty());
        assert!(result.green_bonus > 0.0);
        assert!(
            result
                .nearby_green_spaces
                .windows(2)
                .all(|w| w[0].distance_km <= w[1].distance_km)
        );
    }
}
