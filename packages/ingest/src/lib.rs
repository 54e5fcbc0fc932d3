#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Location ingestion for crowd detection.
//!
//! Accepts timestamped user positions from the real-time presence channel
//! and keeps them in a bounded, time-based sliding window partitioned by
//! H3 cell. The window is the only shared mutable state in the alerting
//! core: all inserts, evictions, and reads go through a single mutex so a
//! reader never observes a half-applied insert or eviction.

pub mod cell;
mod window;

pub use cell::{CellGrid, CellKey};
pub use window::WindowSnapshot;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use raahi_ingest_models::{PositionSample, WindowConfig};
use thiserror::Error;

use crate::window::Window;

/// Errors from sample ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The sample has malformed coordinates, identity, or timestamp.
    #[error("Invalid sample: {message}")]
    InvalidSample {
        /// Description of what was wrong.
        message: String,
    },

    /// A cell key string could not be parsed.
    #[error("Invalid cell key: {message}")]
    InvalidCell {
        /// Description of what was wrong.
        message: String,
    },

    /// The window configuration is unusable.
    #[error("Invalid window configuration: {message}")]
    InvalidConfig {
        /// Description of what was wrong.
        message: String,
    },
}

/// Lock-guarded sliding window of recent position samples.
///
/// Constructed once and shared (typically behind an `Arc`) between the
/// presence handler that records samples and whatever triggers alert
/// computation. Dropping it discards all retained samples.
#[derive(Debug)]
pub struct LocationIngest {
    config: WindowConfig,
    grid: CellGrid,
    window: Mutex<Window>,
}

impl LocationIngest {
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidConfig`] if the cell resolution is
    /// invalid or the window is zero-length.
    pub fn new(config: WindowConfig) -> Result<Self, IngestError> {
        if config.window_seconds == 0 {
            return Err(IngestError::InvalidConfig {
                message: "window_seconds must be greater than zero".to_string(),
            });
        }
        let grid = CellGrid::new(config.cell_resolution)?;

        log::debug!(
            "Location window: {}s, resolution {}, capacity {}",
            config.window_seconds,
            config.cell_resolution,
            config.max_samples
        );

        Ok(Self {
            config,
            grid,
            window: Mutex::new(Window::default()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &WindowConfig {
        &self.config
    }

    #[must_use]
    pub const fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Validates a sample and returns the cell it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidSample`] if the user id is blank, the
    /// coordinate is out of range, the attached AQI is negative or not a
    /// number, or the timestamp is further in the future than the clock
    /// skew tolerance allows.
    pub fn validate(
        &self,
        sample: &PositionSample,
        now: DateTime<Utc>,
    ) -> Result<CellKey, IngestError> {
        if sample.user_id.trim().is_empty() {
            return Err(IngestError::InvalidSample {
                message: "user_id is empty".to_string(),
            });
        }

        if !sample.coordinate().is_valid() {
            return Err(IngestError::InvalidSample {
                message: format!(
                    "coordinate {},{} is out of range",
                    sample.latitude, sample.longitude
                ),
            });
        }

        if let Some(aqi) = sample.aqi.filter(|a| !a.is_finite() || *a < 0.0) {
            return Err(IngestError::InvalidSample {
                message: format!("aqi {aqi} must be a non-negative number"),
            });
        }

        let latest_allowed = now
            .checked_add_signed(self.config.clock_skew_tolerance())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if sample.timestamp > latest_allowed {
            return Err(IngestError::InvalidSample {
                message: format!(
                    "timestamp {} is more than {}s ahead of {now}",
                    sample.timestamp, self.config.clock_skew_tolerance_seconds
                ),
            });
        }

        self.grid.cell_for(sample.latitude, sample.longitude)
    }

    /// Inserts a sample into the window.
    ///
    /// `now` is the ingest time used for the freshness check.
    ///
    /// # Errors
    ///
    /// See [`Self::validate`]. A rejected sample leaves the window
    /// untouched.
    pub fn record(
        &self,
        sample: PositionSample,
        now: DateTime<Utc>,
    ) -> Result<CellKey, IngestError> {
        let cell = self.validate(&sample, now)?;

        let mut window = self.lock();
        window.insert(cell, sample);
        let dropped = window.enforce_capacity(self.config.max_samples);
        drop(window);

        if dropped > 0 {
            log::debug!("Window at capacity; dropped {dropped} oldest sample(s)");
        }
        Ok(cell)
    }

    /// Inserts many samples under a single lock acquisition.
    ///
    /// Each sample is validated independently: malformed samples are
    /// reported in the returned vector (same order as the input) and do
    /// not prevent the valid ones from being stored.
    pub fn record_batch(
        &self,
        samples: Vec<PositionSample>,
        now: DateTime<Utc>,
    ) -> Vec<Result<CellKey, IngestError>> {
        let validated: Vec<_> = samples
            .into_iter()
            .map(|sample| self.validate(&sample, now).map(|cell| (cell, sample)))
            .collect();

        let mut window = self.lock();
        let results = validated
            .into_iter()
            .map(|result| {
                result.map(|(cell, sample)| {
                    window.insert(cell, sample);
                    cell
                })
            })
            .collect::<Vec<_>>();
        let dropped = window.enforce_capacity(self.config.max_samples);
        drop(window);

        let rejected = results.iter().filter(|r| r.is_err()).count();
        if rejected > 0 {
            log::warn!("Rejected {rejected} of {} sample(s)", results.len());
        }
        if dropped > 0 {
            log::debug!("Window at capacity; dropped {dropped} oldest sample(s)");
        }
        results
    }

    /// Removes every sample with `timestamp < now - window_duration`.
    ///
    /// Returns the number of samples removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let removed = self.lock().evict_before(cutoff);
        if removed > 0 {
            log::debug!("Evicted {removed} expired sample(s) older than {cutoff}");
        }
        removed
    }

    /// Samples currently retained in `cell`, after evicting anything
    /// expired relative to `now`.
    #[must_use]
    pub fn samples_in_cell(&self, cell: CellKey, now: DateTime<Utc>) -> Vec<PositionSample> {
        let cutoff = self.cutoff(now);
        let mut window = self.lock();
        window.evict_before(cutoff);
        window.cell(cell)
    }

    /// Evicts expired samples and copies the whole window, all under one
    /// lock acquisition so the copy is internally consistent.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> WindowSnapshot {
        let cutoff = self.cutoff(now);
        let mut window = self.lock();
        window.evict_before(cutoff);
        window.snapshot()
    }

    /// Number of retained samples, including any not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards every retained sample.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.config.window_duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    // A panic while holding the lock cannot leave `Window` half-updated in
    // a way that matters for counting, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn ingest(window_seconds: u64) -> LocationIngest {
        LocationIngest::new(WindowConfig {
            window_seconds,
            ..WindowConfig::default()
        })
        .unwrap()
    }

    fn sample(user: &str, at: DateTime<Utc>) -> PositionSample {
        PositionSample::new(user, 23.2500, 77.4000, at)
    }

    #[test]
    fn evict_leaves_nothing_older_than_window() {
        let ingest = ingest(600);
        for minutes in 0..20 {
            ingest
                .record(sample("u", t0() + TimeDelta::minutes(minutes)), t0() + TimeDelta::minutes(20))
                .unwrap();
        }

        let now = t0() + TimeDelta::minutes(20);
        let removed = ingest.evict_expired(now);
        assert_eq!(removed, 10);

        let cutoff = now - TimeDelta::minutes(10);
        let snapshot = ingest.snapshot(now);
        for samples in snapshot.values() {
            assert!(samples.iter().all(|s| s.timestamp >= cutoff));
        }
        assert_eq!(ingest.len(), 10);
    }

    #[test]
    fn reads_evict_lazily() {
        let ingest = ingest(600);
        let cell = ingest.record(sample("u1", t0()), t0()).unwrap();
        assert_eq!(ingest.samples_in_cell(cell, t0()).len(), 1);

        let later = t0() + TimeDelta::minutes(11);
        assert!(ingest.samples_in_cell(cell, later).is_empty());
        assert!(ingest.is_empty());
    }

    #[test]
    fn sample_exactly_at_cutoff_is_retained() {
        let ingest = ingest(600);
        ingest.record(sample("u1", t0()), t0()).unwrap();
        assert_eq!(ingest.evict_expired(t0() + TimeDelta::minutes(10)), 0);
        assert_eq!(ingest.evict_expired(t0() + TimeDelta::seconds(601)), 1);
    }

    #[test]
    fn rejects_future_samples_beyond_skew() {
        let ingest = ingest(600);
        let ok = sample("u1", t0() + TimeDelta::seconds(30));
        assert!(ingest.record(ok, t0()).is_ok());

        let too_far = sample("u1", t0() + TimeDelta::seconds(31));
        assert!(matches!(
            ingest.record(too_far, t0()),
            Err(IngestError::InvalidSample { .. })
        ));
        assert_eq!(ingest.len(), 1);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let ingest = ingest(600);
        let bad = PositionSample::new("u1", 123.0, 77.0, t0());
        assert!(matches!(
            ingest.record(bad, t0()),
            Err(IngestError::InvalidSample { .. })
        ));
        let bad = PositionSample::new("u1", 23.0, 190.0, t0());
        assert!(ingest.record(bad, t0()).is_err());
        let blank = PositionSample::new("  ", 23.0, 77.0, t0());
        assert!(ingest.record(blank, t0()).is_err());
        let bad_aqi = sample("u1", t0()).with_aqi(-5.0);
        assert!(ingest.record(bad_aqi, t0()).is_err());
        assert!(ingest.is_empty());
    }

    #[test]
    fn batch_keeps_valid_samples() {
        let ingest = ingest(600);
        let results = ingest.record_batch(
            vec![
                sample("u1", t0()),
                PositionSample::new("u2", 99.0, 77.0, t0()),
                sample("u3", t0()),
            ],
            t0(),
        );
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
        assert_eq!(ingest.len(), 2);
    }

    #[test]
    fn capacity_drops_oldest_first() {
        let ingest = LocationIngest::new(WindowConfig {
            window_seconds: 3600,
            max_samples: 3,
            ..WindowConfig::default()
        })
        .unwrap();
        let now = t0() + TimeDelta::minutes(10);
        for minutes in 0..5 {
            ingest
                .record(sample(&format!("u{minutes}"), t0() + TimeDelta::minutes(minutes)), now)
                .unwrap();
        }
        assert_eq!(ingest.len(), 3);
        let oldest = ingest
            .snapshot(now)
            .values()
            .flatten()
            .map(|s| s.timestamp)
            .min()
            .unwrap();
        assert_eq!(oldest, t0() + TimeDelta::minutes(2));
    }

    #[test]
    fn oversized_batch_keeps_only_the_newest() {
        let ingest = LocationIngest::new(WindowConfig {
            window_seconds: 86_400,
            max_samples: 10_000,
            ..WindowConfig::default()
        })
        .unwrap();
        let now = t0() + TimeDelta::seconds(40_000);
        let batch: Vec<_> = (0..40_000_i64)
            .map(|i| {
                // Spread over a handful of cells so trimming crosses cells.
                #[allow(clippy::cast_precision_loss)]
                let offset = (i % 7) as f64 * 0.01;
                PositionSample::new(
                    format!("u{i}"),
                    23.2500 + offset,
                    77.4000,
                    t0() + TimeDelta::seconds(i),
                )
            })
            .collect();

        let results = ingest.record_batch(batch, now);
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(ingest.len(), 10_000);

        let snapshot = ingest.snapshot(now);
        let retained: Vec<_> = snapshot.values().flatten().map(|s| s.timestamp).collect();
        assert_eq!(retained.len(), 10_000);
        assert_eq!(
            retained.iter().min().copied(),
            Some(t0() + TimeDelta::seconds(30_000))
        );
        assert!(snapshot.values().all(|samples| !samples.is_empty()));
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let ingest = Arc::new(ingest(3600));
        std::thread::scope(|scope| {
            for worker in 0..8 {
                let ingest = Arc::clone(&ingest);
                scope.spawn(move || {
                    for i in 0..100 {
                        ingest
                            .record(sample(&format!("w{worker}-{i}"), t0()), t0())
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(ingest.len(), 800);
        let total: usize = ingest.snapshot(t0()).values().map(Vec::len).sum();
        assert_eq!(total, 800);
    }

    #[test]
    fn rejects_zero_window() {
        assert!(matches!(
            LocationIngest::new(WindowConfig {
                window_seconds: 0,
                ..WindowConfig::default()
            }),
            Err(IngestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn clear_empties_window() {
        let ingest = ingest(600);
        ingest.record(sample("u1", t0()), t0()).unwrap();
        ingest.clear();
        assert!(ingest.is_empty());
    }
}
