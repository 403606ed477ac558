//! End-to-end bump mapping: samples → accumulator → store → repaint → render.

use geo::Rect;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::accumulator::{BumpAccumulator, TickOutcome};
use crate::config::BumpConfig;
use crate::error::BumpResult;
use crate::heatmap::{render, HeatmapFrame, Projection};
use crate::scheduler::{Timer, UpdateScheduler};
use crate::store::GeoTaggedPointStore;
use crate::types::{LocationFix, SensorSample, WeightedGeoPoint};

/// Counters kept across a mapping session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MapperStats {
    pub accel_samples: u64,
    pub gyro_samples: u64,
    pub location_ticks: u64,
    pub points_stored: u64,
    pub inaccurate_fixes: u64,
    pub below_threshold: u64,
    /// Score flushed on the most recent tick, whatever became of it.
    pub last_score: f64,
}

/// Result of one location tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// Set when this tick stored the first point of the session, so the host
    /// can move the camera there.
    pub first_point: bool,
}

impl TickReport {
    pub fn stored_point(&self) -> Option<&WeightedGeoPoint> {
        match &self.outcome {
            TickOutcome::Bump(point) => Some(point),
            _ => None,
        }
    }
}

pub struct BumpMapper {
    config: BumpConfig,
    accumulator: BumpAccumulator,
    store: Arc<GeoTaggedPointStore>,
    scheduler: UpdateScheduler,
    stats: Mutex<MapperStats>,
}

impl BumpMapper {
    /// `repaint` runs once per debounce window after the store changes.
    pub fn new<F>(config: BumpConfig, timer: Arc<dyn Timer>, repaint: F) -> BumpResult<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        config.validate()?;
        let store = Arc::new(GeoTaggedPointStore::new(config.capacity)?);
        let scheduler = UpdateScheduler::new(config.debounce(), timer, repaint);
        Ok(Self {
            accumulator: BumpAccumulator::new(config.filter.clone(), config.tick.clone()),
            store,
            scheduler,
            stats: Mutex::new(MapperStats::default()),
            config,
        })
    }

    fn stats_lock(&self) -> MutexGuard<'_, MapperStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &BumpConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<GeoTaggedPointStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    pub fn accumulator(&self) -> &BumpAccumulator {
        &self.accumulator
    }

    pub fn stats(&self) -> MapperStats {
        self.stats_lock().clone()
    }

    pub fn on_sample(&self, sample: &SensorSample) {
        self.accumulator.accumulate(sample);
        let mut stats = self.stats_lock();
        match sample {
            SensorSample::Accel(_) => stats.accel_samples += 1,
            SensorSample::Gyro(_) => stats.gyro_samples += 1,
        }
    }

    pub fn on_location(&self, fix: &LocationFix) -> TickReport {
        let outcome = self.accumulator.on_location_tick(fix);
        let mut first_point = false;

        {
            let mut stats = self.stats_lock();
            stats.location_ticks += 1;
            match &outcome {
                TickOutcome::Inaccurate {
                    accuracy,
                    discarded_score,
                } => {
                    stats.inaccurate_fixes += 1;
                    stats.last_score = *discarded_score;
                    warn!(
                        "location accuracy {:.1} above {:.1}, dropping score {:.3}",
                        accuracy, self.config.tick.accuracy_threshold, discarded_score
                    );
                }
                TickOutcome::BelowThreshold { score } => {
                    stats.below_threshold += 1;
                    stats.last_score = *score;
                    debug!("score {:.3} below bump threshold", score);
                }
                TickOutcome::Bump(point) => {
                    first_point = stats.points_stored == 0;
                    stats.points_stored += 1;
                    stats.last_score = point.weight;
                    info!(
                        "bump {:.3} at ({:.6}, {:.6})",
                        point.weight, point.latitude, point.longitude
                    );
                }
            }
        }

        if let TickOutcome::Bump(point) = &outcome {
            self.store.add(*point);
            self.scheduler.notify();
        }

        TickReport {
            outcome,
            first_point,
        }
    }

    /// Swap the store content for previously recorded points.
    pub fn replace<I>(&self, points: I)
    where
        I: IntoIterator<Item = WeightedGeoPoint>,
    {
        self.store.replace(points);
        info!("store replaced, {} point(s)", self.store.len());
        self.scheduler.notify();
    }

    pub fn clear(&self) {
        self.store.clear();
        self.scheduler.notify();
    }

    /// Cancel a pending repaint, e.g. when the host view goes away.
    pub fn pause(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn render<P>(&self, viewport: &Rect<f64>, projection: &P) -> HeatmapFrame
    where
        P: Projection + ?Sized,
    {
        render(
            &self.store.snapshot(),
            viewport,
            projection,
            &self.config.heatmap,
        )
    }
}
