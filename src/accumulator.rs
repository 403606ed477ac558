use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::filters::{FilterConfig, SensorFusionFilter};
use crate::types::{LocationFix, SensorSample, WeightedGeoPoint};

/// Per-tick gating applied when the location collaborator delivers a fix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Fixes with accuracy worse (larger) than this are discarded.
    pub accuracy_threshold: f64,
    /// Scores must be strictly above this to become a point.
    pub bump_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold: 20.0,
            bump_threshold: 0.1,
        }
    }
}

/// What happened to the score flushed on one location tick.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// The fix was too inaccurate; the interval's score was dropped.
    Inaccurate { accuracy: f64, discarded_score: f64 },
    /// The score did not exceed the bump threshold.
    BelowThreshold { score: f64 },
    /// The score qualifies and should be stored at the fix location.
    Bump(WeightedGeoPoint),
}

/// Owns the fusion filter and its running score between location ticks.
///
/// All methods take `&self`: the filter sits behind a mutex so sensor
/// callbacks on one thread and location ticks on another never interleave
/// inside a flush.
pub struct BumpAccumulator {
    filter: Mutex<SensorFusionFilter>,
    tick: TickConfig,
}

impl BumpAccumulator {
    pub fn new(filter: FilterConfig, tick: TickConfig) -> Self {
        Self {
            filter: Mutex::new(SensorFusionFilter::new(filter)),
            tick,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SensorFusionFilter> {
        self.filter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn accumulate(&self, sample: &SensorSample) {
        self.lock().on_sample(sample);
    }

    /// Return the score accumulated since the previous flush and reset it to zero.
    pub fn flush(&self) -> f64 {
        self.lock().take_score()
    }

    /// Score accumulated so far in the current interval.
    pub fn pending_score(&self) -> f64 {
        self.lock().running_score()
    }

    pub fn gravity(&self) -> Vector3<f32> {
        self.lock().gravity()
    }

    pub fn tick_config(&self) -> &TickConfig {
        &self.tick
    }

    /// Flush on a location tick and classify the score against the fix.
    ///
    /// The score is always reset, whatever the outcome.
    pub fn on_location_tick(&self, fix: &LocationFix) -> TickOutcome {
        let score = self.flush();

        // NaN accuracy counts as unacceptable
        if !(fix.accuracy <= self.tick.accuracy_threshold) {
            return TickOutcome::Inaccurate {
                accuracy: fix.accuracy,
                discarded_score: score,
            };
        }

        if score > self.tick.bump_threshold {
            TickOutcome::Bump(WeightedGeoPoint::new(fix.latitude, fix.longitude, score))
        } else {
            TickOutcome::BelowThreshold { score }
        }
    }
}

impl Default for BumpAccumulator {
    fn default() -> Self {
        Self::new(FilterConfig::default(), TickConfig::default())
    }
}
