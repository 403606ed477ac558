//! Fixed-capacity, insertion-ordered store of weighted geo points.
//!
//! The store is shared between the location tick path (writer) and the
//! renderer (reader). Content lives in an `Arc<VecDeque<_>>` behind an
//! `RwLock`:
//!
//! - `snapshot()` clones the `Arc` and releases the lock immediately.
//! - Writers go through `Arc::make_mut`. While no snapshot is alive the
//!   deque is mutated in place; the first write after a snapshot copies it
//!   once, leaving the snapshot untouched.
//!
//! Eviction is strict FIFO: whenever a write leaves more than `capacity`
//! points, the oldest ones are dropped until exactly `capacity` remain.
//!
//! Every stored point has a finite, strictly positive weight. Points that
//! fail this on any insertion path are dropped with a warning.

use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{BumpError, BumpResult};
use crate::types::WeightedGeoPoint;

pub const DEFAULT_CAPACITY: usize = 5000;

type Points = VecDeque<WeightedGeoPoint>;

pub struct GeoTaggedPointStore {
    capacity: usize,
    points: RwLock<Arc<Points>>,
}

impl GeoTaggedPointStore {
    pub fn new(capacity: usize) -> BumpResult<Self> {
        if capacity == 0 {
            return Err(BumpError::InvalidConfig(
                "store capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            points: RwLock::new(Arc::new(VecDeque::with_capacity(capacity))),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn add(&self, point: WeightedGeoPoint) {
        if !admissible(&point) {
            return;
        }
        self.write(|points| points.push_back(point));
    }

    pub fn add_batch<I>(&self, batch: I)
    where
        I: IntoIterator<Item = WeightedGeoPoint>,
    {
        self.write(|points| points.extend(batch.into_iter().filter(|p| admissible(p))));
    }

    /// Swap the whole content for `batch`, keeping its newest `capacity` points.
    pub fn replace<I>(&self, batch: I)
    where
        I: IntoIterator<Item = WeightedGeoPoint>,
    {
        self.write(|points| {
            points.clear();
            points.extend(batch.into_iter().filter(|p| admissible(p)));
        });
    }

    pub fn clear(&self) {
        self.write(VecDeque::clear);
    }

    /// Immutable view of the current content.
    pub fn snapshot(&self) -> PointSnapshot {
        PointSnapshot {
            points: self.read(),
        }
    }

    fn read(&self) -> Arc<Points> {
        let guard = self.points.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    fn write<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Points),
    {
        let mut guard = self.points.write().unwrap_or_else(PoisonError::into_inner);
        let points = Arc::make_mut(&mut *guard);
        mutate(&mut *points);

        if points.len() > self.capacity {
            let excess = points.len() - self.capacity;
            points.drain(..excess);
            debug!("evicted {} oldest point(s), {} retained", excess, points.len());
        }
    }
}

fn admissible(point: &WeightedGeoPoint) -> bool {
    let ok = point.weight.is_finite() && point.weight > 0.0;
    if !ok {
        warn!(
            "dropping point with weight {} at ({:.6}, {:.6})",
            point.weight, point.latitude, point.longitude
        );
    }
    ok
}

impl Default for GeoTaggedPointStore {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            points: RwLock::new(Arc::new(VecDeque::with_capacity(DEFAULT_CAPACITY))),
        }
    }
}

/// Point-in-time view of a [`GeoTaggedPointStore`], oldest point first.
#[derive(Clone, Debug, Default)]
pub struct PointSnapshot {
    points: Arc<Points>,
}

impl PointSnapshot {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WeightedGeoPoint> {
        self.points.get(index)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &WeightedGeoPoint> + '_ {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<WeightedGeoPoint> {
        self.points.iter().copied().collect()
    }
}

impl From<Vec<WeightedGeoPoint>> for PointSnapshot {
    fn from(points: Vec<WeightedGeoPoint>) -> Self {
        Self {
            points: Arc::new(points.into()),
        }
    }
}
