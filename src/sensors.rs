//! Sensor listener and synthetic sample sources.
//!
//! The listener owns one sampling task per available motion sensor and
//! forwards samples on a single channel. `start` and `stop` are idempotent.
//! Real hardware acquisition lives with the host; the sources here generate
//! a drive over mostly smooth road with periodic potholes, for the demo
//! binary and for tests.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::error::{BumpError, BumpResult};
use crate::types::{current_timestamp, AccelData, GyroData, LocationFix, SensorSample};

/// ~50 Hz, the rate Android delivers for game-speed sensor listeners.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(20);

/// Seconds between synthetic potholes.
const POTHOLE_PERIOD: f64 = 7.0;
/// Seconds a synthetic pothole lasts.
const POTHOLE_LENGTH: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAvailability {
    pub accelerometer: bool,
    pub gyroscope: bool,
}

impl SensorAvailability {
    pub fn all() -> Self {
        Self {
            accelerometer: true,
            gyroscope: true,
        }
    }

    pub fn any(&self) -> bool {
        self.accelerometer || self.gyroscope
    }
}

pub struct SensorListener {
    availability: SensorAvailability,
    period: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl SensorListener {
    pub fn new(availability: SensorAvailability, period: Duration) -> Self {
        Self {
            availability,
            period,
            tasks: Vec::new(),
        }
    }

    pub fn availability(&self) -> SensorAvailability {
        self.availability
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Begin sampling every available sensor into `tx`.
    ///
    /// Calling `start` while running is a no-op. Fails with
    /// [`BumpError::NoSensors`] when neither sensor exists, in which case the
    /// host should tell the user the feature is unavailable. Must be called
    /// inside a tokio runtime.
    pub fn start(&mut self, tx: Sender<SensorSample>) -> BumpResult<SensorAvailability> {
        if self.is_running() {
            debug!("sensor listener already running");
            return Ok(self.availability);
        }
        if !self.availability.any() {
            warn!("no accelerometer or gyroscope available, bump detection disabled");
            return Err(BumpError::NoSensors);
        }

        if self.availability.accelerometer {
            self.tasks
                .push(tokio::spawn(accel_loop(tx.clone(), self.period)));
            info!("accelerometer listener registered ({:?})", self.period);
        } else {
            warn!("accelerometer unavailable");
        }

        if self.availability.gyroscope {
            self.tasks.push(tokio::spawn(gyro_loop(tx, self.period)));
            info!("gyroscope listener registered ({:?})", self.period);
        } else {
            warn!("gyroscope unavailable");
        }

        Ok(self.availability)
    }

    /// Stop all sampling tasks. Calling `stop` while stopped is a no-op.
    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("sensor listeners unregistered");
    }
}

impl Drop for SensorListener {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accel_loop(tx: Sender<SensorSample>, period: Duration) {
    let mut ticker = interval(period);
    let start = current_timestamp();
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;
        let sample = synthetic_accel(current_timestamp() - start);

        match tx.try_send(SensorSample::Accel(sample)) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 500 == 0 {
                    debug!("[accel] {} samples", sample_count);
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!("[accel] channel closed after {} samples", sample_count);
                break;
            }
            Err(TrySendError::Full(_)) => {
                // Consumer is behind, drop this sample
            }
        }
    }
}

async fn gyro_loop(tx: Sender<SensorSample>, period: Duration) {
    let mut ticker = interval(period);
    let start = current_timestamp();
    let mut sample_count = 0u64;

    loop {
        ticker.tick().await;
        let sample = synthetic_gyro(current_timestamp() - start);

        match tx.try_send(SensorSample::Gyro(sample)) {
            Ok(_) => {
                sample_count += 1;
                if sample_count % 500 == 0 {
                    debug!("[gyro] {} samples", sample_count);
                }
            }
            Err(TrySendError::Closed(_)) => {
                debug!("[gyro] channel closed after {} samples", sample_count);
                break;
            }
            Err(TrySendError::Full(_)) => {}
        }
    }
}

/// Emit a synthetic location fix every `period`, walking away from `origin`.
pub async fn location_loop(tx: Sender<LocationFix>, period: Duration, origin: (f64, f64)) {
    let mut ticker = interval(period);
    // First tick of a tokio interval completes immediately
    ticker.tick().await;
    let mut seq = 0u64;

    loop {
        ticker.tick().await;
        seq += 1;

        match tx.try_send(synthetic_fix(seq, origin)) {
            Ok(_) => debug!("[location] fix {}", seq),
            Err(TrySendError::Closed(_)) => {
                debug!("[location] channel closed after {} fixes", seq);
                break;
            }
            Err(TrySendError::Full(_)) => {}
        }
    }
}

/// 0 on smooth road, rising to 1 and back over a pothole.
pub fn pothole_envelope(t: f64) -> f64 {
    let phase = t.rem_euclid(POTHOLE_PERIOD);
    if phase < POTHOLE_LENGTH {
        (PI * phase / POTHOLE_LENGTH).sin()
    } else {
        0.0
    }
}

/// Accelerometer reading `t` seconds into the synthetic drive.
pub fn synthetic_accel(t: f64) -> AccelData {
    let bump = pothole_envelope(t);
    let x = 0.15 * (2.0 * PI * 3.1 * t).sin() + bump * 0.8 * (2.0 * PI * 11.0 * t).sin();
    let y = 0.10 * (2.0 * PI * 2.3 * t).cos() + bump * 0.6 * (2.0 * PI * 9.0 * t).cos();
    let z = 9.81 + 0.2 * (2.0 * PI * 5.0 * t).sin() + bump * 4.0 * (2.0 * PI * 8.0 * t).sin();
    AccelData::new(x as f32, y as f32, z as f32, current_timestamp())
}

/// Gyroscope reading `t` seconds into the synthetic drive.
pub fn synthetic_gyro(t: f64) -> GyroData {
    let bump = pothole_envelope(t);
    let x = 0.02 * (0.5 * t).sin() + bump * 0.9 * (2.0 * PI * 6.0 * t).sin();
    let y = 0.03 * (0.3 * t).cos() + bump * 0.5 * (2.0 * PI * 7.0 * t).cos();
    let z = 0.05 * (1.0 * t).sin();
    GyroData::new(x as f32, y as f32, z as f32, current_timestamp())
}

/// The `seq`-th synthetic fix; every eleventh fix has poor accuracy.
pub fn synthetic_fix(seq: u64, origin: (f64, f64)) -> LocationFix {
    let s = seq as f64;
    let latitude = origin.0 + s * 0.00002;
    let longitude = origin.1 + s * 0.00003 + 0.0001 * (s * 0.05).sin();
    let accuracy = if seq % 11 == 10 {
        35.0
    } else {
        5.0 + 3.0 * (s * 0.1).sin().abs()
    };
    LocationFix::new(latitude, longitude, accuracy, current_timestamp())
}
