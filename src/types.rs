use serde::{Deserialize, Serialize};

/// Accelerometer sample in device-native units (m/s² on Android).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelData {
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AccelData {
    pub fn new(x: f32, y: f32, z: f32, timestamp: f64) -> Self {
        Self { timestamp, x, y, z }
    }
}

/// Gyroscope sample (angular velocity, rad/s).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GyroData {
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl GyroData {
    pub fn new(x: f32, y: f32, z: f32, timestamp: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A raw motion sample from either sensor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SensorSample {
    Accel(AccelData),
    Gyro(GyroData),
}

impl SensorSample {
    pub fn timestamp(&self) -> f64 {
        match self {
            SensorSample::Accel(a) => a.timestamp,
            SensorSample::Gyro(g) => g.timestamp,
        }
    }
}

/// Location fix delivered by the positioning collaborator.
///
/// `accuracy` is the horizontal accuracy radius in the provider's distance
/// units (meters for GNSS providers); larger is worse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub timestamp: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            accuracy,
        }
    }
}

/// A location tagged with the bump score accumulated while the device was there.
///
/// Weights are strictly positive: only scores above the bump threshold are
/// ever turned into points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedGeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub weight: f64,
}

impl WeightedGeoPoint {
    pub fn new(latitude: f64, longitude: f64, weight: f64) -> Self {
        Self {
            latitude,
            longitude,
            weight,
        }
    }
}

pub fn current_timestamp() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
