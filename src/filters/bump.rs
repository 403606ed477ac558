use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::types::SensorSample;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Low-pass coefficient for the gravity estimate (0.8 = 80% previous estimate).
    pub gravity_alpha: f32,
    /// Scale applied to the gyroscope magnitude before it joins the score.
    pub gyro_weight: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            gravity_alpha: 0.8,
            gyro_weight: 0.3,
        }
    }
}

/// Gravity estimate plus the score accumulated since the last flush.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterState {
    pub gravity: Vector3<f32>,
    pub running_score: f64,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            gravity: Vector3::zeros(),
            running_score: 0.0,
        }
    }
}

/// Low-pass gravity separation feeding a running vibration score.
///
/// Each accelerometer sample updates the gravity estimate per axis with
/// `g' = α·g + (1-α)·raw`, and the magnitude of `raw - g'` is added to the
/// score. Each gyroscope sample adds `|ω|·gyro_weight`. Either sensor may be
/// absent; its contribution is then simply never added.
///
/// The gravity estimate starts at zero, so the first samples after
/// construction overestimate linear acceleration until it converges.
pub struct SensorFusionFilter {
    config: FilterConfig,
    state: FilterState,
}

impl SensorFusionFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            state: FilterState::default(),
        }
    }

    /// Feed one accelerometer sample, returning the score it contributed.
    pub fn on_accelerometer(&mut self, x: f32, y: f32, z: f32) -> f64 {
        let alpha = self.config.gravity_alpha;
        let raw = Vector3::new(x, y, z);

        self.state.gravity = self.state.gravity * alpha + raw * (1.0 - alpha);
        let linear = raw - self.state.gravity;

        let contribution = linear.norm() as f64;
        self.state.running_score += contribution;
        contribution
    }

    /// Feed one gyroscope sample, returning the score it contributed.
    pub fn on_gyroscope(&mut self, x: f32, y: f32, z: f32) -> f64 {
        let angular = Vector3::new(x, y, z).norm() as f64;
        let contribution = angular * self.config.gyro_weight;
        self.state.running_score += contribution;
        contribution
    }

    pub fn on_sample(&mut self, sample: &SensorSample) -> f64 {
        match sample {
            SensorSample::Accel(a) => self.on_accelerometer(a.x, a.y, a.z),
            SensorSample::Gyro(g) => self.on_gyroscope(g.x, g.y, g.z),
        }
    }

    pub fn running_score(&self) -> f64 {
        self.state.running_score
    }

    /// Return the running score and zero it. The gravity estimate is kept.
    pub fn take_score(&mut self) -> f64 {
        std::mem::take(&mut self.state.running_score)
    }

    pub fn gravity(&self) -> Vector3<f32> {
        self.state.gravity
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gravity_converges_on_constant_input() {
        // Device at rest, gravity along z
        let mut filter = SensorFusionFilter::new(FilterConfig::default());
        for _ in 0..50 {
            filter.on_accelerometer(0.0, 0.0, 9.8);
        }

        let gravity = filter.gravity();
        assert!(gravity.x.abs() < 1e-6);
        assert!(gravity.y.abs() < 1e-6);
        // 9.8 * 0.8^50 ≈ 1.4e-4
        assert!((gravity.z - 9.8).abs() < 1e-3);

        filter.take_score();
        for _ in 0..10 {
            filter.on_accelerometer(0.0, 0.0, 9.8);
        }
        assert!(filter.running_score() < 1e-3);
    }

    #[test]
    fn test_convergence_is_geometric() {
        let mut filter = SensorFusionFilter::new(FilterConfig::default());
        let mut previous_error = 9.8_f32;
        for _ in 0..20 {
            filter.on_accelerometer(0.0, 0.0, 9.8);
            let error = 9.8 - filter.gravity().z;
            assert_relative_eq!(error, previous_error * 0.8, max_relative = 1e-3);
            previous_error = error;
        }
    }

    #[test]
    fn test_startup_transient_from_zero_gravity() {
        let mut filter = SensorFusionFilter::new(FilterConfig::default());
        // g' = 0.2 * raw, so linear = 0.8 * raw on the very first sample
        let first = filter.on_accelerometer(0.0, 0.0, 10.0);
        assert_relative_eq!(first, 8.0, epsilon = 1e-5);

        let second = filter.on_accelerometer(0.0, 0.0, 10.0);
        assert_relative_eq!(second, 6.4, epsilon = 1e-5);
    }

    #[test]
    fn test_gyro_contribution_is_weighted() {
        let mut filter = SensorFusionFilter::new(FilterConfig::default());
        let contribution = filter.on_gyroscope(3.0, 4.0, 0.0);
        assert_relative_eq!(contribution, 1.5, epsilon = 1e-9);
        assert_relative_eq!(filter.running_score(), 1.5, epsilon = 1e-9);
        // Gyro never touches the gravity estimate
        assert_eq!(filter.gravity(), Vector3::zeros());
    }

    #[test]
    fn test_take_score_keeps_gravity() {
        let mut filter = SensorFusionFilter::new(FilterConfig::default());
        filter.on_accelerometer(1.0, 2.0, 3.0);
        let gravity = filter.gravity();

        assert!(filter.take_score() > 0.0);
        assert_eq!(
            filter.state(),
            &FilterState {
                gravity,
                running_score: 0.0,
            }
        );
    }

    #[test]
    fn test_custom_gyro_weight() {
        let mut filter = SensorFusionFilter::new(FilterConfig {
            gyro_weight: 1.0,
            ..FilterConfig::default()
        });
        assert_eq!(filter.config().gyro_weight, 1.0);
        filter.on_gyroscope(0.0, 0.0, 2.0);
        assert_relative_eq!(filter.running_score(), 2.0, epsilon = 1e-9);
    }
}
