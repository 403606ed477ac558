use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::accumulator::TickConfig;
use crate::error::{BumpError, BumpResult};
use crate::filters::FilterConfig;
use crate::heatmap::RenderConfig;
use crate::store::DEFAULT_CAPACITY;

/// Complete tuning for one bump mapping session.
///
/// Every field has a default, so a JSON file only needs the values it changes:
///
/// ```json
/// { "capacity": 2000, "heatmap": { "radius": 60.0 } }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BumpConfig {
    pub filter: FilterConfig,
    pub tick: TickConfig,
    /// Maximum number of points kept in the store.
    pub capacity: usize,
    pub heatmap: RenderConfig,
    /// Repaint debounce after a store mutation, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            tick: TickConfig::default(),
            capacity: DEFAULT_CAPACITY,
            heatmap: RenderConfig::default(),
            debounce_ms: 200,
        }
    }
}

impl BumpConfig {
    pub fn from_json_str(json: &str) -> BumpResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> BumpResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| BumpError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self) -> BumpResult<()> {
        if self.capacity == 0 {
            return Err(BumpError::InvalidConfig(
                "store capacity must be at least 1".to_string(),
            ));
        }

        let alpha = self.filter.gravity_alpha;
        if !(0.0..1.0).contains(&alpha) {
            return Err(BumpError::InvalidConfig(format!(
                "gravity_alpha must be within [0, 1), got {}",
                alpha
            )));
        }

        check_non_negative("gyro_weight", self.filter.gyro_weight)?;
        check_non_negative("accuracy_threshold", self.tick.accuracy_threshold)?;
        check_non_negative("bump_threshold", self.tick.bump_threshold)?;

        self.heatmap.validate()
    }
}

fn check_non_negative(name: &str, value: f64) -> BumpResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BumpError::InvalidConfig(format!(
            "{} must be finite and non-negative, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BumpConfig::default();
        assert_eq!(config.filter.gravity_alpha, 0.8);
        assert_eq!(config.filter.gyro_weight, 0.3);
        assert_eq!(config.tick.accuracy_threshold, 20.0);
        assert_eq!(config.tick.bump_threshold, 0.1);
        assert_eq!(config.capacity, 5000);
        assert_eq!(config.heatmap.radius, 80.0);
        assert_eq!(config.heatmap.render_budget, 500);
        assert_eq!(config.debounce(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            BumpConfig::from_json_str(r#"{ "capacity": 2000, "heatmap": { "radius": 60.0 } }"#)
                .unwrap();
        assert_eq!(config.capacity, 2000);
        assert_eq!(config.heatmap.radius, 60.0);
        assert_eq!(config.heatmap.opacity, 0.6);
        assert_eq!(config.heatmap.ramp.stops().len(), 5);
        assert_eq!(config.tick, TickConfig::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            BumpConfig::from_json_str(r#"{ "capacity": 0 }"#),
            Err(BumpError::InvalidConfig(_))
        ));
        assert!(BumpConfig::from_json_str(r#"{ "filter": { "gravity_alpha": 1.0 } }"#).is_err());
        assert!(BumpConfig::from_json_str(r#"{ "tick": { "bump_threshold": -0.1 } }"#).is_err());
        assert!(BumpConfig::from_json_str(r#"{ "heatmap": { "opacity": 2.0 } }"#).is_err());
        assert!(BumpConfig::from_json_str(r#"{ "heatmap": { "ramp": [] } }"#).is_err());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            BumpConfig::from_json_str("{ capacity: "),
            Err(BumpError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = BumpConfig::from_json_file("/nonexistent/bump.json").unwrap_err();
        match err {
            BumpError::ConfigIo { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/bump.json"))
            }
            other => panic!("expected ConfigIo, got {:?}", other),
        }
    }
}
