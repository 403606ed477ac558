use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pipeline::MapperStats;
use crate::scheduler::RepaintState;
use crate::types::current_timestamp;

/// Periodic snapshot of a running session, written as JSON for dashboards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub uptime_seconds: u64,
    pub accel_samples: u64,
    pub gyro_samples: u64,
    pub location_ticks: u64,
    pub points_stored: u64,
    pub inaccurate_fixes: u64,
    pub below_threshold: u64,
    pub last_score: f64,
    // Store and render
    pub store_len: usize,
    pub store_capacity: usize,
    pub repaint_pending: bool,
    pub frames_rendered: u64,
    pub last_frame_visible: usize,
    pub last_frame_commands: usize,
    // Sensors
    pub accel_available: bool,
    pub gyro_available: bool,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            uptime_seconds: 0,
            accel_samples: 0,
            gyro_samples: 0,
            location_ticks: 0,
            points_stored: 0,
            inaccurate_fixes: 0,
            below_threshold: 0,
            last_score: 0.0,
            store_len: 0,
            store_capacity: 0,
            repaint_pending: false,
            frames_rendered: 0,
            last_frame_visible: 0,
            last_frame_commands: 0,
            accel_available: false,
            gyro_available: false,
        }
    }

    pub fn apply_stats(&mut self, stats: &MapperStats) {
        self.accel_samples = stats.accel_samples;
        self.gyro_samples = stats.gyro_samples;
        self.location_ticks = stats.location_ticks;
        self.points_stored = stats.points_stored;
        self.inaccurate_fixes = stats.inaccurate_fixes;
        self.below_threshold = stats.below_threshold;
        self.last_score = stats.last_score;
    }

    pub fn set_repaint_state(&mut self, state: RepaintState) {
        self.repaint_pending = state == RepaintState::PendingRepaint;
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_stats() {
        let stats = MapperStats {
            accel_samples: 120,
            gyro_samples: 118,
            location_ticks: 4,
            points_stored: 2,
            inaccurate_fixes: 1,
            below_threshold: 1,
            last_score: 1.75,
        };
        let mut status = LiveStatus::new();
        status.apply_stats(&stats);
        status.set_repaint_state(RepaintState::PendingRepaint);

        assert_eq!(status.points_stored, 2);
        assert_eq!(status.last_score, 1.75);
        assert!(status.repaint_pending);
    }

    #[test]
    fn test_save_writes_json() {
        let path = std::env::temp_dir().join(format!(
            "bump_live_status_{}.json",
            std::process::id()
        ));
        let mut status = LiveStatus::new();
        status.store_len = 42;
        status.save(&path).unwrap();

        let loaded: LiveStatus =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.store_len, 42);
        let _ = fs::remove_file(&path);
    }
}
