use anyhow::Result;
use log::info;
use rerun::{archetypes::Scalar, RecordingStreamBuilder};

use crate::accumulator::TickOutcome;
use crate::heatmap::HeatmapFrame;
use crate::pipeline::TickReport;

/// Rerun recording of bump scores and heatmap frames for offline review.
/// Targets the Rerun v0.15 archetype API.
pub struct RerunLogger {
    rec: rerun::RecordingStream,
}

impl RerunLogger {
    /// Record to an `.rrd` file, e.g. "bump_sessions/bumps_20251122_120000.rrd".
    pub fn new(output_path: &str) -> Result<Self> {
        let rec = RecordingStreamBuilder::new("bump_heatmap")
            .save(output_path)
            .map_err(|e| anyhow::anyhow!("Failed to create Rerun recording: {}", e))?;

        info!("rerun recording initialized to {}", output_path);

        Ok(RerunLogger { rec })
    }

    /// Set the current time for all subsequent logs
    pub fn set_time(&self, elapsed_secs: f64) {
        self.rec.set_time_seconds("session_time", elapsed_secs);
    }

    pub fn log_scalar(&self, path: &str, value: f64) {
        let _ = self.rec.log(path, &Scalar::new(value));
    }

    /// Log the flushed score of a location tick under its outcome.
    pub fn log_tick(&self, report: &TickReport) {
        match &report.outcome {
            TickOutcome::Bump(point) => {
                self.log_scalar("bump/stored", point.weight);
                self.log_scalar("bump/location_lat", point.latitude);
                self.log_scalar("bump/location_lon", point.longitude);
            }
            TickOutcome::BelowThreshold { score } => {
                self.log_scalar("bump/below_threshold", *score);
            }
            TickOutcome::Inaccurate {
                accuracy,
                discarded_score,
            } => {
                self.log_scalar("bump/discarded", *discarded_score);
                self.log_scalar("location/accuracy", *accuracy);
            }
        }
    }

    pub fn log_frame(&self, frame: &HeatmapFrame, store_len: usize) {
        self.log_scalar("heatmap/store_len", store_len as f64);
        self.log_scalar("heatmap/visible", frame.visible as f64);
        self.log_scalar("heatmap/drawn", frame.len() as f64);
    }
}
