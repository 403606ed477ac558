//! Road bump heatmap: fuses accelerometer and gyroscope readings into a
//! vibration score, tags it with location fixes, keeps the most recent
//! points in a bounded store and renders them as a viewport-culled heatmap.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod filters;
pub mod heatmap;
pub mod live_status;
pub mod pipeline;
#[cfg(feature = "rerun")]
pub mod rerun_logger;
pub mod scheduler;
pub mod sensors;
pub mod store;
pub mod types;

pub use accumulator::{BumpAccumulator, TickConfig, TickOutcome};
pub use config::BumpConfig;
pub use error::{BumpError, BumpResult};
pub use filters::{FilterConfig, SensorFusionFilter};
pub use heatmap::{
    render, ColorRamp, DrawCommand, HeatmapFrame, Projection, RenderConfig, WebMercatorProjection,
};
pub use pipeline::{BumpMapper, MapperStats, TickReport};
pub use scheduler::{RepaintState, Timer, TimerHandle, TokioTimer, UpdateScheduler};
pub use store::{GeoTaggedPointStore, PointSnapshot};
pub use types::{AccelData, GyroData, LocationFix, SensorSample, WeightedGeoPoint};
