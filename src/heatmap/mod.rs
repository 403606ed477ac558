pub mod projection;
pub mod ramp;
pub mod render;

pub use projection::{Projection, WebMercatorProjection};
pub use ramp::{ColorRamp, GradientStop, Rgba};
pub use render::{render, DrawCommand, HeatmapFrame, RenderConfig, WeightRange};
