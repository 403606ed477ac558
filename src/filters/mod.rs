pub mod bump;

pub use bump::{FilterConfig, FilterState, SensorFusionFilter};
