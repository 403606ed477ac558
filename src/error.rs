use std::path::PathBuf;
use thiserror::Error;

/// Bump heatmap error types
#[derive(Error, Debug)]
pub enum BumpError {
    #[error("No motion sensors available (accelerometer and gyroscope both missing)")]
    NoSensors,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type BumpResult<T> = Result<T, BumpError>;
