pub mod config;
pub use config::{BucketingConfig, Config, ExportConfig, QueryConfig, RenderConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeatmapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("invalid range in sample {sample}, observation {observation}: [{low}, {high}]")]
    InvalidRange {
        sample: usize,
        observation: usize,
        low: i64,
        high: i64,
    },
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("deduction underflow at sample {sample}, bucket {bucket}: {total} < {deduct}")]
    DeductionUnderflow {
        sample: usize,
        bucket: usize,
        total: f64,
        deduct: f64,
    },
    #[error("{component} out of range: {value}")]
    Domain { component: &'static str, value: f64 },
    #[error("config error: {0}")]
    Config(String),
}

impl HeatmapError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { field, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, HeatmapError>;
