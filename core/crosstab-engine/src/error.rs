//! FILENAME: core/crosstab-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrossTabError {
    #[error("{axis} axis has {filters} filters but {vectors} bit vectors")]
    AxisLengthMismatch {
        axis: &'static str,
        filters: usize,
        vectors: usize,
    },

    #[error("background worker failed: {0}")]
    Worker(String),

    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type CrossTabResult<T> = Result<T, CrossTabError>;
