//! Error types for training and inference.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("training data is empty")]
    EmptyData,

    #[error("feature matrix has {rows} rows but {labels} labels were given")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("matrix data has {len} values, expected {rows} x {cols}")]
    ShapeMismatch { len: usize, rows: usize, cols: usize },

    #[error("need at least two classes to train, found {0}")]
    SingleClass(usize),

    #[error("expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("model has not been fitted")]
    NotFitted,

    #[error("invalid hyperparameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("cannot build {folds} folds from {rows} rows")]
    TooFewRows { folds: usize, rows: usize },

    #[error("label values {0:?} are neither binary (0/1) nor heart-disease codes (1-4)")]
    UnsupportedLabels(Vec<i64>),

    #[error("artifact format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("hyperparameter grid for {0} is empty")]
    EmptyGrid(String),

    #[error("cross-validation failed: {0}")]
    CrossValidation(String),
}
