//! Error types for the data-preparation stages.

use thiserror::Error;

/// Column layout problems. Always fatal for the stage that raises them.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// One or more expected source columns are absent from the input table.
    #[error("missing expected column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// An input to the combiner does not share the first input's column set.
    #[error(
        "input #{index} does not match the first input's columns (missing: [{}], unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    SchemaMismatch {
        index: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Inputs disagree on a column's dtype in a way that cannot be widened.
    #[error("column '{column}' has incompatible types across inputs: {}", .dtypes.join(", "))]
    DtypeMismatch { column: String, dtypes: Vec<String> },

    /// The combiner was called without any tables.
    #[error("no input tables to combine")]
    NoInputs,

    /// Two column specs would produce the same output column.
    #[error("duplicate output column '{0}' in survey schema")]
    DuplicateOutput(String),
}

/// Failures while discretizing a value.
#[derive(Debug, Error, PartialEq)]
pub enum BinningError {
    #[error("value {value} in column '{column}' is outside the binning domain [{min}, {max}]")]
    OutOfRange {
        column: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("column '{column}' must be 0/1, found {value} at row {row}")]
    NotBinary {
        column: String,
        value: f64,
        row: usize,
    },

    #[error("bin edges for '{0}' must be finite and strictly increasing")]
    InvalidEdges(String),
}

/// Failures while reading or rewriting the outcome label.
#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    #[error("label column '{column}' has unexpected value {value} at row {row}")]
    UnknownCode {
        column: String,
        value: f64,
        row: usize,
    },

    #[error("label column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },
}
