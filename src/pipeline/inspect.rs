//! Per-column profiles for eyeballing a table before training

use std::collections::BTreeSet;

use anyhow::Result;
use polars::prelude::*;

use super::loader::column_as_f64;

/// Summary of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub nulls: usize,
    /// Number of distinct non-null values
    pub n_unique: usize,
    /// Sorted distinct values, cut at the display limit
    pub unique: Vec<String>,
    pub stats: Option<NumericStats>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn numeric_profile(df: &DataFrame, name: &str, limit: usize) -> Result<(usize, Vec<String>, Option<NumericStats>)> {
    let mut values: Vec<f64> = column_as_f64(df, name)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Ok((0, Vec::new(), None));
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.sort_by(f64::total_cmp);
    let stats = NumericStats {
        min: values[0],
        max: values[values.len() - 1],
        mean,
    };

    values.dedup();
    let unique = values.iter().take(limit).map(|v| v.to_string()).collect();
    Ok((values.len(), unique, Some(stats)))
}

fn text_profile(column: &Column, limit: usize) -> Result<(usize, Vec<String>)> {
    let text = column.cast(&DataType::String)?;
    let distinct: BTreeSet<String> = text
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    let n_unique = distinct.len();
    Ok((n_unique, distinct.into_iter().take(limit).collect()))
}

/// Profile every column of `df`, listing at most `limit` unique values each.
pub fn profile_columns(df: &DataFrame, limit: usize) -> Result<Vec<ColumnProfile>> {
    df.get_columns()
        .iter()
        .map(|column| {
            let name = column.name().to_string();
            let dtype = column.dtype();
            let (n_unique, unique, stats) = if is_numeric(dtype) {
                numeric_profile(df, &name, limit)?
            } else {
                let (n, u) = text_profile(column, limit)?;
                (n, u, None)
            };
            Ok(ColumnProfile {
                dtype: dtype.to_string(),
                nulls: column.null_count(),
                name,
                n_unique,
                unique,
                stats,
            })
        })
        .collect()
}
