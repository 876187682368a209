//! Missing value analysis
//!
//! Survey answers that were blank, non-numeric or a sentinel code end up as
//! nulls after cleaning. These helpers report how many there are per column
//! and which rows are complete.

use anyhow::Result;
use polars::prelude::*;

/// Missing ratio per column, sorted descending.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Null count per column, in column order.
pub fn count_missing_values(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count()))
        .collect()
}

/// Columns whose missing ratio exceeds `threshold`.
pub fn get_features_above_threshold(missing_ratios: &[(String, f64)], threshold: f64) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(_, ratio)| *ratio > threshold)
        .map(|(name, _)| name.clone())
        .collect()
}

/// `true` for every row where all columns hold a value.
pub fn complete_rows(columns: &[Vec<Option<f64>>]) -> Vec<bool> {
    let rows = columns.first().map(Vec::len).unwrap_or(0);
    (0..rows)
        .map(|i| columns.iter().all(|col| col[i].is_some()))
        .collect()
}
