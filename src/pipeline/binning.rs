//! Feature binning
//!
//! Discretizes BMI and the two health day-counts into ordinal classes and
//! merges the fruit and vegetable flags into a single indicator.
//!
//! Every bin is the left-closed interval `[edge_i, edge_{i+1})`. The first bin
//! starts at the domain minimum and the last bin runs to the domain maximum,
//! inclusive when the maximum is finite.
//!
//! A value equal to an edge lands in the upper bin: BMI 25 is class 2, BMI 30
//! class 3, and 5 days is day-count class 1. Right-closed cuts would put each
//! of these one class lower.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{BinningError, SchemaError};
use super::loader::column_as_f64;

/// BMI breakpoints: underweight, healthy, overweight, obese.
pub const BMI_EDGES: [f64; 3] = [18.5, 25.0, 30.0];

/// Day-count breakpoints over the 0-30 day window.
pub const DAY_COUNT_EDGES: [f64; 5] = [5.0, 10.0, 15.0, 20.0, 25.0];

/// Ordered breakpoints over a closed domain.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalBins {
    edges: Vec<f64>,
    min: f64,
    max: f64,
}

impl IntervalBins {
    /// Validate edges against the domain `[min, max]`.
    pub fn new(name: &str, edges: Vec<f64>, min: f64, max: f64) -> Result<Self, BinningError> {
        let increasing = edges.windows(2).all(|w| w[0] < w[1]);
        let inside = edges.iter().all(|e| e.is_finite() && *e > min && *e <= max);
        if !increasing || !inside || min.is_nan() || max.is_nan() || min >= max {
            return Err(BinningError::InvalidEdges(name.to_string()));
        }
        Ok(Self { edges, min, max })
    }

    /// BMI classes 0..=3 over `[0, inf)`.
    pub fn bmi() -> Self {
        Self {
            edges: BMI_EDGES.to_vec(),
            min: 0.0,
            max: f64::INFINITY,
        }
    }

    /// Day-count classes 0..=5 over `[0, 30]`.
    pub fn day_count() -> Self {
        Self {
            edges: DAY_COUNT_EDGES.to_vec(),
            min: 0.0,
            max: 30.0,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin index for `value`.
    ///
    /// Bins are closed on the left, so an edge value belongs to the bin it
    /// opens.
    pub fn assign(&self, column: &str, value: f64) -> Result<i64, BinningError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(BinningError::OutOfRange {
                column: column.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(self.edges.partition_point(|&edge| edge <= value) as i64)
    }
}

/// One column to discretize.
///
/// Deserialization goes through [`IntervalBins::new`], so a config file with
/// unsorted or out-of-domain edges is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BinRuleDef", into = "BinRuleDef")]
pub struct BinRule {
    pub column: String,
    pub bins: IntervalBins,
}

/// On-disk form of a [`BinRule`]. An absent `max` means no upper bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinRuleDef {
    column: String,
    edges: Vec<f64>,
    min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f64>,
}

impl TryFrom<BinRuleDef> for BinRule {
    type Error = BinningError;

    fn try_from(def: BinRuleDef) -> Result<Self, Self::Error> {
        let bins = IntervalBins::new(&def.column, def.edges, def.min, def.max.unwrap_or(f64::INFINITY))?;
        Ok(Self {
            column: def.column,
            bins,
        })
    }
}

impl From<BinRule> for BinRuleDef {
    fn from(rule: BinRule) -> Self {
        let max = rule.bins.max;
        Self {
            column: rule.column,
            edges: rule.bins.edges,
            min: rule.bins.min,
            max: max.is_finite().then_some(max),
        }
    }
}

/// Binning rules plus the flag merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinConfig {
    pub rules: Vec<BinRule>,
    /// Two 0/1 columns OR-ed into `merged`, then dropped
    pub merge: (String, String),
    pub merged: String,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                BinRule {
                    column: "BMI".to_string(),
                    bins: IntervalBins::bmi(),
                },
                BinRule {
                    column: "MentHlth".to_string(),
                    bins: IntervalBins::day_count(),
                },
                BinRule {
                    column: "PhysHlth".to_string(),
                    bins: IntervalBins::day_count(),
                },
            ],
            merge: ("Fruits".to_string(), "Veggies".to_string()),
            merged: "Fruits_Veggies".to_string(),
        }
    }
}

impl BinConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read binning config: {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid binning config: {}", path.display()))
    }

    /// Every column the binner reads.
    pub fn input_columns(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|r| r.column.as_str())
            .chain([self.merge.0.as_str(), self.merge.1.as_str()])
            .collect()
    }
}

fn as_flag(column: &str, row: usize, value: Option<f64>) -> Result<bool, BinningError> {
    match value {
        Some(v) if v == 0.0 => Ok(false),
        Some(v) if v == 1.0 => Ok(true),
        Some(v) => Err(BinningError::NotBinary {
            column: column.to_string(),
            value: v,
            row,
        }),
        None => Err(BinningError::MissingValue {
            column: column.to_string(),
            row,
        }),
    }
}

fn bin_values(rule: &BinRule, values: &[Option<f64>]) -> Result<Vec<i64>, BinningError> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) => rule.bins.assign(&rule.column, *v),
            None => Err(BinningError::MissingValue {
                column: rule.column.clone(),
                row,
            }),
        })
        .collect()
}

/// Apply the binning rules and the flag merge to a cleaned survey table.
///
/// Binned columns keep their position. The merged flag is appended as the
/// last column.
pub fn bin_survey_frame(df: &DataFrame, config: &BinConfig) -> Result<DataFrame> {
    let present: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let missing: Vec<String> = config
        .input_columns()
        .into_iter()
        .filter(|c| !present.iter().any(|p| p == c))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns(missing).into());
    }

    let mut out = df.clone();
    for rule in &config.rules {
        let values = column_as_f64(df, &rule.column)?;
        let binned = bin_values(rule, &values)?;
        out.with_column(Series::new(rule.column.as_str().into(), binned))?;
    }

    let (left, right) = &config.merge;
    let left_values = column_as_f64(df, left)?;
    let right_values = column_as_f64(df, right)?;
    let merged: Vec<i64> = left_values
        .iter()
        .zip(&right_values)
        .enumerate()
        .map(|(row, (l, r))| -> Result<i64, BinningError> {
            let l = as_flag(left, row, *l)?;
            let r = as_flag(right, row, *r)?;
            Ok(i64::from(l || r))
        })
        .collect::<Result<_, _>>()?;

    let mut out = out.drop(left)?.drop(right)?;
    out.with_column(Series::new(config.merged.as_str().into(), merged))?;

    tracing::debug!(rows = out.height(), columns = out.width(), "binned survey table");
    Ok(out)
}

/// Apply the same transformation to one set of raw answers.
///
/// Keys not touched by the config pass through unchanged.
pub fn engineer_answers(
    answers: &HashMap<String, f64>,
    config: &BinConfig,
) -> Result<HashMap<String, f64>, BinningError> {
    let mut out = answers.clone();
    for rule in &config.rules {
        let value = answers.get(&rule.column).copied();
        let binned = bin_values(rule, &[value])?;
        out.insert(rule.column.clone(), binned[0] as f64);
    }

    let (left, right) = &config.merge;
    let l = as_flag(left, 0, answers.get(left).copied())?;
    let r = as_flag(right, 0, answers.get(right).copied())?;
    out.remove(left);
    out.remove(right);
    out.insert(config.merged.clone(), if l || r { 1.0 } else { 0.0 });
    Ok(out)
}
