//! Outcome label derivation and mapping
//!
//! The four-valued heart-disease status is derived from three yes/no survey
//! indicators and can be collapsed to a binary disease-present label.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::LabelError;

/// Survey answer code meaning "yes" on the indicator questions.
const YES: f64 = 1.0;

/// Four mutually exclusive outcome categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeartDiseaseStatus {
    CoronaryHeartDisease,
    MyocardialInfarction,
    Stroke,
    Healthy,
}

impl HeartDiseaseStatus {
    pub const ALL: [HeartDiseaseStatus; 4] = [
        Self::CoronaryHeartDisease,
        Self::MyocardialInfarction,
        Self::Stroke,
        Self::Healthy,
    ];

    /// Derive the status from the three indicator answers.
    ///
    /// Stroke overrides infarction, which overrides coronary disease. Anything
    /// other than a "yes" (including `None`) leaves the lower priority in place.
    pub fn derive(coronary: Option<f64>, infarction: Option<f64>, stroke: Option<f64>) -> Self {
        let is_yes = |v: Option<f64>| v == Some(YES);
        if is_yes(stroke) {
            Self::Stroke
        } else if is_yes(infarction) {
            Self::MyocardialInfarction
        } else if is_yes(coronary) {
            Self::CoronaryHeartDisease
        } else {
            Self::Healthy
        }
    }

    /// Code stored in the label column.
    pub fn code(self) -> i64 {
        match self {
            Self::CoronaryHeartDisease => 1,
            Self::MyocardialInfarction => 2,
            Self::Stroke => 3,
            Self::Healthy => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Binary disease-present label: 1 for any disease, 0 for healthy.
    pub fn binary(self) -> i64 {
        match self {
            Self::Healthy => 0,
            _ => 1,
        }
    }

    pub fn is_disease(self) -> bool {
        self.binary() == 1
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::CoronaryHeartDisease => "Coronary Heart Disease (CHD)",
            Self::MyocardialInfarction => "Myocardial Infarction (Heart Attack)",
            Self::Stroke => "Stroke",
            Self::Healthy => "No Heart Disease Detected",
        }
    }
}

impl std::fmt::Display for HeartDiseaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// How the class values of a label column should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelEncoding {
    /// 0 = healthy, 1 = disease present
    Binary,
    /// Codes 1..=4 of [`HeartDiseaseStatus`]
    FourWay,
}

impl LabelEncoding {
    /// Detect the encoding from the distinct class values.
    pub fn detect(classes: &[i64]) -> Option<Self> {
        if classes.is_empty() {
            return None;
        }
        if classes.iter().all(|c| *c == 0 || *c == 1) {
            Some(Self::Binary)
        } else if classes.iter().all(|c| (1..=4).contains(c)) {
            Some(Self::FourWay)
        } else {
            None
        }
    }

    /// Whether a class value means disease-present under this encoding.
    pub fn is_disease(self, class: i64) -> bool {
        match self {
            Self::Binary => class == 1,
            Self::FourWay => HeartDiseaseStatus::from_code(class)
                .map(HeartDiseaseStatus::is_disease)
                .unwrap_or(false),
        }
    }

    pub fn describe(self, class: i64) -> String {
        match self {
            Self::Binary if class == 1 => "Heart Disease Detected".to_string(),
            Self::Binary => HeartDiseaseStatus::Healthy.description().to_string(),
            Self::FourWay => HeartDiseaseStatus::from_code(class)
                .map(|s| s.description().to_string())
                .unwrap_or_else(|| format!("Unknown class {}", class)),
        }
    }
}

/// Read the label column as integer codes, rejecting nulls.
pub fn read_label_codes(df: &DataFrame, column: &str) -> Result<Vec<i64>> {
    let col = df
        .column(column)
        .with_context(|| format!("Label column '{}' not found", column))?;
    let float_col = col.cast(&DataType::Float64)?;
    float_col
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) if v.fract() == 0.0 => Ok(v as i64),
            Some(v) => Err(LabelError::UnknownCode {
                column: column.to_string(),
                value: v,
                row,
            }
            .into()),
            None => Err(LabelError::MissingValue {
                column: column.to_string(),
                row,
            }
            .into()),
        })
        .collect()
}

/// Collapse a four-valued label column to the binary disease-present label.
///
/// A column that is already 0/1 is returned unchanged.
pub fn collapse_to_binary(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let codes = read_label_codes(df, column)?;
    let mut distinct = codes.clone();
    distinct.sort_unstable();
    distinct.dedup();

    if LabelEncoding::detect(&distinct) == Some(LabelEncoding::Binary) {
        tracing::info!(column, "label column is already binary");
        return Ok(df.clone());
    }

    let binary: Vec<i64> = codes
        .iter()
        .enumerate()
        .map(|(row, code)| {
            HeartDiseaseStatus::from_code(*code)
                .map(HeartDiseaseStatus::binary)
                .ok_or_else(|| LabelError::UnknownCode {
                    column: column.to_string(),
                    value: *code as f64,
                    row,
                })
        })
        .collect::<Result<_, _>>()?;

    let mut out = df.clone();
    out.with_column(Series::new(column.into(), binary))?;
    Ok(out)
}

/// Count rows per class value, sorted by class.
pub fn class_counts(codes: &[i64]) -> Vec<(i64, usize)> {
    let mut counts = std::collections::BTreeMap::new();
    for code in codes {
        *counts.entry(*code).or_insert(0usize) += 1;
    }
    counts.into_iter().collect()
}
