//! Survey column schema
//!
//! Describes which raw survey columns are read, what they are renamed to,
//! which codes mean "missing", and how each answer is re-encoded. The default
//! schema targets the yearly BRFSS extract.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::SchemaError;

/// Name of the derived outcome column.
pub const TARGET_COLUMN: &str = "Heart_Disease_Status";

/// Engineered feature columns, in the order the ensemble is trained on.
pub const FEATURE_COLUMNS: [&str; 16] = [
    "HighChol",
    "BMI",
    "Diabetes",
    "PhysActivity",
    "HvyAlcoholConsump",
    "GenHlth",
    "MentHlth",
    "PhysHlth",
    "DiffWalk",
    "Sex",
    "Education",
    "Current_Smoker",
    "Income_Category",
    "Age_Group",
    "On_BP_Medication",
    "Fruits_Veggies",
];

/// Codes that mean "don't know" / "refused" in every survey column.
pub const GLOBAL_SENTINELS: [f64; 2] = [77.0, 99.0];

/// Which outcome indicator a label-source column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Coronary,
    Infarction,
    Stroke,
}

/// What happens to a column after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Written to the cleaned table.
    Feature,
    /// Only screens rows for missing answers, then dropped.
    FilterOnly,
    /// Consumed to derive the outcome label, then dropped.
    LabelSource(Indicator),
}

/// One raw survey column and its cleaning rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header in the raw survey file
    pub source: String,
    /// Header in the cleaned table
    pub name: String,
    pub role: ColumnRole,
    /// Column-specific missing codes, checked in addition to the global ones
    #[serde(default)]
    pub sentinels: Vec<f64>,
    /// `(from, to)` pairs applied to the raw code
    #[serde(default)]
    pub recode: Vec<(f64, f64)>,
    /// Divisor applied after recoding (BMI is stored as BMI * 100)
    #[serde(default)]
    pub scale: Option<f64>,
}

impl ColumnSpec {
    pub fn feature(source: &str, name: &str) -> Self {
        Self {
            source: source.to_string(),
            name: name.to_string(),
            role: ColumnRole::Feature,
            sentinels: Vec::new(),
            recode: Vec::new(),
            scale: None,
        }
    }

    pub fn filter_only(source: &str, name: &str) -> Self {
        Self {
            role: ColumnRole::FilterOnly,
            ..Self::feature(source, name)
        }
    }

    pub fn label_source(source: &str, indicator: Indicator) -> Self {
        Self {
            role: ColumnRole::LabelSource(indicator),
            ..Self::feature(source, source)
        }
    }

    pub fn with_sentinels(mut self, codes: &[f64]) -> Self {
        self.sentinels = codes.to_vec();
        self
    }

    pub fn with_recode(mut self, pairs: &[(f64, f64)]) -> Self {
        self.recode = pairs.to_vec();
        self
    }

    pub fn scaled_by(mut self, divisor: f64) -> Self {
        self.scale = Some(divisor);
        self
    }

    /// Clean one raw cell. `None` means the answer counts as missing.
    pub fn clean(&self, raw: Option<f64>, global_sentinels: &[f64]) -> Option<f64> {
        let value = raw.filter(|v| v.is_finite())?;
        if global_sentinels.contains(&value) || self.sentinels.contains(&value) {
            return None;
        }
        let recoded = self
            .recode
            .iter()
            .find(|(from, _)| *from == value)
            .map(|(_, to)| *to)
            .unwrap_or(value);
        Some(match self.scale {
            Some(divisor) => recoded / divisor,
            None => recoded,
        })
    }

    /// Whether the cleaned column holds fractional values.
    pub fn is_continuous(&self) -> bool {
        self.scale.is_some()
    }
}

/// Ordered set of column specs plus the global missing codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySchema {
    pub columns: Vec<ColumnSpec>,
    #[serde(default = "default_global_sentinels")]
    pub global_sentinels: Vec<f64>,
    #[serde(default = "default_label_column")]
    pub label_column: String,
}

fn default_global_sentinels() -> Vec<f64> {
    GLOBAL_SENTINELS.to_vec()
}

fn default_label_column() -> String {
    TARGET_COLUMN.to_string()
}

impl Default for SurveySchema {
    fn default() -> Self {
        Self::brfss()
    }
}

impl SurveySchema {
    /// Build a schema, keeping the first spec for any repeated source column.
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .filter(|spec| seen.insert(spec.source.clone()))
            .collect();
        Self {
            columns,
            global_sentinels: default_global_sentinels(),
            label_column: default_label_column(),
        }
    }

    /// The BRFSS selection used for the 2013 and 2015 survey years.
    pub fn brfss() -> Self {
        const YES_NO: [f64; 2] = [7.0, 9.0];
        Self::new(vec![
            ColumnSpec::feature("TOLDHI2", "HighChol")
                .with_sentinels(&YES_NO)
                .with_recode(&[(2.0, 0.0)]),
            ColumnSpec::feature("_BMI5", "BMI").scaled_by(100.0),
            ColumnSpec::label_source("CVDSTRK3", Indicator::Stroke),
            ColumnSpec::feature("DIABETE3", "Diabetes")
                .with_sentinels(&YES_NO)
                .with_recode(&[(2.0, 1.0), (3.0, 0.0), (4.0, 0.0)]),
            ColumnSpec::feature("_TOTINDA", "PhysActivity")
                .with_sentinels(&[9.0])
                .with_recode(&[(2.0, 0.0)]),
            ColumnSpec::feature("_FRTLT1", "Fruits")
                .with_sentinels(&[9.0])
                .with_recode(&[(2.0, 0.0)]),
            ColumnSpec::feature("_VEGLT1", "Veggies")
                .with_sentinels(&[9.0])
                .with_recode(&[(2.0, 0.0)]),
            ColumnSpec::feature("_RFDRHV5", "HvyAlcoholConsump")
                .with_sentinels(&[9.0])
                .with_recode(&[(1.0, 0.0), (2.0, 1.0)]),
            ColumnSpec::feature("GENHLTH", "GenHlth").with_sentinels(&YES_NO),
            ColumnSpec::feature("MENTHLTH", "MentHlth").with_recode(&[(88.0, 0.0)]),
            ColumnSpec::feature("PHYSHLTH", "PhysHlth").with_recode(&[(88.0, 0.0)]),
            ColumnSpec::feature("DIFFWALK", "DiffWalk")
                .with_sentinels(&YES_NO)
                .with_recode(&[(2.0, 0.0)]),
            ColumnSpec::feature("SEX", "Sex").with_recode(&[(1.0, 0.0), (2.0, 1.0)]),
            ColumnSpec::feature("EDUCA", "Education").with_sentinels(&[9.0]),
            ColumnSpec::filter_only("INCOME2", "Income"),
            ColumnSpec::feature("_RFSMOK3", "Current_Smoker")
                .with_sentinels(&[9.0])
                .with_recode(&[(1.0, 0.0), (2.0, 1.0)]),
            ColumnSpec::feature("_INCOMG", "Income_Category").with_sentinels(&[9.0]),
            ColumnSpec::feature("_AGE_G", "Age_Group"),
            ColumnSpec::feature("BPMEDS", "On_BP_Medication")
                .with_sentinels(&YES_NO)
                .with_recode(&[(2.0, 0.0)]),
            ColumnSpec::label_source("CVDCRHD4", Indicator::Coronary),
            ColumnSpec::label_source("CVDINFR4", Indicator::Infarction),
        ])
    }

    /// Load a schema from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file: {}", path.display()))?;
        let schema: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse schema file: {}", path.display()))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check that output names are unique and every indicator is present.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut names = HashSet::new();
        for spec in self.columns.iter().filter(|s| s.role == ColumnRole::Feature) {
            if !names.insert(spec.name.as_str()) || spec.name == self.label_column {
                return Err(SchemaError::DuplicateOutput(spec.name.clone()));
            }
        }

        let missing: Vec<String> = [Indicator::Coronary, Indicator::Infarction, Indicator::Stroke]
            .into_iter()
            .filter(|ind| self.indicator_column(*ind).is_none())
            .map(|ind| format!("<{:?} indicator>", ind).to_lowercase())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }
        Ok(())
    }

    /// Raw headers to select from the survey file, in schema order.
    pub fn source_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|s| s.source.as_str()).collect()
    }

    /// Headers of the cleaned table, label last.
    pub fn output_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|s| s.role == ColumnRole::Feature)
            .map(|s| s.name.as_str())
            .chain(std::iter::once(self.label_column.as_str()))
            .collect()
    }

    pub fn indicator_column(&self, indicator: Indicator) -> Option<&ColumnSpec> {
        self.columns
            .iter()
            .find(|s| s.role == ColumnRole::LabelSource(indicator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brfss_schema_is_valid() {
        let schema = SurveySchema::brfss();
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_output_columns_end_with_label() {
        let schema = SurveySchema::brfss();
        let cols = schema.output_columns();
        assert_eq!(cols.first(), Some(&"HighChol"));
        assert_eq!(cols.last(), Some(&TARGET_COLUMN));
        assert_eq!(cols.len(), 18);
        assert!(!cols.contains(&"Income"));
        assert!(!cols.contains(&"CVDSTRK3"));
    }

    #[test]
    fn test_new_drops_repeated_sources() {
        let schema = SurveySchema::new(vec![
            ColumnSpec::label_source("CVDSTRK3", Indicator::Stroke),
            ColumnSpec::feature("SEX", "Sex"),
            ColumnSpec::label_source("CVDSTRK3", Indicator::Stroke),
        ]);
        assert_eq!(schema.source_columns(), vec!["CVDSTRK3", "SEX"]);
    }

    #[test]
    fn test_clean_global_and_column_sentinels() {
        let spec = ColumnSpec::feature("TOLDHI2", "HighChol")
            .with_sentinels(&[7.0, 9.0])
            .with_recode(&[(2.0, 0.0)]);
        assert_eq!(spec.clean(Some(77.0), &GLOBAL_SENTINELS), None);
        assert_eq!(spec.clean(Some(9.0), &GLOBAL_SENTINELS), None);
        assert_eq!(spec.clean(None, &GLOBAL_SENTINELS), None);
        assert_eq!(spec.clean(Some(2.0), &GLOBAL_SENTINELS), Some(0.0));
        assert_eq!(spec.clean(Some(1.0), &GLOBAL_SENTINELS), Some(1.0));
    }

    #[test]
    fn test_day_counts_keep_seven_and_nine() {
        let spec = ColumnSpec::feature("MENTHLTH", "MentHlth").with_recode(&[(88.0, 0.0)]);
        assert_eq!(spec.clean(Some(7.0), &GLOBAL_SENTINELS), Some(7.0));
        assert_eq!(spec.clean(Some(9.0), &GLOBAL_SENTINELS), Some(9.0));
        assert_eq!(spec.clean(Some(88.0), &GLOBAL_SENTINELS), Some(0.0));
        assert_eq!(spec.clean(Some(99.0), &GLOBAL_SENTINELS), None);
    }

    #[test]
    fn test_bmi_is_rescaled() {
        let spec = ColumnSpec::feature("_BMI5", "BMI").scaled_by(100.0);
        let v = spec.clean(Some(2734.0), &GLOBAL_SENTINELS).unwrap();
        assert!((v - 27.34).abs() < 1e-9);
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = SurveySchema::brfss();
        let text = serde_json::to_string(&schema).unwrap();
        let parsed: SurveySchema = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, schema);
    }

    #[test]
    fn test_validate_rejects_missing_indicator() {
        let schema = SurveySchema::new(vec![
            ColumnSpec::feature("SEX", "Sex"),
            ColumnSpec::label_source("CVDSTRK3", Indicator::Stroke),
        ]);
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::MissingColumns(_))
        ));
    }
}
