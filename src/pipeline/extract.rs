//! Raw survey extraction
//!
//! Selects the schema's columns from a yearly survey table, screens out
//! missing answers, re-encodes categorical codes and derives the outcome label.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::error::SchemaError;
use super::label::HeartDiseaseStatus;
use super::loader::column_as_f64;
use super::missing::{analyze_missing_values, complete_rows, count_missing_values};
use super::schema::{ColumnRole, Indicator, SurveySchema};

/// Where to read one survey year from and where to write the cleaned table.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub year: String,
    pub schema: SurveySchema,
}

impl ExtractConfig {
    /// Config for `{year}.csv` → `preprocessed{year}.csv` in `dir`.
    pub fn for_year(dir: &Path, year: &str) -> Self {
        Self {
            source: dir.join(format!("{}.csv", year)),
            output: dir.join(format!("preprocessed{}.csv", year)),
            year: year.to_string(),
            schema: SurveySchema::brfss(),
        }
    }
}

/// Row accounting for one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped: usize,
    /// Missing answers per cleaned column, in schema order
    pub missing_by_column: Vec<(String, usize)>,
    /// Missing ratio per cleaned column, highest first
    pub missing_ratios: Vec<(String, f64)>,
    /// Outcome label counts among the kept rows
    pub label_counts: Vec<(HeartDiseaseStatus, usize)>,
}

impl ExtractionReport {
    pub fn drop_rate(&self) -> f64 {
        if self.rows_in == 0 {
            0.0
        } else {
            self.rows_dropped as f64 / self.rows_in as f64
        }
    }
}

/// Map trimmed header names to the names actually present in the table.
fn resolve_headers(df: &DataFrame) -> HashMap<String, String> {
    df.get_column_names()
        .iter()
        .map(|name| (name.trim().to_string(), name.to_string()))
        .collect()
}

/// Clean a raw survey table according to `schema`.
///
/// Every missing source column is reported at once. Rows with any missing
/// answer (including label-source and filter-only columns) are dropped.
pub fn extract_survey(raw: &DataFrame, schema: &SurveySchema) -> Result<(DataFrame, ExtractionReport)> {
    schema.validate()?;

    let headers = resolve_headers(raw);
    let missing: Vec<String> = schema
        .source_columns()
        .into_iter()
        .filter(|source| !headers.contains_key(*source))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns(missing).into());
    }

    let rows_in = raw.height();

    // Clean every selected column; nulls mark missing answers.
    let mut cleaned: Vec<Vec<Option<f64>>> = Vec::with_capacity(schema.columns.len());
    for spec in &schema.columns {
        let raw_values = column_as_f64(raw, &headers[&spec.source])?;
        let values: Vec<Option<f64>> = raw_values
            .into_iter()
            .map(|v| spec.clean(v, &schema.global_sentinels))
            .collect();
        cleaned.push(values);
    }

    let screening = DataFrame::new(
        schema
            .columns
            .iter()
            .zip(&cleaned)
            .map(|(spec, values)| Column::new(spec.name.as_str().into(), values.clone()))
            .collect(),
    )?;
    let missing_by_column = count_missing_values(&screening);
    let missing_ratios = analyze_missing_values(&screening)?;

    let keep = complete_rows(&cleaned);
    let kept = |values: &[Option<f64>]| -> Vec<f64> {
        values
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .filter_map(|(v, _)| *v)
            .collect()
    };

    let indicator = |which: Indicator| -> Vec<f64> {
        schema
            .columns
            .iter()
            .position(|s| s.role == ColumnRole::LabelSource(which))
            .map(|i| kept(&cleaned[i]))
            .unwrap_or_default()
    };
    let coronary = indicator(Indicator::Coronary);
    let infarction = indicator(Indicator::Infarction);
    let stroke = indicator(Indicator::Stroke);

    let labels: Vec<HeartDiseaseStatus> = (0..coronary.len())
        .map(|i| {
            HeartDiseaseStatus::derive(Some(coronary[i]), Some(infarction[i]), Some(stroke[i]))
        })
        .collect();

    let mut columns: Vec<Column> = Vec::with_capacity(schema.columns.len() + 1);
    for (spec, values) in schema.columns.iter().zip(&cleaned) {
        if spec.role != ColumnRole::Feature {
            continue;
        }
        let values = kept(values);
        let column = if spec.is_continuous() {
            Column::new(spec.name.as_str().into(), values)
        } else {
            let ints: Vec<i64> = values.into_iter().map(|v| v as i64).collect();
            Column::new(spec.name.as_str().into(), ints)
        };
        columns.push(column);
    }
    let label_codes: Vec<i64> = labels.iter().map(|s| s.code()).collect();
    columns.push(Column::new(schema.label_column.as_str().into(), label_codes));

    let df = DataFrame::new(columns)?;
    let rows_out = df.height();

    let label_counts = HeartDiseaseStatus::ALL
        .into_iter()
        .map(|status| (status, labels.iter().filter(|l| **l == status).count()))
        .collect();

    let report = ExtractionReport {
        rows_in,
        rows_out,
        rows_dropped: rows_in - rows_out,
        missing_by_column,
        missing_ratios,
        label_counts,
    };

    tracing::info!(
        rows_in,
        rows_out,
        drop_rate = report.drop_rate(),
        "survey extraction finished"
    );

    Ok((df, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::{ColumnSpec, TARGET_COLUMN};

    fn small_schema() -> SurveySchema {
        SurveySchema::new(vec![
            ColumnSpec::feature("SEX", "Sex").with_recode(&[(1.0, 0.0), (2.0, 1.0)]),
            ColumnSpec::feature("_BMI5", "BMI").scaled_by(100.0),
            ColumnSpec::filter_only("INCOME2", "Income"),
            ColumnSpec::label_source("CVDCRHD4", Indicator::Coronary),
            ColumnSpec::label_source("CVDINFR4", Indicator::Infarction),
            ColumnSpec::label_source("CVDSTRK3", Indicator::Stroke),
        ])
    }

    #[test]
    fn test_extract_small_table() {
        let raw = df! {
            "SEX" => ["1", "2", "2", "1"],
            "_BMI5" => ["2500", "3240", "1850", "2000"],
            "INCOME2" => ["5", "77", "3", "2"],
            "CVDCRHD4" => ["2", "1", "1", "2"],
            "CVDINFR4" => ["1", "2", "2", "2"],
            "CVDSTRK3" => ["1", "2", "2", "2"],
        }
        .unwrap();

        let (df, report) = extract_survey(&raw, &small_schema()).unwrap();

        assert_eq!(report.rows_in, 4);
        assert_eq!(report.rows_out, 3);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(
            df.get_column_names().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["Sex", "BMI", TARGET_COLUMN]
        );

        let sex: Vec<Option<i64>> = df.column("Sex").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(sex, vec![Some(0), Some(1), Some(0)]);

        let bmi: Vec<Option<f64>> = df.column("BMI").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(bmi, vec![Some(25.0), Some(18.5), Some(20.0)]);

        let label: Vec<Option<i64>> = df
            .column(TARGET_COLUMN)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        // Row 0 has stroke and infarction: stroke wins.
        assert_eq!(label, vec![Some(3), Some(1), Some(4)]);
    }

    #[test]
    fn test_missing_columns_are_fatal() {
        let raw = df! {
            "SEX" => ["1"],
            "CVDCRHD4" => ["2"],
        }
        .unwrap();

        let err = extract_survey(&raw, &small_schema()).unwrap_err();
        let schema_err = err.downcast_ref::<SchemaError>().unwrap();
        match schema_err {
            SchemaError::MissingColumns(cols) => {
                assert!(cols.contains(&"_BMI5".to_string()));
                assert!(cols.contains(&"INCOME2".to_string()));
                assert!(cols.contains(&"CVDSTRK3".to_string()));
                assert!(!cols.contains(&"SEX".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_headers_are_trimmed() {
        let raw = df! {
            " SEX" => ["1"],
            "_BMI5 " => ["2500"],
            "INCOME2" => ["1"],
            "CVDCRHD4" => ["2"],
            "CVDINFR4" => ["2"],
            "CVDSTRK3" => ["2"],
        }
        .unwrap();

        let (df, report) = extract_survey(&raw, &small_schema()).unwrap();
        assert_eq!(report.rows_out, 1);
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_text_sentinels_drop_rows() {
        let raw = df! {
            "SEX" => ["1", "Refused", "2"],
            "_BMI5" => ["2500", "2600", "BLANK"],
            "INCOME2" => ["1", "1", "1"],
            "CVDCRHD4" => ["2", "2", "2"],
            "CVDINFR4" => ["2", "2", "2"],
            "CVDSTRK3" => ["2", "2", "2"],
        }
        .unwrap();

        let (_, report) = extract_survey(&raw, &small_schema()).unwrap();
        assert_eq!(report.rows_out, 1);
        let by_col: HashMap<_, _> = report.missing_by_column.clone().into_iter().collect();
        assert_eq!(by_col["Sex"], 1);
        assert_eq!(by_col["BMI"], 1);
        assert!((report.drop_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
