//! Integration tests for feature binning

mod common;

use cardiopipe::pipeline::{
    bin_survey_frame, engineer_answers, load_table, save_dataset, BinConfig, BinningError, SchemaError,
    FEATURE_COLUMNS, TARGET_COLUMN,
};
use common::{cleaned_frame, i64_values};
use polars::prelude::*;
use std::collections::HashMap;
use tempfile::TempDir;

#[test]
fn test_binned_layout_matches_training_features() {
    let df = cleaned_frame(20);
    let out = bin_survey_frame(&df, &BinConfig::default()).unwrap();

    let names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut expected: Vec<String> = FEATURE_COLUMNS[..15].iter().map(|s| s.to_string()).collect();
    expected.push(TARGET_COLUMN.to_string());
    expected.push("Fruits_Veggies".to_string());
    assert_eq!(names, expected);
    assert_eq!(out.height(), 20);
}

#[test]
fn test_bins_and_merged_flag() {
    let df = cleaned_frame(8);
    let out = bin_survey_frame(&df, &BinConfig::default()).unwrap();

    // 17.9, 18.5, 24.5, 25.0, 31.2
    assert_eq!(i64_values(&out, "BMI")[..5], [0, 1, 1, 2, 3]);
    // 0, 5, 12, 30
    assert_eq!(i64_values(&out, "MentHlth")[..4], [0, 1, 2, 5]);
    // 0, 4, 25, 29
    assert_eq!(i64_values(&out, "PhysHlth")[..4], [0, 0, 5, 5]);
    assert_eq!(i64_values(&out, "Fruits_Veggies")[..4], [0, 1, 1, 1]);

    // untouched columns pass through
    assert_eq!(i64_values(&out, TARGET_COLUMN), i64_values(&df, TARGET_COLUMN));
    assert_eq!(i64_values(&out, "Age_Group"), i64_values(&df, "Age_Group"));
}

#[test]
fn test_out_of_domain_day_count_fails_the_stage() {
    let mut df = cleaned_frame(4);
    df.with_column(Series::new("PhysHlth".into(), [0i64, 31, 2, 3])).unwrap();

    let err = bin_survey_frame(&df, &BinConfig::default()).unwrap_err();
    match err.downcast_ref::<BinningError>() {
        Some(BinningError::OutOfRange { column, value, .. }) => {
            assert_eq!(column, "PhysHlth");
            assert_eq!(*value, 31.0);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_missing_binning_column_is_schema_error() {
    let df = cleaned_frame(4).drop("Veggies").unwrap();
    let err = bin_survey_frame(&df, &BinConfig::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::MissingColumns(cols)) if cols == &vec!["Veggies".to_string()]
    ));
}

#[test]
fn test_answers_are_binned_like_the_table() {
    let df = cleaned_frame(5);
    let table = bin_survey_frame(&df, &BinConfig::default()).unwrap();

    for row in 0..5 {
        let answers: HashMap<String, f64> = df
            .get_columns()
            .iter()
            .filter(|c| c.name().as_str() != TARGET_COLUMN)
            .map(|c| {
                let value = c.cast(&DataType::Float64).unwrap().f64().unwrap().get(row).unwrap();
                (c.name().to_string(), value)
            })
            .collect();
        let engineered = engineer_answers(&answers, &BinConfig::default()).unwrap();

        assert_eq!(engineered.len(), FEATURE_COLUMNS.len());
        for feature in FEATURE_COLUMNS {
            let expected = i64_values(&table, feature)[row] as f64;
            assert_eq!(engineered[feature], expected, "{} row {}", feature, row);
        }
    }
}

#[test]
fn test_binned_table_survives_csv() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("binned.csv");
    let mut out = bin_survey_frame(&cleaned_frame(10), &BinConfig::default()).unwrap();
    save_dataset(&mut out, &path).unwrap();

    let reloaded = load_table(&path).unwrap();
    assert_eq!(reloaded.shape(), out.shape());
    assert_eq!(i64_values(&reloaded, "BMI"), i64_values(&out, "BMI"));
}

#[test]
fn test_custom_rules_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bins.json");
    std::fs::write(
        &path,
        r#"{
            "rules": [
                {"column": "BMI", "edges": [25.0], "min": 0.0},
                {"column": "MentHlth", "edges": [15.0], "min": 0.0, "max": 30.0},
                {"column": "PhysHlth", "edges": [15.0], "min": 0.0, "max": 30.0}
            ],
            "merge": ["Fruits", "Veggies"],
            "merged": "Fruits_Veggies"
        }"#,
    )
    .unwrap();

    let config = BinConfig::from_json_file(&path).unwrap();
    assert_eq!(config.rules[0].bins.n_bins(), 2);
    let out = bin_survey_frame(&cleaned_frame(8), &config).unwrap();
    // 17.9, 18.5, 24.5, 25.0, 31.2
    assert_eq!(i64_values(&out, "BMI")[..5], [0, 0, 0, 1, 1]);
    // 0, 5, 12, 30
    assert_eq!(i64_values(&out, "MentHlth")[..4], [0, 0, 0, 1]);
}
