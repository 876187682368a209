//! Shared test utilities and fixture generators

#![allow(dead_code)]

use cardiopipe::model::{ModelFamily, Penalty, TrainConfig};
use cardiopipe::pipeline::{FEATURE_COLUMNS, TARGET_COLUMN};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Raw survey source columns in the order a BRFSS extract might list them.
pub const RAW_COLUMNS: [&str; 21] = [
    "TOLDHI2", "_BMI5", "CVDSTRK3", "DIABETE3", "_TOTINDA", "_FRTLT1", "_VEGLT1", "_RFDRHV5", "GENHLTH",
    "MENTHLTH", "PHYSHLTH", "DIFFWALK", "SEX", "EDUCA", "INCOME2", "_RFSMOK3", "_INCOMG", "_AGE_G", "BPMEDS",
    "CVDCRHD4", "CVDINFR4",
];

/// One complete, valid raw answer row as text cells, in `RAW_COLUMNS` order.
pub fn raw_row(i: usize) -> Vec<String> {
    let cells = [
        ["1", "2"][i % 2],                      // TOLDHI2
        ["2450", "3120", "1790"][i % 3],        // _BMI5
        ["2", "2", "2", "1"][i % 4],            // CVDSTRK3
        ["1", "3", "2", "4"][i % 4],            // DIABETE3
        ["1", "2"][i % 2],                      // _TOTINDA
        ["1", "2"][(i / 2) % 2],                // _FRTLT1
        ["1", "2"][(i / 3) % 2],                // _VEGLT1
        ["1", "2"][i % 2],                      // _RFDRHV5
        ["1", "2", "3", "4", "5"][i % 5],       // GENHLTH
        ["88", "7", "30", "15"][i % 4],         // MENTHLTH
        ["88", "9", "3"][i % 3],                // PHYSHLTH
        ["1", "2"][i % 2],                      // DIFFWALK
        ["1", "2"][(i / 2) % 2],                // SEX
        ["4", "5", "6"][i % 3],                 // EDUCA
        ["3", "5", "8"][i % 3],                 // INCOME2
        ["1", "2"][i % 2],                      // _RFSMOK3
        ["1", "2", "3", "4", "5"][i % 5],       // _INCOMG
        ["1", "2", "3", "4", "5", "6"][i % 6],  // _AGE_G
        ["1", "2"][i % 2],                      // BPMEDS
        ["2", "1", "2", "2"][i % 4],            // CVDCRHD4
        ["2", "2", "1", "2"][i % 4],            // CVDINFR4
    ];
    cells.iter().map(|s| s.to_string()).collect()
}

/// Build a raw survey table (all text) from rows in `RAW_COLUMNS` order.
pub fn raw_survey_frame(rows: &[Vec<String>]) -> DataFrame {
    let columns: Vec<Column> = RAW_COLUMNS
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let values: Vec<String> = rows.iter().map(|r| r[j].clone()).collect();
            Column::new((*name).into(), values)
        })
        .collect();
    DataFrame::new(columns).unwrap()
}

fn ints(n: usize, f: impl Fn(usize) -> i64) -> Vec<i64> {
    (0..n).map(f).collect()
}

/// Cleaned survey table as the extractor would produce it.
pub fn cleaned_frame(n: usize) -> DataFrame {
    df! {
        "HighChol" => ints(n, |i| (i % 2) as i64),
        "BMI" => (0..n).map(|i| [17.9f64, 18.5, 24.5, 25.0, 31.2][i % 5]).collect::<Vec<_>>(),
        "Diabetes" => ints(n, |i| ((i / 2) % 2) as i64),
        "PhysActivity" => ints(n, |i| ((i / 3) % 2) as i64),
        "Fruits" => ints(n, |i| (i % 2) as i64),
        "Veggies" => ints(n, |i| ((i / 2) % 2) as i64),
        "HvyAlcoholConsump" => ints(n, |i| ((i / 5) % 2) as i64),
        "GenHlth" => ints(n, |i| (i % 5 + 1) as i64),
        "MentHlth" => ints(n, |i| [0i64, 5, 12, 30][i % 4]),
        "PhysHlth" => ints(n, |i| [0i64, 4, 25, 29][i % 4]),
        "DiffWalk" => ints(n, |i| ((i / 4) % 2) as i64),
        "Sex" => ints(n, |i| ((i / 7) % 2) as i64),
        "Education" => ints(n, |i| (i % 6 + 1) as i64),
        "Current_Smoker" => ints(n, |i| ((i / 3) % 2) as i64),
        "Income_Category" => ints(n, |i| (i % 5 + 1) as i64),
        "Age_Group" => ints(n, |i| (i % 6 + 1) as i64),
        "On_BP_Medication" => ints(n, |i| ((i / 2) % 2) as i64),
        TARGET_COLUMN => ints(n, |i| (i % 4 + 1) as i64),
    }
    .unwrap()
}

/// Binned, balanced training table whose label depends on `HighChol` and `GenHlth`.
pub fn training_frame(n: usize) -> DataFrame {
    let mut columns: Vec<Column> = Vec::with_capacity(FEATURE_COLUMNS.len() + 1);
    let label: Vec<i64> = (0..n).map(|i| (i % 2) as i64).collect();
    for (j, name) in FEATURE_COLUMNS.iter().enumerate() {
        let values: Vec<i64> = (0..n)
            .map(|i| match *name {
                "HighChol" => label[i],
                "GenHlth" => 1 + 3 * label[i] + (i % 2 == 0 && i % 5 == 0) as i64,
                _ => ((i / 2 + j) % 3) as i64,
            })
            .collect();
        columns.push(Column::new((*name).into(), values));
    }
    columns.push(Column::new(TARGET_COLUMN.into(), label));
    DataFrame::new(columns).unwrap()
}

/// A training config small enough for tests.
pub fn quick_train_config(input: &Path, dir: &Path) -> TrainConfig {
    let mut config = TrainConfig {
        input: input.to_path_buf(),
        n_iter: 1,
        families: vec![ModelFamily::LogisticRegression, ModelFamily::NaiveBayes, ModelFamily::GradientBoostA],
        artifact_path: dir.join("model.json"),
        report_path: Some(dir.join("report.json")),
        ..TrainConfig::default()
    };
    config.grids.logistic_regression.c = vec![1.0];
    config.grids.logistic_regression.penalty = vec![Penalty::L2];
    config.grids.gradient_boost_a.n_estimators = vec![10];
    config.grids.gradient_boost_a.max_depth = vec![2];
    config.grids.gradient_boost_a.learning_rate = vec![0.3];
    config
}

/// Write `df` as CSV under `dir`.
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = write_csv(temp_dir.path(), "test_data.csv", df);
    (temp_dir, path)
}

pub fn i64_values(df: &DataFrame, name: &str) -> Vec<i64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}
