//! Table loading and saving for CSV and Parquet files

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

/// Supported table formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            _ => anyhow::bail!(
                "Unsupported file format: '{}'. Supported formats: csv, parquet",
                extension
            ),
        }
    }
}

/// Load a dataset lazily from a file (CSV or Parquet based on extension).
///
/// `infer_schema_length` only applies to CSV. `Some(0)` reads every column as
/// text, which is what raw survey files need: a numeric column with a stray
/// "BLANK" or "Refused" cell would otherwise fail to parse.
pub fn load_dataset(path: &Path, infer_schema_length: Option<usize>) -> Result<LazyFrame> {
    let lf = match TableFormat::from_path(path)? {
        TableFormat::Csv => LazyCsvReader::new(path)
            .with_infer_schema_length(infer_schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        TableFormat::Parquet => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
    };

    Ok(lf)
}

/// Load and collect a cleaned table with type inference.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    load_dataset(path, Some(10_000))?
        .collect()
        .with_context(|| format!("Failed to read table: {}", path.display()))
}

/// Load a raw survey file with every column read as text.
pub fn load_raw_survey(path: &Path) -> Result<DataFrame> {
    load_dataset(path, Some(0))?
        .collect()
        .with_context(|| format!("Failed to read survey file: {}", path.display()))
}

/// Save a dataset to file (CSV or Parquet based on extension).
pub fn save_dataset(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    match TableFormat::from_path(path)? {
        TableFormat::Csv => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        TableFormat::Parquet => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
    }

    Ok(())
}

/// Read a column as `f64` values. Text that does not parse as a number becomes `None`.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    let float_col = column
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be read as a number", name))?;
    Ok(float_col.f64()?.into_iter().collect())
}

/// Names of a DataFrame's columns as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}
