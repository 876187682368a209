//! Concatenation of cleaned survey tables from several years

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::SchemaError;
use super::loader::{column_names, load_table};

/// Input files and output path for the combine stage.
#[derive(Debug, Clone)]
pub struct CombineConfig {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Check that `df` has exactly the columns in `expected`, in any order.
fn check_column_set(index: usize, expected: &[String], df: &DataFrame) -> Result<(), SchemaError> {
    let actual = column_names(df);
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();
    let actual_set: HashSet<&str> = actual.iter().map(String::as_str).collect();

    let missing: Vec<String> = expected
        .iter()
        .filter(|c| !actual_set.contains(c.as_str()))
        .cloned()
        .collect();
    let unexpected: Vec<String> = actual
        .iter()
        .filter(|c| !expected_set.contains(c.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::SchemaMismatch {
            index,
            missing,
            unexpected,
        })
    }
}

/// Common dtype for one column across every input.
///
/// Identical dtypes pass through. Integer and float columns widen to
/// `Float64`, mixed integer widths to `Int64`. Anything else is rejected so
/// no value is silently rewritten.
fn common_dtype(column: &str, dtypes: &[&DataType]) -> Result<DataType, SchemaError> {
    let first = dtypes[0];
    if dtypes.iter().all(|dt| *dt == first) {
        return Ok(first.clone());
    }
    if dtypes.iter().all(|dt| dt.is_integer()) {
        return Ok(DataType::Int64);
    }
    if dtypes.iter().all(|dt| dt.is_integer() || dt.is_float()) {
        return Ok(DataType::Float64);
    }

    let mut names: Vec<String> = dtypes.iter().map(|dt| dt.to_string()).collect();
    names.sort();
    names.dedup();
    Err(SchemaError::DtypeMismatch {
        column: column.to_string(),
        dtypes: names,
    })
}

/// Resolve the output schema: first table's column order, common dtypes.
fn resolve_schema(tables: &[DataFrame], order: &[String]) -> Result<Vec<(String, DataType)>, SchemaError> {
    order
        .iter()
        .map(|name| {
            let dtypes: Vec<&DataType> = tables
                .iter()
                .filter_map(|df| df.column(name).ok().map(|c| c.dtype()))
                .collect();
            Ok((name.clone(), common_dtype(name, &dtypes)?))
        })
        .collect()
}

/// Reorder `df` to `schema` and cast each column losslessly.
fn align_to(df: &DataFrame, schema: &[(String, DataType)]) -> Result<DataFrame> {
    let columns = schema
        .iter()
        .map(|(name, dtype)| {
            let column = df.column(name)?;
            if column.dtype() == dtype {
                Ok(column.clone())
            } else {
                column
                    .strict_cast(dtype)
                    .with_context(|| format!("Cannot cast column '{}' to {}", name, dtype))
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Concatenate tables that share one column set.
///
/// The result keeps the first table's column order. Column dtypes are the
/// common type across all inputs, so the combined rows hold the same values
/// whatever the input order. A table whose column set differs is rejected
/// with [`SchemaError::SchemaMismatch`], incompatible dtypes with
/// [`SchemaError::DtypeMismatch`].
pub fn combine_tables(tables: &[DataFrame]) -> Result<DataFrame> {
    let first = tables.first().ok_or(SchemaError::NoInputs)?;
    let expected = column_names(first);
    for (index, df) in tables.iter().enumerate().skip(1) {
        check_column_set(index, &expected, df)?;
    }
    let schema = resolve_schema(tables, &expected)?;

    let mut combined = align_to(first, &schema)?;
    for (index, df) in tables.iter().enumerate().skip(1) {
        let aligned = align_to(df, &schema)?;
        combined
            .vstack_mut(&aligned)
            .with_context(|| format!("Failed to append input #{}", index))?;
    }

    tracing::debug!(
        inputs = tables.len(),
        rows = combined.height(),
        "combined survey tables"
    );
    Ok(combined)
}

/// Load every input file and combine them.
pub fn combine_files(config: &CombineConfig) -> Result<DataFrame> {
    let tables = config
        .inputs
        .iter()
        .map(|path| load_table(path))
        .collect::<Result<Vec<_>>>()?;
    combine_tables(&tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_is_sum_of_inputs() {
        let a = df! { "x" => [1i64, 2], "y" => [0.5f64, 1.5] }.unwrap();
        let b = df! { "x" => [3i64], "y" => [2.5f64] }.unwrap();

        let out = combine_tables(&[a, b]).unwrap();
        assert_eq!(out.height(), 3);
        assert_eq!(column_names(&out), vec!["x", "y"]);
    }

    #[test]
    fn test_reorders_to_first_input() {
        let a = df! { "x" => [1i64], "y" => [0.5f64] }.unwrap();
        let b = df! { "y" => [2.5f64], "x" => [3i64] }.unwrap();

        let out = combine_tables(&[a, b]).unwrap();
        assert_eq!(column_names(&out), vec!["x", "y"]);
        let x: Vec<Option<i64>> = out.column("x").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(x, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_integer_and_float_widen_to_float() {
        let a = df! { "bmi" => [24.5f64] }.unwrap();
        let b = df! { "bmi" => [30i64] }.unwrap();

        let forward = combine_tables(&[a.clone(), b.clone()]).unwrap();
        let backward = combine_tables(&[b, a]).unwrap();
        assert_eq!(forward.column("bmi").unwrap().dtype(), &DataType::Float64);
        assert_eq!(backward.column("bmi").unwrap().dtype(), &DataType::Float64);
        let values: Vec<Option<f64>> = backward.column("bmi").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(30.0), Some(24.5)]);
    }

    #[test]
    fn test_integer_widths_widen_to_int64() {
        let a = df! { "x" => [1i32] }.unwrap();
        let b = df! { "x" => [2i64] }.unwrap();

        let out = combine_tables(&[a, b]).unwrap();
        assert_eq!(out.column("x").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_text_and_number_are_rejected() {
        let a = df! { "sex" => [1i64] }.unwrap();
        let b = df! { "sex" => ["male"] }.unwrap();

        let err = combine_tables(&[a, b]).unwrap_err();
        match err.downcast_ref::<SchemaError>() {
            Some(SchemaError::DtypeMismatch { column, dtypes }) => {
                assert_eq!(column, "sex");
                assert_eq!(dtypes.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_divergent_schema_is_rejected() {
        let a = df! { "x" => [1i64], "y" => [2i64] }.unwrap();
        let b = df! { "x" => [1i64], "z" => [2i64] }.unwrap();

        let err = combine_tables(&[a, b]).unwrap_err();
        match err.downcast_ref::<SchemaError>() {
            Some(SchemaError::SchemaMismatch {
                index,
                missing,
                unexpected,
            }) => {
                assert_eq!(*index, 1);
                assert_eq!(missing, &vec!["y".to_string()]);
                assert_eq!(unexpected, &vec!["z".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_no_inputs() {
        let err = combine_tables(&[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SchemaError>(),
            Some(SchemaError::NoInputs)
        ));
    }
}
