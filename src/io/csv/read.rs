//! CSV reading operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::CsvReader};

/// Reads a CSV file from `path` into a Polars DataFrame.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Extract `(id, value)` pairs from two columns of `df`.
/// Ids must be integral and present; values may be missing.
pub(crate) fn id_value_pairs(df: &DataFrame, id_col: &str, value_col: &str) -> Result<Vec<(i64, Option<f64>)>> {
    let ids = integer_column(df, id_col)?;
    let values = df.column(value_col)
        .with_context(|| format!("[io::csv::read] Missing population column '{value_col}'"))?
        .cast(&polars::prelude::DataType::Float64)
        .with_context(|| format!("[io::csv::read] Column '{value_col}' is not numeric"))?;

    Ok(ids.into_iter()
        .zip(values.f64()?.into_iter())
        .collect())
}

/// Read an id column as non-null i64 values.
pub(crate) fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv::read] Missing id column '{name}'"))?
        .cast(&polars::prelude::DataType::Int64)
        .with_context(|| format!("[io::csv::read] Column '{name}' is not integral"))?;

    column.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, id)| id.with_context(|| format!("[io::csv::read] Missing '{name}' value in row {row}")))
        .collect()
}
