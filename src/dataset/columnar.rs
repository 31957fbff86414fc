//! Parquet-backed dataset loading (Arrow record batches)
//!
//! Columns are matched by name, so file column order is irrelevant and extra
//! columns are ignored. Numeric columns of any common width are widened to
//! `f64`.

use super::{Dataset, Matrix, FEATURE_NAMES, TARGET_NAME};
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use std::fs::File;
use std::path::Path;

/// Load the housing table from a Parquet file.
///
/// # Errors
///
/// Returns `StorageError` if the file cannot be opened or parsed, a required
/// column is missing, a column is not numeric, or a value is null.
pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        Error::StorageError(format!("Failed to open Parquet file {}: {e}", path.display()))
    })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;

    let reader = builder
        .build()
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        let batch =
            batch.map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?;
        batches.push(batch);
    }

    let dataset = dataset_from_batches(&batches)?;
    tracing::debug!(path = %path.display(), rows = dataset.len(), "loaded housing dataset");
    Ok(dataset)
}

/// Assemble a dataset from record batches sharing the housing schema.
///
/// # Errors
///
/// See [`load_parquet`].
pub fn dataset_from_batches(batches: &[RecordBatch]) -> Result<Dataset> {
    let n_rows: usize = batches.iter().map(RecordBatch::num_rows).sum();
    let n_cols = FEATURE_NAMES.len();
    let mut data = vec![0.0; n_rows * n_cols];
    let mut targets = Vec::with_capacity(n_rows);

    let mut row_offset = 0;
    for batch in batches {
        for (col, name) in FEATURE_NAMES.iter().enumerate() {
            let values = numeric_column(batch, name)?;
            for (i, value) in values.into_iter().enumerate() {
                data[(row_offset + i) * n_cols + col] = value;
            }
        }
        targets.extend(numeric_column(batch, TARGET_NAME)?);
        row_offset += batch.num_rows();
    }

    Dataset::new(
        FEATURE_NAMES.iter().map(ToString::to_string).collect(),
        Matrix::from_vec(n_rows, n_cols, data)?,
        targets,
    )
}

fn numeric_column(batch: &RecordBatch, name: &str) -> Result<Vec<f64>> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::StorageError(format!("Missing required column: {name}")))?;
    let column = batch.column(index);

    if column.null_count() > 0 {
        return Err(Error::StorageError(format!(
            "Column {name} contains {} null values",
            column.null_count()
        )));
    }

    widen_to_f64(column, name)
}

#[allow(clippy::cast_precision_loss)]
fn widen_to_f64(column: &ArrayRef, name: &str) -> Result<Vec<f64>> {
    let downcast_err =
        |ty: &str| Error::StorageError(format!("Failed to downcast column {name} to {ty}"));

    match column.data_type() {
        DataType::Float64 => {
            let array = column
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| downcast_err("Float64Array"))?;
            Ok(array.values().to_vec())
        }
        DataType::Float32 => {
            let array = column
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| downcast_err("Float32Array"))?;
            Ok(array.values().iter().map(|&v| f64::from(v)).collect())
        }
        DataType::Int32 => {
            let array = column
                .as_any()
                .downcast_ref::<Int32Array>()
                .ok_or_else(|| downcast_err("Int32Array"))?;
            Ok(array.values().iter().map(|&v| f64::from(v)).collect())
        }
        DataType::Int64 => {
            let array = column
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| downcast_err("Int64Array"))?;
            Ok(array.values().iter().map(|&v| v as f64).collect())
        }
        dt => Err(Error::StorageError(format!(
            "Column {name} has unsupported data type: {dt:?}"
        ))),
    }
}
