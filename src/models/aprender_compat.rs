//! Boundary between the f64 dataset and aprender's f32 primitives
//!
//! Datasets, artifacts and HTTP payloads carry `f64`; aprender estimators and
//! metrics work on `Matrix<f32>` / `Vector<f32>`. Every crossing goes through
//! these helpers so the narrowing happens in one place.

use crate::dataset::Matrix;
use crate::{Error, Result};
use aprender::primitives::{Matrix as F32Matrix, Vector};
use std::fmt::Display;

/// Narrow a feature matrix to aprender's representation.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_f32_matrix(x: &Matrix) -> Result<F32Matrix<f32>> {
    let data = x.as_slice().iter().map(|&v| v as f32).collect();
    F32Matrix::from_vec(x.n_rows(), x.n_cols(), data)
        .map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Narrow a target (or prediction) slice.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_f32_vector(y: &[f64]) -> Vector<f32> {
    Vector::from_vec(y.iter().map(|&v| v as f32).collect())
}

/// Widen an aprender vector back to `f64`.
pub(crate) fn to_f64_vec(v: &Vector<f32>) -> Vec<f64> {
    v.as_slice().iter().map(|&p| f64::from(p)).collect()
}

/// Copy the given rows of `x` and `y` into a new training sample.
pub(crate) fn take_rows(
    x: &F32Matrix<f32>,
    y: &[f32],
    rows: &[usize],
) -> Result<(F32Matrix<f32>, Vector<f32>)> {
    let n_cols = x.n_cols();
    let mut data = Vec::with_capacity(rows.len() * n_cols);
    for &row in rows {
        data.extend((0..n_cols).map(|col| x.get(row, col)));
    }
    let sample = F32Matrix::from_vec(rows.len(), n_cols, data)
        .map_err(|e| Error::Fit(e.to_string()))?;
    let targets = Vector::from_vec(rows.iter().map(|&row| y[row]).collect());
    Ok((sample, targets))
}

/// Map an aprender fitting error into ours.
pub(crate) fn fit_error(err: impl Display) -> Error {
    Error::Fit(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_narrowing_keeps_layout() {
        let x = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.5]).unwrap();
        let narrowed = to_f32_matrix(&x).unwrap();
        assert_eq!(narrowed.shape(), (2, 3));
        assert_eq!(narrowed.get(1, 2), 6.5);
        assert_eq!(narrowed.get(0, 1), 2.0);
    }

    #[test]
    fn test_vector_round_trip_is_exact_for_f32_values() {
        let y = [0.5, -2.0, 1024.25];
        assert_eq!(to_f64_vec(&to_f32_vector(&y)), y.to_vec());
    }

    #[test]
    fn test_take_rows_with_repeats() {
        let x = Matrix::from_vec(3, 1, vec![10.0, 20.0, 30.0]).unwrap();
        let narrowed = to_f32_matrix(&x).unwrap();
        let (sample, targets) = take_rows(&narrowed, &[1.0, 2.0, 3.0], &[2, 2, 0]).unwrap();
        assert_eq!(sample.shape(), (3, 1));
        assert_eq!(sample.get(1, 0), 30.0);
        assert_eq!(targets.as_slice(), &[3.0, 3.0, 1.0]);
    }
}
