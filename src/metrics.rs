//! Regression quality metrics
//!
//! [`eval_regression`] is a pure function of its inputs. Validation happens
//! here; the arithmetic is delegated to `aprender::metrics` in `f32`.

use crate::models::to_f32_vector;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Metric key for root-mean-squared error.
pub const RMSE: &str = "rmse";
/// Metric key for mean absolute error.
pub const MAE: &str = "mae";
/// Metric key for the coefficient of determination.
pub const R2: &str = "r2";

/// Metrics computed once per candidate per training invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root-mean-squared error (≥ 0)
    pub rmse: f64,
    /// Mean absolute error (≥ 0)
    pub mae: f64,
    /// Coefficient of determination (≤ 1, negative when worse than the mean)
    pub r2: f64,
}

impl RegressionMetrics {
    /// `(key, value)` pairs in logging order.
    #[must_use]
    pub fn as_pairs(&self) -> [(&'static str, f64); 3] {
        [(RMSE, self.rmse), (MAE, self.mae), (R2, self.r2)]
    }
}

/// Compute RMSE, MAE and R² for `y_pred` against `y_true`.
///
/// When the targets are constant, R² is 1.0 for a perfect prediction and 0.0
/// otherwise.
///
/// # Errors
///
/// Returns `InvalidInput` if the inputs are empty, differ in length, or
/// contain values that are not finite in `f32`. Inputs are never truncated
/// or padded.
///
/// # Examples
///
/// ```
/// use housing_ml::metrics::eval_regression;
///
/// let metrics = eval_regression(&[3.0, -0.5, 2.0, 7.0], &[2.5, 0.0, 2.0, 8.0])?;
/// assert!((metrics.mae - 0.5).abs() < 1e-6);
/// assert!(metrics.r2 > 0.9);
/// # Ok::<(), housing_ml::Error>(())
/// ```
pub fn eval_regression(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
    if y_true.len() != y_pred.len() {
        return Err(Error::InvalidInput(format!(
            "y_true has {} values but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(Error::InvalidInput(
            "cannot evaluate empty predictions".to_string(),
        ));
    }
    if y_true
        .iter()
        .chain(y_pred)
        .any(|v| !v.is_finite() || v.abs() > f64::from(f32::MAX))
    {
        return Err(Error::InvalidInput(
            "targets and predictions must be finite".to_string(),
        ));
    }

    let truth = to_f32_vector(y_true);
    let predicted = to_f32_vector(y_pred);
    let rmse = aprender::metrics::rmse(&predicted, &truth);
    let mae = aprender::metrics::mae(&predicted, &truth);
    let mut r2 = aprender::metrics::r_squared(&predicted, &truth);

    // aprender scores constant targets as 0.0 even when predicted exactly
    if r2 == 0.0 && rmse == 0.0 {
        r2 = 1.0;
    }

    Ok(RegressionMetrics {
        rmse: f64::from(rmse),
        mae: f64::from(mae),
        r2: f64::from(r2),
    })
}
