//! Standardized ordinary least squares
//!
//! [`LinearPipeline`] chains aprender's `StandardScaler` with its
//! `LinearRegression` (normal equations via Cholesky). The fitted
//! coefficients are copied out so the pipeline serializes as part of an
//! artifact.

use super::aprender_compat::{fit_error, to_f32_matrix, to_f32_vector};
use super::{check_prediction_input, check_training_data, Estimator};
use crate::dataset::Matrix;
use crate::{Error, Result};
use aprender::linear_model::LinearRegression;
use aprender::preprocessing::StandardScaler;
use aprender::traits::{Estimator as _, Transformer};
use serde::{Deserialize, Serialize};

/// Scaler followed by least squares.
///
/// Constant columns are centered but left unscaled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearPipeline {
    scaler: StandardScaler,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearPipeline {
    /// Unfitted pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scaler: StandardScaler::new(),
            intercept: 0.0,
            coefficients: Vec::new(),
        }
    }

    /// Fitted scaler stage.
    #[must_use]
    pub const fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Intercept in standardized feature space.
    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficients in standardized feature space, one per feature.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Estimator for LinearPipeline {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;
        let features = to_f32_matrix(x)?;
        let targets = to_f32_vector(y);

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&features).map_err(fit_error)?;
        let mut ols = LinearRegression::new();
        ols.fit(&scaled, &targets).map_err(fit_error)?;

        self.coefficients = ols
            .coefficients()
            .as_slice()
            .iter()
            .map(|&c| f64::from(c))
            .collect();
        self.intercept = f64::from(ols.intercept());
        self.scaler = scaler;
        if self.coefficients.iter().any(|c| !c.is_finite()) || !self.intercept.is_finite() {
            self.coefficients.clear();
            return Err(Error::Fit(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        if self.coefficients.is_empty() {
            return Err(Error::NotFitted);
        }
        check_prediction_input(x, self.coefficients.len())?;
        let scaled = self
            .scaler
            .transform(&to_f32_matrix(x)?)
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok((0..scaled.n_rows())
            .map(|row| {
                self.intercept
                    + self
                        .coefficients
                        .iter()
                        .enumerate()
                        .map(|(col, c)| f64::from(scaled.get(row, col)) * c)
                        .sum::<f64>()
            })
            .collect())
    }

    fn hyperparameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}
