//! Candidate regressors
//!
//! Three estimators compete for every training invocation:
//!
//! | Name               | Estimator                                     |
//! |--------------------|-----------------------------------------------|
//! | `LinearRegression` | [`LinearPipeline`] (scaler + least squares)   |
//! | `RandomForest`     | [`RandomForestRegressor`] (300 trees)         |
//! | `GradientBoosting` | [`GradientBoostingRegressor`] (100 stages)    |
//!
//! The scaler, least-squares solver and CART trees come from `aprender`;
//! bagging and boosting are layered on top of its `DecisionTreeRegressor`.
//!
//! [`get_models`] returns fresh, unfitted candidates in that order; the
//! order is the tie-break order used during model selection.

mod aprender_compat;
mod boosting;
mod forest;
mod linear;

pub(crate) use aprender_compat::to_f32_vector;
pub use boosting::GradientBoostingRegressor;
pub use forest::RandomForestRegressor;
pub use linear::LinearPipeline;

use crate::dataset::Matrix;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Supervised regressor with the fit/predict capability.
pub trait Estimator {
    /// Fit the model to training rows `x` and targets `y`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed data and `Fit` when the model
    /// cannot be fitted.
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()>;

    /// Predict one value per row of `x`.
    ///
    /// # Errors
    ///
    /// Returns `NotFitted` before `fit`, `InvalidInput` on a width mismatch.
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>>;

    /// Hyperparameters worth recording, as `(name, value)` pairs.
    fn hyperparameters(&self) -> Vec<(&'static str, String)>;
}

/// A fitted-or-unfitted candidate model, serializable as an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Regressor {
    /// Standardized ordinary least squares
    Linear(LinearPipeline),
    /// Bagged regression trees
    RandomForest(RandomForestRegressor),
    /// Boosted shallow trees
    GradientBoosting(GradientBoostingRegressor),
}

impl Regressor {
    /// Human-readable estimator family.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear_regression",
            Self::RandomForest(_) => "random_forest",
            Self::GradientBoosting(_) => "gradient_boosting",
        }
    }
}

impl Estimator for Regressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        match self {
            Self::Linear(m) => m.fit(x, y),
            Self::RandomForest(m) => m.fit(x, y),
            Self::GradientBoosting(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
            Self::GradientBoosting(m) => m.predict(x),
        }
    }

    fn hyperparameters(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Linear(m) => m.hyperparameters(),
            Self::RandomForest(m) => m.hyperparameters(),
            Self::GradientBoosting(m) => m.hyperparameters(),
        }
    }
}

impl From<LinearPipeline> for Regressor {
    fn from(model: LinearPipeline) -> Self {
        Self::Linear(model)
    }
}

impl From<RandomForestRegressor> for Regressor {
    fn from(model: RandomForestRegressor) -> Self {
        Self::RandomForest(model)
    }
}

impl From<GradientBoostingRegressor> for Regressor {
    fn from(model: GradientBoostingRegressor) -> Self {
        Self::GradientBoosting(model)
    }
}

/// A named candidate entering model selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    name: String,
    model: Regressor,
}

impl Candidate {
    /// Create a candidate
    pub fn new(name: impl Into<String>, model: impl Into<Regressor>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }

    /// Candidate name (unique within one invocation)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The estimator
    #[must_use]
    pub const fn model(&self) -> &Regressor {
        &self.model
    }

    /// Split into name and estimator
    #[must_use]
    pub fn into_parts(self) -> (String, Regressor) {
        (self.name, self.model)
    }
}

/// Fresh candidate set, seeded with `random_state` where the model is
/// stochastic.
///
/// # Examples
///
/// ```
/// use housing_ml::models::get_models;
///
/// let names: Vec<String> = get_models(42).iter().map(|c| c.name().to_string()).collect();
/// assert_eq!(names, ["LinearRegression", "RandomForest", "GradientBoosting"]);
/// ```
#[must_use]
pub fn get_models(random_state: u64) -> Vec<Candidate> {
    vec![
        Candidate::new("LinearRegression", LinearPipeline::new()),
        Candidate::new(
            "RandomForest",
            RandomForestRegressor::new(300)
                .with_max_depth(None)
                .with_random_state(random_state),
        ),
        Candidate::new(
            "GradientBoosting",
            GradientBoostingRegressor::new().with_random_state(random_state),
        ),
    ]
}

/// Float hyperparameter as recorded: always with a decimal point (`1.0`, `0.1`).
pub(crate) fn param_float(value: f64) -> String {
    format!("{value:?}")
}

/// Optional hyperparameter as recorded: `None` when unset.
pub(crate) fn param_optional(value: Option<usize>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

/// Boolean hyperparameter as recorded: `True` / `False`.
pub(crate) fn param_bool(value: bool) -> String {
    let rendered = if value { "True" } else { "False" };
    rendered.to_string()
}

pub(crate) fn check_training_data(x: &Matrix, y: &[f64]) -> Result<()> {
    if x.n_rows() == 0 || x.n_cols() == 0 {
        return Err(Error::InvalidInput(
            "training data must have at least one row and one column".to_string(),
        ));
    }
    if x.n_rows() != y.len() {
        return Err(Error::InvalidInput(format!(
            "x has {} rows but y has {} values",
            x.n_rows(),
            y.len()
        )));
    }
    if !x.is_finite() || y.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput(
            "training data must be finite".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_prediction_input(x: &Matrix, n_features: usize) -> Result<()> {
    if x.n_cols() != n_features {
        return Err(Error::InvalidInput(format!(
            "expected {n_features} features, got {}",
            x.n_cols()
        )));
    }
    if !x.is_finite() {
        return Err(Error::InvalidInput(
            "prediction input must be finite".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order_and_seeds() {
        let models = get_models(7);
        assert_eq!(models.len(), 3);
        match models[1].model() {
            Regressor::RandomForest(rf) => {
                assert_eq!(rf.n_estimators(), 300);
                assert_eq!(rf.max_depth(), None);
                assert_eq!(rf.random_state(), Some(7));
            }
            other => panic!("unexpected candidate {}", other.kind()),
        }
        match models[2].model() {
            Regressor::GradientBoosting(gb) => assert_eq!(gb.random_state(), Some(7)),
            other => panic!("unexpected candidate {}", other.kind()),
        }
    }

    #[test]
    fn test_regressor_delegates() {
        let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let y = [3.0, 5.0, 7.0, 9.0];
        let mut model = Regressor::from(LinearPipeline::new());
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert!((preds[2] - 7.0).abs() < 1e-4);
        assert!(model.hyperparameters().is_empty());
    }

    #[test]
    fn test_param_formatting() {
        assert_eq!(param_float(1.0), "1.0");
        assert_eq!(param_float(0.1), "0.1");
        assert_eq!(param_float(100.0), "100.0");
        assert_eq!(param_optional(None), "None");
        assert_eq!(param_optional(Some(3)), "3");
        assert_eq!(param_bool(true), "True");
        assert_eq!(param_bool(false), "False");
    }

    #[test]
    fn test_check_training_data() {
        let x = Matrix::from_vec(2, 1, vec![1.0, 2.0]).unwrap();
        assert!(check_training_data(&x, &[1.0]).is_err());
        assert!(check_training_data(&x, &[1.0, f64::NAN]).is_err());
        assert!(check_training_data(&x, &[1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_check_prediction_input_width() {
        let x = Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            check_prediction_input(&x, 8),
            Err(Error::InvalidInput(_))
        ));
    }
}
