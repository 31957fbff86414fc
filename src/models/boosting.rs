//! Gradient boosting regressor (least-squares loss)

use super::aprender_compat::{fit_error, take_rows, to_f32_matrix, to_f64_vec};
use super::{check_prediction_input, check_training_data, param_float, Estimator};
use crate::dataset::Matrix;
use crate::{Error, Result};
use aprender::primitives::Vector;
use aprender::tree::DecisionTreeRegressor;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Gradient boosting over shallow regression trees.
///
/// Stage 0 predicts the training mean; each following stage fits a tree to
/// the current residuals and is added with weight `learning_rate`. With
/// `subsample < 1.0` every stage sees a random subset of rows drawn without
/// replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    subsample: f64,
    random_state: Option<u64>,
    init: f64,
    stages: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl GradientBoostingRegressor {
    /// 100 stages of depth-3 trees, learning rate 0.1, no subsampling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            subsample: 1.0,
            random_state: None,
            init: 0.0,
            stages: Vec::new(),
            n_features: 0,
        }
    }

    /// Number of boosting stages.
    #[must_use]
    pub const fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Shrinkage applied to every stage.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Depth of each stage tree.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fraction of rows used per stage, in `(0, 1]`.
    #[must_use]
    pub const fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
        self
    }

    /// Seed for reproducible subsampling.
    #[must_use]
    pub const fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Configured stage count.
    #[must_use]
    pub const fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Configured shrinkage.
    #[must_use]
    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Configured seed.
    #[must_use]
    pub const fn random_state(&self) -> Option<u64> {
        self.random_state
    }

    /// Fitted stage trees.
    #[must_use]
    pub fn stages(&self) -> &[DecisionTreeRegressor] {
        &self.stages
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(Error::Fit("n_estimators must be positive".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Fit(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(Error::Fit(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        Ok(())
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Estimator for GradientBoostingRegressor {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.n_rows();
        let sample_size =
            ((n_samples as f64 * self.subsample).round() as usize).clamp(1, n_samples);
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let features = to_f32_matrix(x)?;
        let init = y.iter().sum::<f64>() / n_samples as f64;
        let mut current = vec![init; n_samples];
        let mut residuals = vec![0.0_f32; n_samples];
        let mut stages = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            for ((r, &target), &pred) in residuals.iter_mut().zip(y).zip(&current) {
                *r = (target - pred) as f32;
            }

            let mut tree = DecisionTreeRegressor::new().with_max_depth(self.max_depth);
            if sample_size < n_samples {
                let rows = index::sample(&mut rng, n_samples, sample_size).into_vec();
                let (sample, targets) = take_rows(&features, &residuals, &rows)?;
                tree.fit(&sample, &targets).map_err(fit_error)?;
            } else {
                tree.fit(&features, &Vector::from_slice(&residuals)).map_err(fit_error)?;
            }

            let step = to_f64_vec(&tree.predict(&features));
            for (pred, delta) in current.iter_mut().zip(step) {
                *pred += self.learning_rate * delta;
            }
            stages.push(tree);
        }

        self.init = init;
        self.stages = stages;
        self.n_features = x.n_cols();
        tracing::trace!(stages = self.stages.len(), init, "gradient boosting fitted");
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        if self.stages.is_empty() {
            return Err(Error::NotFitted);
        }
        check_prediction_input(x, self.n_features)?;

        let features = to_f32_matrix(x)?;
        let mut values = vec![self.init; x.n_rows()];
        for tree in &self.stages {
            let step = to_f64_vec(&tree.predict(&features));
            for (value, delta) in values.iter_mut().zip(step) {
                *value += self.learning_rate * delta;
            }
        }
        Ok(values)
    }

    fn hyperparameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("n_estimators", self.n_estimators.to_string()),
            ("learning_rate", param_float(self.learning_rate)),
            ("max_depth", self.max_depth.to_string()),
            ("subsample", param_float(self.subsample)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::eval_regression;

    fn curve_data() -> (Matrix, Vec<f64>) {
        let xs: Vec<f64> = (0..40).map(|i| f64::from(i) / 4.0).collect();
        let y: Vec<f64> = xs.iter().map(|v| v.sin() * 3.0 + v).collect();
        (Matrix::from_vec(xs.len(), 1, xs).unwrap(), y)
    }

    #[test]
    fn test_training_error_decreases_with_stages() {
        let (x, y) = curve_data();
        let mut short = GradientBoostingRegressor::new()
            .with_n_estimators(5)
            .with_random_state(42);
        let mut long = GradientBoostingRegressor::new()
            .with_n_estimators(80)
            .with_random_state(42);
        short.fit(&x, &y).unwrap();
        long.fit(&x, &y).unwrap();

        let short_rmse = eval_regression(&y, &short.predict(&x).unwrap()).unwrap().rmse;
        let long_rmse = eval_regression(&y, &long.predict(&x).unwrap()).unwrap().rmse;
        assert!(long_rmse < short_rmse);
    }

    #[test]
    fn test_single_stage_is_shrunk_toward_mean() {
        let x = Matrix::from_vec(4, 1, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let y = [0.0, 0.0, 10.0, 10.0];
        let mut gb = GradientBoostingRegressor::new()
            .with_n_estimators(1)
            .with_max_depth(1)
            .with_learning_rate(0.5);
        gb.fit(&x, &y).unwrap();
        let preds = gb.predict(&x).unwrap();
        // init 5.0, residuals -5/+5, half a step
        assert!((preds[0] - 2.5).abs() < 1e-6);
        assert!((preds[3] - 7.5).abs() < 1e-6);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = curve_data();
        let fit = |seed| {
            let mut gb = GradientBoostingRegressor::new()
                .with_n_estimators(10)
                .with_subsample(0.5)
                .with_random_state(seed);
            gb.fit(&x, &y).unwrap();
            gb.predict(&x).unwrap()
        };
        assert_eq!(fit(3), fit(3));
    }

    #[test]
    fn test_invalid_hyperparameters() {
        let (x, y) = curve_data();
        let mut gb = GradientBoostingRegressor::new().with_subsample(0.0);
        assert!(matches!(gb.fit(&x, &y), Err(Error::Fit(_))));
        let mut gb = GradientBoostingRegressor::new().with_learning_rate(-1.0);
        assert!(matches!(gb.fit(&x, &y), Err(Error::Fit(_))));
        let mut gb = GradientBoostingRegressor::new().with_n_estimators(0);
        assert!(matches!(gb.fit(&x, &y), Err(Error::Fit(_))));
    }

    #[test]
    fn test_hyperparameters_logged_as_strings() {
        let params = GradientBoostingRegressor::new().hyperparameters();
        assert_eq!(params[0], ("n_estimators", "100".to_string()));
        assert_eq!(params[1], ("learning_rate", "0.1".to_string()));
        assert_eq!(params[2], ("max_depth", "3".to_string()));
        assert_eq!(params[3], ("subsample", "1.0".to_string()));

        let tuned = GradientBoostingRegressor::new()
            .with_learning_rate(0.05)
            .with_subsample(0.8)
            .hyperparameters();
        assert_eq!(tuned[1].1, "0.05");
        assert_eq!(tuned[3].1, "0.8");
    }
}
