//! Random forest regressor (bagged aprender regression trees)

use super::aprender_compat::{fit_error, take_rows, to_f32_matrix, to_f32_vector};
use super::{check_prediction_input, check_training_data, param_bool, param_optional, Estimator};
use crate::dataset::Matrix;
use crate::{Error, Result};
use aprender::primitives::{Matrix as F32Matrix, Vector};
use aprender::tree::DecisionTreeRegressor;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Random forest regressor.
///
/// Each tree is grown on a bootstrap sample (when `bootstrap` is set) drawn
/// from its own seed; seeds are derived up front from `random_state`, so the
/// fitted forest does not depend on how trees are scheduled across threads.
///
/// ```
/// use housing_ml::dataset::Matrix;
/// use housing_ml::models::{Estimator, RandomForestRegressor};
///
/// let x = Matrix::from_vec(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0])?;
/// let y = [2.0, 4.0, 6.0, 8.0, 10.0];
///
/// let mut rf = RandomForestRegressor::new(10).with_random_state(42);
/// rf.fit(&x, &y)?;
/// assert_eq!(rf.predict(&x)?.len(), 5);
/// # Ok::<(), housing_ml::Error>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    bootstrap: bool,
    random_state: Option<u64>,
    trees: Vec<DecisionTreeRegressor>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Forest of `n_estimators` fully grown trees with bootstrapping.
    #[must_use]
    pub const fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: None,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    /// Limit the depth of every tree.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Minimum samples a node needs before it may split.
    #[must_use]
    pub const fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Minimum samples on each side of a split.
    #[must_use]
    pub const fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Grow trees on bootstrap samples (`true`) or on the full training set.
    #[must_use]
    pub const fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Seed for reproducible fitting.
    #[must_use]
    pub const fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Configured tree count.
    #[must_use]
    pub const fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Configured depth limit.
    #[must_use]
    pub const fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Configured split threshold.
    #[must_use]
    pub const fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Configured leaf size.
    #[must_use]
    pub const fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Whether trees see bootstrap samples.
    #[must_use]
    pub const fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Configured seed.
    #[must_use]
    pub const fn random_state(&self) -> Option<u64> {
        self.random_state
    }

    /// Fitted trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTreeRegressor] {
        &self.trees
    }

    fn tree_seeds(&self) -> Vec<u64> {
        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..self.n_estimators).map(|_| rng.gen()).collect()
    }

    fn base_tree(&self) -> DecisionTreeRegressor {
        let tree = DecisionTreeRegressor::new()
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf);
        match self.max_depth {
            Some(depth) => tree.with_max_depth(depth),
            None => tree,
        }
    }

    fn grow_tree(
        &self,
        x: &F32Matrix<f32>,
        y: &[f32],
        seed: u64,
    ) -> Result<DecisionTreeRegressor> {
        let mut tree = self.base_tree();
        if self.bootstrap {
            let n_samples = x.n_rows();
            let mut rng = StdRng::seed_from_u64(seed);
            let dist = Uniform::from(0..n_samples);
            let rows: Vec<usize> = (0..n_samples).map(|_| dist.sample(&mut rng)).collect();
            let (sample, targets) = take_rows(x, y, &rows)?;
            tree.fit(&sample, &targets).map_err(fit_error)?;
        } else {
            tree.fit(x, &Vector::from_slice(y)).map_err(fit_error)?;
        }
        Ok(tree)
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Estimator for RandomForestRegressor {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(Error::Fit("n_estimators must be positive".to_string()));
        }

        let features = to_f32_matrix(x)?;
        let targets = to_f32_vector(y);
        let targets = targets.as_slice();
        let seeds = self.tree_seeds();

        #[cfg(feature = "parallel")]
        let trees = {
            use rayon::prelude::*;
            seeds
                .par_iter()
                .map(|&seed| self.grow_tree(&features, targets, seed))
                .collect::<Result<Vec<_>>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let trees = seeds
            .iter()
            .map(|&seed| self.grow_tree(&features, targets, seed))
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = x.n_cols();
        tracing::trace!(trees = self.trees.len(), "random forest fitted");
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(Error::NotFitted);
        }
        check_prediction_input(x, self.n_features)?;

        let features = to_f32_matrix(x)?;
        let mut totals = vec![0.0_f64; x.n_rows()];
        for tree in &self.trees {
            let preds = tree.predict(&features);
            for (total, &p) in totals.iter_mut().zip(preds.as_slice()) {
                *total += f64::from(p);
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(totals.into_iter().map(|total| total / n_trees).collect())
    }

    fn hyperparameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("n_estimators", self.n_estimators.to_string()),
            ("max_depth", param_optional(self.max_depth)),
            ("min_samples_split", self.min_samples_split.to_string()),
            ("min_samples_leaf", self.min_samples_leaf.to_string()),
            ("bootstrap", param_bool(self.bootstrap)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_data() -> (Matrix, Vec<f64>) {
        // y = 2 * x1 + 3 * x2 on a small grid
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..6 {
            for j in 0..4 {
                rows.push(vec![f64::from(i), f64::from(j)]);
                y.push(2.0 * f64::from(i) + 3.0 * f64::from(j));
            }
        }
        (Matrix::from_rows(&rows).unwrap(), y)
    }

    #[test]
    fn test_fit_predict_shape() {
        let (x, y) = regression_data();
        let mut rf = RandomForestRegressor::new(8).with_random_state(42);
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.trees().len(), 8);
        assert_eq!(rf.predict(&x).unwrap().len(), y.len());
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (x, y) = regression_data();
        let mut a = RandomForestRegressor::new(6).with_random_state(7);
        let mut b = RandomForestRegressor::new(6).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_without_bootstrap_fits_training_set_exactly() {
        let (x, y) = regression_data();
        let mut rf = RandomForestRegressor::new(3)
            .with_bootstrap(false)
            .with_random_state(1);
        rf.fit(&x, &y).unwrap();
        for (p, t) in rf.predict(&x).unwrap().iter().zip(&y) {
            assert!((p - t).abs() < 1e-4);
        }
    }

    #[test]
    #[allow(clippy::cast_precision_loss)]
    fn test_depth_limit_reaches_base_trees() {
        let (x, y) = regression_data();
        let mut stump = RandomForestRegressor::new(1)
            .with_bootstrap(false)
            .with_max_depth(Some(0));
        stump.fit(&x, &y).unwrap();
        let preds = stump.predict(&x).unwrap();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        assert!(preds.iter().all(|p| (p - mean).abs() < 1e-4));
    }

    #[test]
    fn test_zero_estimators_rejected() {
        let (x, y) = regression_data();
        let mut rf = RandomForestRegressor::new(0);
        assert!(matches!(rf.fit(&x, &y), Err(Error::Fit(_))));
    }

    #[test]
    fn test_hyperparameters() {
        let rf = RandomForestRegressor::new(300).with_random_state(42);
        let params = rf.hyperparameters();
        let keys: Vec<&str> = params.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "n_estimators",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "bootstrap"
            ]
        );
        assert_eq!(params[0].1, "300");
        assert_eq!(params[1].1, "None");
        assert_eq!(params[4].1, "True");

        let shallow = RandomForestRegressor::new(10).with_max_depth(Some(4));
        assert_eq!(shallow.hyperparameters()[1].1, "4");
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = regression_data();
        assert!(matches!(
            RandomForestRegressor::new(2).predict(&x),
            Err(Error::NotFitted)
        ));
    }
}
