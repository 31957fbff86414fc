//! Dataset provider: California-housing-shaped tabular data
//!
//! A [`HousingSource`] yields the full [`Dataset`]; [`get_data`] turns it
//! into a seeded, reproducible train/test [`DatasetSplit`].
//!
//! ```rust
//! use housing_ml::dataset::{get_data, HousingSource};
//!
//! let source = HousingSource::synthetic(200);
//! let split = get_data(&source, 0.2, 42)?;
//! assert_eq!(split.x_test().n_rows(), 40);
//! assert_eq!(split.x_train().n_rows(), 160);
//! # Ok::<(), housing_ml::Error>(())
//! ```

mod columnar;
mod matrix;
mod synthetic;

pub use columnar::load_parquet;
pub use matrix::Matrix;
pub use synthetic::{synthetic_housing, SYNTHETIC_SEED};

use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::PathBuf;

/// Feature columns, in canonical order.
pub const FEATURE_NAMES: [&str; 8] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];

/// Target column (median house value, in units of $100 000).
pub const TARGET_NAME: &str = "MedHouseVal";

/// Row count of the reference California housing table.
pub const DEFAULT_N_SAMPLES: usize = 20_640;

/// Full, unsplit dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    features: Matrix,
    targets: Vec<f64>,
}

impl Dataset {
    /// Build a dataset, checking that features and targets line up.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on a row/target count or column/name mismatch.
    pub fn new(feature_names: Vec<String>, features: Matrix, targets: Vec<f64>) -> Result<Self> {
        if features.n_rows() != targets.len() {
            return Err(Error::InvalidInput(format!(
                "{} feature rows but {} targets",
                features.n_rows(),
                targets.len()
            )));
        }
        if features.n_cols() != feature_names.len() {
            return Err(Error::InvalidInput(format!(
                "{} feature columns but {} feature names",
                features.n_cols(),
                feature_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            features,
            targets,
        })
    }

    /// Feature names, aligned with matrix columns.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Feature matrix.
    #[must_use]
    pub const fn features(&self) -> &Matrix {
        &self.features
    }

    /// Target values.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when the dataset has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Train/test partition produced once per training invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    feature_names: Vec<String>,
    x_train: Matrix,
    x_test: Matrix,
    y_train: Vec<f64>,
    y_test: Vec<f64>,
}

impl DatasetSplit {
    /// Assemble a split from pre-partitioned data.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if either partition is empty, rows and targets
    /// disagree, or the partitions have different widths.
    pub fn new(
        feature_names: Vec<String>,
        x_train: Matrix,
        x_test: Matrix,
        y_train: Vec<f64>,
        y_test: Vec<f64>,
    ) -> Result<Self> {
        if x_train.is_empty() || x_test.is_empty() {
            return Err(Error::InvalidInput(
                "train and test partitions must both be non-empty".to_string(),
            ));
        }
        if x_train.n_rows() != y_train.len() || x_test.n_rows() != y_test.len() {
            return Err(Error::InvalidInput(
                "feature rows and targets differ in length".to_string(),
            ));
        }
        if x_train.n_cols() != x_test.n_cols() || x_train.n_cols() != feature_names.len() {
            return Err(Error::InvalidInput(
                "train/test partitions and feature names disagree on width".to_string(),
            ));
        }
        Ok(Self {
            feature_names,
            x_train,
            x_test,
            y_train,
            y_test,
        })
    }

    /// Feature names shared by both partitions.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Training features.
    #[must_use]
    pub const fn x_train(&self) -> &Matrix {
        &self.x_train
    }

    /// Held-out features.
    #[must_use]
    pub const fn x_test(&self) -> &Matrix {
        &self.x_test
    }

    /// Training targets.
    #[must_use]
    pub fn y_train(&self) -> &[f64] {
        &self.y_train
    }

    /// Held-out targets.
    #[must_use]
    pub fn y_test(&self) -> &[f64] {
        &self.y_test
    }
}

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HousingSource {
    /// Parquet file holding the eight feature columns and `MedHouseVal`
    Parquet(PathBuf),
    /// Deterministic generator with the same schema
    Synthetic {
        /// Number of rows to generate
        n_samples: usize,
    },
}

impl HousingSource {
    /// Synthetic source with `n_samples` rows.
    #[must_use]
    pub const fn synthetic(n_samples: usize) -> Self {
        Self::Synthetic { n_samples }
    }

    /// Parquet-backed source.
    #[must_use]
    pub fn parquet(path: impl Into<PathBuf>) -> Self {
        Self::Parquet(path.into())
    }

    /// Read the full dataset. The source itself is never modified.
    ///
    /// # Errors
    ///
    /// Propagates Parquet read/schema errors.
    pub fn load(&self) -> Result<Dataset> {
        match self {
            Self::Parquet(path) => load_parquet(path),
            Self::Synthetic { n_samples } => synthetic_housing(*n_samples, SYNTHETIC_SEED),
        }
    }
}

impl Default for HousingSource {
    fn default() -> Self {
        Self::synthetic(DEFAULT_N_SAMPLES)
    }
}

/// Load `source` and split it into train/test partitions.
///
/// Row indices are shuffled with a `StdRng` seeded from `random_state`;
/// the test partition takes the first `ceil(n * test_size)` shuffled rows.
/// The same `(source, test_size, random_state)` always yields the same split.
///
/// # Errors
///
/// Returns `InvalidInput` if `test_size` is outside (0, 1) or would leave a
/// partition empty, plus any error from loading the source.
pub fn get_data(source: &HousingSource, test_size: f64, random_state: u64) -> Result<DatasetSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidInput(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let dataset = source.load()?;
    train_test_split(&dataset, test_size, random_state)
}

/// Split an in-memory dataset (see [`get_data`]).
///
/// # Errors
///
/// Returns `InvalidInput` if either partition would be empty.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn train_test_split(
    dataset: &Dataset,
    test_size: f64,
    random_state: u64,
) -> Result<DatasetSplit> {
    let n_samples = dataset.len();
    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(Error::InvalidInput(format!(
            "test_size={test_size} leaves an empty partition for {n_samples} samples"
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(random_state);
    indices.shuffle(&mut rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let targets = dataset.targets();
    DatasetSplit::new(
        dataset.feature_names().to_vec(),
        dataset.features().select_rows(train_idx),
        dataset.features().select_rows(test_idx),
        train_idx.iter().map(|&i| targets[i]).collect(),
        test_idx.iter().map(|&i| targets[i]).collect(),
    )
}
