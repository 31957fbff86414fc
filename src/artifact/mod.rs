//! Model artifacts
//!
//! A [`ModelArtifact`] is a fitted candidate together with the feature names
//! it was trained on. Encoded layout:
//!
//! ```text
//! +--------+---------+-------------+------------------------------+
//! | "HSGM" | version | compression | compressed bincode payload   |
//! | 4 B    | 1 B     | 1 B         | ...                          |
//! +--------+---------+-------------+------------------------------+
//! ```
//!
//! The same bytes are stored under a tracked run (path [`MODEL_ARTIFACT_PATH`])
//! and written as a standalone packaged file for serving.

mod compression;

pub use compression::Compression;

use crate::dataset::Matrix;
use crate::models::{Estimator, Regressor};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Run-relative path every candidate's fitted model is logged under.
pub const MODEL_ARTIFACT_PATH: &str = "model";

/// Leading bytes of every encoded artifact.
pub const MAGIC: [u8; 4] = *b"HSGM";

/// Current encoding version.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// A fitted model ready to be stored, registered or served.
///
/// # Example
///
/// ```rust
/// use housing_ml::artifact::{Compression, ModelArtifact};
/// use housing_ml::dataset::Matrix;
/// use housing_ml::models::{Estimator, LinearPipeline, Regressor};
///
/// let x = Matrix::from_vec(4, 1, vec![1.0, 2.0, 3.0, 4.0])?;
/// let mut model = Regressor::from(LinearPipeline::new());
/// model.fit(&x, &[2.0, 4.0, 6.0, 8.0])?;
///
/// let artifact = ModelArtifact::new("LinearRegression", vec!["MedInc".to_string()], model);
/// let bytes = artifact.encode(Compression::Lz4)?;
/// let restored = ModelArtifact::decode(&bytes)?;
/// assert_eq!(restored.model_name(), "LinearRegression");
/// # Ok::<(), housing_ml::Error>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    model_name: String,
    feature_names: Vec<String>,
    created_at: DateTime<Utc>,
    model: Regressor,
}

impl ModelArtifact {
    /// Wrap a fitted model.
    #[must_use]
    pub fn new(
        model_name: impl Into<String>,
        feature_names: Vec<String>,
        model: Regressor,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            feature_names,
            created_at: Utc::now(),
            model,
        }
    }

    /// Candidate identifier the model was trained as.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Feature names in training column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// When the artifact was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The fitted model.
    #[must_use]
    pub const fn model(&self) -> &Regressor {
        &self.model
    }

    /// Predict rows already laid out in training column order.
    ///
    /// # Errors
    ///
    /// Propagates estimator errors.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<f64>> {
        self.model.predict(x)
    }

    /// Predict rows whose columns are named by `columns`, in any order.
    ///
    /// Every training feature must appear exactly once; extra columns are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for missing or duplicated features and
    /// propagates estimator errors.
    pub fn predict_named<S: AsRef<str>>(&self, columns: &[S], rows: &Matrix) -> Result<Vec<f64>> {
        if columns.len() != rows.n_cols() {
            return Err(Error::InvalidInput(format!(
                "{} column names for {} columns",
                columns.len(),
                rows.n_cols()
            )));
        }

        let mut positions: FxHashMap<&str, usize> = FxHashMap::default();
        for (idx, name) in columns.iter().enumerate() {
            if positions.insert(name.as_ref(), idx).is_some() {
                return Err(Error::InvalidInput(format!(
                    "duplicate column {}",
                    name.as_ref()
                )));
            }
        }

        let order = self
            .feature_names
            .iter()
            .map(|name| {
                positions
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| Error::InvalidInput(format!("missing feature {name}")))
            })
            .collect::<Result<Vec<usize>>>()?;

        if order.iter().enumerate().all(|(i, &src)| i == src) && order.len() == rows.n_cols() {
            return self.predict(rows);
        }

        let mut data = Vec::with_capacity(rows.n_rows() * order.len());
        for row in rows.rows() {
            data.extend(order.iter().map(|&src| row[src]));
        }
        self.predict(&Matrix::from_vec(rows.n_rows(), order.len(), data)?)
    }

    /// Encode with the given payload compression.
    ///
    /// # Errors
    ///
    /// Returns `Artifact` if serialization or compression fails.
    pub fn encode(&self, compression: Compression) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)
            .map_err(|e| Error::Artifact(format!("failed to serialize model: {e}")))?;
        let compressed = compression.compress(&payload)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.push(compression.id());
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }

    /// Decode bytes produced by [`encode`](Self::encode).
    ///
    /// # Errors
    ///
    /// Returns `Artifact` for a bad header, an unsupported version, or a
    /// corrupt payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::Artifact("not a housing-ml model artifact".to_string()));
        }
        let version = bytes[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(Error::Artifact(format!(
                "unsupported artifact version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let compression = Compression::from_id(bytes[MAGIC.len() + 1])?;
        let payload = compression.decompress(&bytes[HEADER_LEN..])?;
        bincode::deserialize(&payload)
            .map_err(|e| Error::Artifact(format!("failed to deserialize model: {e}")))
    }

    /// Write a packaged artifact file.
    ///
    /// # Errors
    ///
    /// Returns `Artifact` on encoding failure and `Io` on write failure.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.encode(Compression::default())?;
        fs::write(path.as_ref(), bytes)?;
        tracing::info!(
            path = %path.as_ref().display(),
            model = %self.model_name,
            "wrote model artifact"
        );
        Ok(())
    }

    /// Read a packaged artifact file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `Artifact` if it does not
    /// decode.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::decode(&bytes)
    }
}
