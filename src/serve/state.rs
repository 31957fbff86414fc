//! Server state and startup model resolution

use super::ServeConfig;
use crate::artifact::ModelArtifact;
use crate::dataset::Matrix;
use crate::registry::load_registered_model;
use crate::tracking::{connect, TrackingUri};
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Read-only prediction capability shared by all requests.
pub trait Predictor: Send + Sync {
    /// Predict rows whose columns are named by `columns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns do not cover the model's features or
    /// the model fails.
    fn predict_rows(&self, columns: &[&str], rows: &Matrix) -> Result<Vec<f64>>;

    /// Name of the served model.
    fn model_name(&self) -> &str;
}

impl Predictor for ModelArtifact {
    fn predict_rows(&self, columns: &[&str], rows: &Matrix) -> Result<Vec<f64>> {
        self.predict_named(columns, rows)
    }

    fn model_name(&self) -> &str {
        ModelArtifact::model_name(self)
    }
}

/// Where the served model came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Packaged artifact file
    LocalFile(PathBuf),
    /// Registry entry
    Registry {
        /// Registered model name
        name: String,
        /// Registered version
        version: u32,
    },
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFile(path) => write!(f, "file {}", path.display()),
            Self::Registry { name, version } => write!(f, "models:/{name}/{version}"),
        }
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The loaded model
    pub predictor: Arc<dyn Predictor>,
    /// Where it was loaded from
    pub source: ModelSource,
}

impl AppState {
    /// Wrap a predictor.
    pub fn new(predictor: Arc<dyn Predictor>, source: ModelSource) -> Self {
        Self { predictor, source }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("model", &self.predictor.model_name())
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve the model to serve.
///
/// A packaged artifact at `config.model_path` is used when the file exists.
/// Otherwise the registry entry `config.model_name` / `config.model_version`
/// is loaded from `config.tracking_uri`.
///
/// # Errors
///
/// Returns `ModelUnavailable` when neither source resolves. A packaged file
/// that exists but does not decode is reported as `Artifact`.
pub fn load_model(config: &ServeConfig) -> Result<(ModelArtifact, ModelSource)> {
    if config.model_path.is_file() {
        let artifact = ModelArtifact::load(&config.model_path)?;
        return Ok((artifact, ModelSource::LocalFile(config.model_path.clone())));
    }
    tracing::debug!(path = %config.model_path.display(), "no packaged model, trying registry");

    let Some(uri) = config.tracking_uri.as_deref() else {
        return Err(Error::ModelUnavailable(format!(
            "no model file at {} and no tracking URI configured",
            config.model_path.display()
        )));
    };

    let parsed = TrackingUri::parse(uri).map_err(|e| {
        Error::ModelUnavailable(format!(
            "no model file at {} and registry unreachable: {e}",
            config.model_path.display()
        ))
    })?;
    if let TrackingUri::File(root) = parsed {
        if !root.is_dir() {
            return Err(Error::ModelUnavailable(format!(
                "no model file at {} and tracking store {} does not exist",
                config.model_path.display(),
                root.display()
            )));
        }
    }

    let backend = connect(Some(uri))?;
    let artifact = load_registered_model(backend.as_ref(), &config.model_name, config.model_version)
        .map_err(|e| {
            Error::ModelUnavailable(format!(
                "no model file at {} and registry lookup of {} v{} failed: {e}",
                config.model_path.display(),
                config.model_name,
                config.model_version
            ))
        })?;
    Ok((
        artifact,
        ModelSource::Registry {
            name: config.model_name.clone(),
            version: config.model_version,
        },
    ))
}
