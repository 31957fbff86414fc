//! Model registry: promote a run's artifact to a named, versioned entry.

use crate::artifact::{ModelArtifact, MODEL_ARTIFACT_PATH};
use crate::tracking::{ModelVersionRecord, TrackingBackend};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default registered model name.
pub const DEFAULT_MODEL_NAME: &str = "CaliforniaHousingRegressor";

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Registered model name
    pub name: String,
    /// Version number, starting at 1
    pub version: u32,
    /// Run the artifact was promoted from
    pub run_id: String,
    /// `runs:/<run_id>/model`
    pub source: String,
}

impl From<&ModelVersionRecord> for ModelVersion {
    fn from(record: &ModelVersionRecord) -> Self {
        Self {
            name: record.name().to_string(),
            version: record.version(),
            run_id: record.run_id().to_string(),
            source: record.source(),
        }
    }
}

/// Register the model artifact of `run_id` as the next version of
/// `model_name`.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty name, `NotFound` if the run does not
/// exist or carries no model artifact, and `Artifact` if the stored artifact
/// does not decode.
pub fn register_best_model(
    backend: &dyn TrackingBackend,
    run_id: &str,
    model_name: &str,
) -> Result<ModelVersion> {
    if model_name.trim().is_empty() {
        return Err(Error::InvalidInput("model name must not be empty".to_string()));
    }
    backend.get_run(run_id)?;
    let bytes = backend.load_artifact(run_id, MODEL_ARTIFACT_PATH)?;
    // Refuse to register something serving could not load
    ModelArtifact::decode(&bytes)?;

    let record = backend.create_model_version(model_name, run_id, MODEL_ARTIFACT_PATH)?;
    tracing::info!(
        model = model_name,
        version = record.version(),
        run_id,
        "registered model version"
    );
    Ok(ModelVersion::from(&record))
}

/// Resolve `model_name` at `version` to its artifact.
///
/// # Errors
///
/// Returns `NotFound` if the version or its artifact is missing and
/// `Artifact` if the artifact does not decode.
pub fn load_registered_model(
    backend: &dyn TrackingBackend,
    model_name: &str,
    version: u32,
) -> Result<ModelArtifact> {
    let record = backend.get_model_version(model_name, version)?;
    let bytes = backend.load_artifact(record.run_id(), record.artifact_path())?;
    let artifact = ModelArtifact::decode(&bytes)?;
    tracing::debug!(
        model = model_name,
        version,
        source = %record.source(),
        "loaded registered model"
    );
    Ok(artifact)
}
