//! Experiment tracking
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< RunRecord (N)
//!                              │
//!                              ├──< ParamRecord (N)  [immutable strings]
//!                              ├──< MetricRecord (N) [stepped values]
//!                              └──< ArtifactRecord (N) [sha256 CAS]
//!
//! ModelVersionRecord (name, version) ──> RunRecord + artifact path
//! ```
//!
//! Storage sits behind [`TrackingBackend`]; [`connect`] picks a backend from
//! a tracking URI. Logging goes through an explicit [`TrackingContext`]
//! instead of process-wide state, and every run is held by an [`ActiveRun`]
//! guard that closes it on all exit paths.
//!
//! ## Usage
//!
//! ```rust
//! use housing_ml::tracking::{connect, RunStatus, TrackingContext};
//!
//! let ctx = TrackingContext::new(connect(None)?, "demo")?;
//!
//! let run = ctx.start_run("LinearRegression")?;
//! run.log_param("random_state", "42")?;
//! run.log_metric("rmse", 0.73)?;
//! let run_id = run.finish()?;
//!
//! let record = ctx.backend().get_run(&run_id)?;
//! assert_eq!(record.status(), RunStatus::Success);
//! # Ok::<(), housing_ml::Error>(())
//! ```

mod artifact_record;
mod context;
mod experiment_record;
mod file;
mod memory;
mod metric_record;
mod model_version_record;
mod param_record;
mod run_record;

pub use artifact_record::{content_hash, ArtifactRecord};
pub use context::{ActiveRun, TrackingContext};
pub use experiment_record::ExperimentRecord;
pub use file::FileTrackingStore;
pub use memory::MemoryTrackingStore;
pub use metric_record::MetricRecord;
pub use model_version_record::ModelVersionRecord;
pub use param_record::ParamRecord;
pub use run_record::{RunRecord, RunStatus};

use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Storage for experiments, runs and registered model versions.
///
/// Implementations must be safe to share between threads; all methods take
/// `&self`.
pub trait TrackingBackend: Send + Sync {
    /// URI this backend was opened from.
    fn uri(&self) -> String;

    /// Resolve an experiment by name, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `Tracking` or `Io` on storage failure.
    fn get_or_create_experiment(&self, name: &str) -> Result<ExperimentRecord>;

    /// Open a new run under `experiment_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the experiment does not exist.
    fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunRecord>;

    /// Close a running run.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run and `Tracking` if it is already
    /// closed.
    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<RunRecord>;

    /// Fetch a run.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run.
    fn get_run(&self, run_id: &str) -> Result<RunRecord>;

    /// All runs of an experiment in start order.
    ///
    /// # Errors
    ///
    /// Returns `Tracking` or `Io` on storage failure.
    fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>>;

    /// Record a parameter. Re-logging the same value is a no-op; a different
    /// value for an existing key is rejected.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run and `Tracking` if the run is
    /// closed or the key already holds another value.
    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    /// Record a metric value.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run and `Tracking` if it is closed.
    fn log_metric(&self, run_id: &str, key: &str, step: u64, value: f64) -> Result<()>;

    /// Parameters of a run in logging order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run.
    fn get_params(&self, run_id: &str) -> Result<Vec<ParamRecord>>;

    /// Metrics of a run in logging order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run.
    fn get_metrics(&self, run_id: &str) -> Result<Vec<MetricRecord>>;

    /// Store artifact bytes under a run-relative path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run, `Tracking` if it is closed or
    /// the path is not a plain relative path.
    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<ArtifactRecord>;

    /// Load artifact bytes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the run or artifact does not exist.
    fn load_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>>;

    /// Artifacts stored under a run.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run.
    fn list_artifacts(&self, run_id: &str) -> Result<Vec<ArtifactRecord>>;

    /// Register the next version of `name` pointing at a run artifact.
    ///
    /// # Errors
    ///
    /// Returns `Tracking` or `Io` on storage failure.
    fn create_model_version(
        &self,
        name: &str,
        run_id: &str,
        artifact_path: &str,
    ) -> Result<ModelVersionRecord>;

    /// Fetch one model version.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the name or version is not registered.
    fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersionRecord>;

    /// All versions of a registered model, ascending.
    ///
    /// # Errors
    ///
    /// Returns `Tracking` or `Io` on storage failure.
    fn list_model_versions(&self, name: &str) -> Result<Vec<ModelVersionRecord>>;

    /// Latest value of a metric key, if logged.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run.
    fn latest_metric(&self, run_id: &str, key: &str) -> Result<Option<f64>> {
        Ok(self
            .get_metrics(run_id)?
            .into_iter()
            .filter(|m| m.key() == key)
            .max_by_key(MetricRecord::step)
            .map(|m| m.value()))
    }

    /// Value of a logged parameter, if present.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown run.
    fn param(&self, run_id: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_params(run_id)?
            .into_iter()
            .find(|p| p.key() == key)
            .map(|p| p.value().to_string()))
    }
}

/// Where tracking data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingUri {
    /// Process-local, lost on exit
    Memory,
    /// Directory-backed store
    File(PathBuf),
}

impl TrackingUri {
    /// Parse a tracking URI.
    ///
    /// `memory:` selects the in-memory store; `file:///abs`, `file:rel` and
    /// bare paths select a file store.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedTrackingUri` for any other scheme or an empty
    /// path.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim();
        if uri == "memory:" || uri == "memory://" {
            return Ok(Self::Memory);
        }
        let path = if let Some(rest) = uri.strip_prefix("file://") {
            rest
        } else if let Some(rest) = uri.strip_prefix("file:") {
            rest
        } else if has_scheme(uri) {
            return Err(Error::UnsupportedTrackingUri(uri.to_string()));
        } else {
            uri
        };
        if path.is_empty() {
            return Err(Error::UnsupportedTrackingUri(uri.to_string()));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

fn has_scheme(uri: &str) -> bool {
    // A single letter before ':' is a Windows drive, not a scheme
    match uri.find(':') {
        Some(idx) if idx > 1 => uri[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// Open the backend a tracking URI names. `None` means a fresh in-memory
/// store.
///
/// # Errors
///
/// Returns `UnsupportedTrackingUri` for unknown schemes and `Io` if a file
/// store cannot be created.
pub fn connect(uri: Option<&str>) -> Result<Arc<dyn TrackingBackend>> {
    let parsed = match uri {
        None => TrackingUri::Memory,
        Some(uri) => TrackingUri::parse(uri)?,
    };
    let backend: Arc<dyn TrackingBackend> = match parsed {
        TrackingUri::Memory => Arc::new(MemoryTrackingStore::new()),
        TrackingUri::File(root) => Arc::new(FileTrackingStore::open(root)?),
    };
    tracing::debug!(uri = %backend.uri(), "connected tracking backend");
    Ok(backend)
}

pub(crate) fn ensure_running(run: &RunRecord) -> Result<()> {
    if run.status().is_terminal() {
        return Err(Error::Tracking(format!(
            "run {} is closed ({:?})",
            run.run_id(),
            run.status()
        )));
    }
    Ok(())
}

pub(crate) fn check_artifact_path(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..");
    if valid {
        Ok(())
    } else {
        Err(Error::Tracking(format!("invalid artifact path: {path:?}")))
    }
}
