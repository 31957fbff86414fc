//! In-memory tracking store using `DashMap`.
//!
//! This is the default backend; data is lost on process restart. For
//! persistence use [`FileTrackingStore`](super::FileTrackingStore).

use super::{
    check_artifact_path, ensure_running, ArtifactRecord, ExperimentRecord, MetricRecord,
    ModelVersionRecord, ParamRecord, RunRecord, RunStatus, TrackingBackend,
};
use crate::{Error, Result};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Process-local tracking store.
///
/// Thread-safe; concurrent runs may log into it at the same time.
///
/// # Example
///
/// ```rust
/// use housing_ml::tracking::{MemoryTrackingStore, TrackingBackend};
///
/// let store = MemoryTrackingStore::new();
/// let exp = store.get_or_create_experiment("demo")?;
/// let run = store.create_run(exp.experiment_id(), "LinearRegression")?;
/// store.log_metric(run.run_id(), "rmse", 0, 0.7)?;
/// assert_eq!(store.latest_metric(run.run_id(), "rmse")?, Some(0.7));
/// # Ok::<(), housing_ml::Error>(())
/// ```
pub struct MemoryTrackingStore {
    experiments: DashMap<String, ExperimentRecord>,
    next_experiment_id: AtomicU64,
    runs: DashMap<String, RunRecord>,
    params: DashMap<String, Vec<ParamRecord>>,
    metrics: DashMap<String, Vec<MetricRecord>>,
    artifacts: DashMap<String, Vec<(ArtifactRecord, Vec<u8>)>>,
    model_versions: DashMap<String, Vec<ModelVersionRecord>>,
    // Serializes get-or-create so two callers never mint two IDs for one name
    experiment_lock: Mutex<()>,
}

impl MemoryTrackingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            experiments: DashMap::new(),
            next_experiment_id: AtomicU64::new(0),
            runs: DashMap::new(),
            params: DashMap::new(),
            metrics: DashMap::new(),
            artifacts: DashMap::new(),
            model_versions: DashMap::new(),
            experiment_lock: Mutex::new(()),
        }
    }

    /// Number of runs across all experiments.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Check if the store holds no experiments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    fn running(&self, run_id: &str) -> Result<()> {
        let run = self
            .runs
            .get(run_id)
            .ok_or_else(|| Error::NotFound(format!("run {run_id}")))?;
        ensure_running(run.value())
    }

    fn known(&self, run_id: &str) -> Result<()> {
        if self.runs.contains_key(run_id) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("run {run_id}")))
        }
    }
}

impl Default for MemoryTrackingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingBackend for MemoryTrackingStore {
    fn uri(&self) -> String {
        "memory:".to_string()
    }

    fn get_or_create_experiment(&self, name: &str) -> Result<ExperimentRecord> {
        let _guard = self
            .experiment_lock
            .lock()
            .map_err(|_| Error::Tracking("experiment lock poisoned".to_string()))?;
        if let Some(existing) = self.experiments.get(name) {
            return Ok(existing.value().clone());
        }
        let id = self.next_experiment_id.fetch_add(1, Ordering::SeqCst);
        let record = ExperimentRecord::new(id.to_string(), name);
        self.experiments.insert(name.to_string(), record.clone());
        Ok(record)
    }

    fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunRecord> {
        if !self
            .experiments
            .iter()
            .any(|e| e.value().experiment_id() == experiment_id)
        {
            return Err(Error::NotFound(format!("experiment {experiment_id}")));
        }
        let run = RunRecord::new(Uuid::new_v4().simple().to_string(), experiment_id, run_name);
        self.runs.insert(run.run_id().to_string(), run.clone());
        Ok(run)
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<RunRecord> {
        let mut run = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| Error::NotFound(format!("run {run_id}")))?;
        ensure_running(run.value())?;
        run.complete(status);
        Ok(run.value().clone())
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.runs
            .get(run_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| Error::NotFound(format!("run {run_id}")))
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>> {
        let mut runs: Vec<RunRecord> = self
            .runs
            .iter()
            .filter(|r| r.value().experiment_id() == experiment_id)
            .map(|r| r.value().clone())
            .collect();
        runs.sort_by_key(RunRecord::started_at);
        Ok(runs)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.running(run_id)?;
        let mut params = self.params.entry(run_id.to_string()).or_default();
        if let Some(existing) = params.iter().find(|p| p.key() == key) {
            if existing.value() == value {
                return Ok(());
            }
            return Err(Error::Tracking(format!(
                "param {key} already set to {:?} on run {run_id}",
                existing.value()
            )));
        }
        params.push(ParamRecord::new(run_id, key, value));
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, step: u64, value: f64) -> Result<()> {
        self.running(run_id)?;
        self.metrics
            .entry(run_id.to_string())
            .or_default()
            .push(MetricRecord::new(run_id, key, step, value));
        Ok(())
    }

    fn get_params(&self, run_id: &str) -> Result<Vec<ParamRecord>> {
        self.known(run_id)?;
        Ok(self
            .params
            .get(run_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    fn get_metrics(&self, run_id: &str) -> Result<Vec<MetricRecord>> {
        self.known(run_id)?;
        Ok(self
            .metrics
            .get(run_id)
            .map(|m| m.value().clone())
            .unwrap_or_default())
    }

    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<ArtifactRecord> {
        self.running(run_id)?;
        check_artifact_path(path)?;
        let record = ArtifactRecord::for_bytes(run_id, path, bytes);
        let mut stored = self.artifacts.entry(run_id.to_string()).or_default();
        stored.retain(|(r, _)| r.path() != path);
        stored.push((record.clone(), bytes.to_vec()));
        Ok(record)
    }

    fn load_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>> {
        self.known(run_id)?;
        self.artifacts
            .get(run_id)
            .and_then(|stored| {
                stored
                    .iter()
                    .find(|(r, _)| r.path() == path)
                    .map(|(_, bytes)| bytes.clone())
            })
            .ok_or_else(|| Error::NotFound(format!("artifact {path} in run {run_id}")))
    }

    fn list_artifacts(&self, run_id: &str) -> Result<Vec<ArtifactRecord>> {
        self.known(run_id)?;
        Ok(self
            .artifacts
            .get(run_id)
            .map(|stored| stored.iter().map(|(r, _)| r.clone()).collect())
            .unwrap_or_default())
    }

    fn create_model_version(
        &self,
        name: &str,
        run_id: &str,
        artifact_path: &str,
    ) -> Result<ModelVersionRecord> {
        let mut versions = self.model_versions.entry(name.to_string()).or_default();
        let next = versions.last().map_or(1, |v| v.version() + 1);
        let record = ModelVersionRecord::new(name, next, run_id, artifact_path);
        versions.push(record.clone());
        Ok(record)
    }

    fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersionRecord> {
        self.model_versions
            .get(name)
            .and_then(|versions| versions.iter().find(|v| v.version() == version).cloned())
            .ok_or_else(|| Error::NotFound(format!("model {name} version {version}")))
    }

    fn list_model_versions(&self, name: &str) -> Result<Vec<ModelVersionRecord>> {
        Ok(self
            .model_versions
            .get(name)
            .map(|v| v.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_run() -> (MemoryTrackingStore, String) {
        let store = MemoryTrackingStore::new();
        let exp = store.get_or_create_experiment("exp").unwrap();
        let run = store.create_run(exp.experiment_id(), "LinearRegression").unwrap();
        (store, run.run_id().to_string())
    }

    #[test]
    fn test_experiment_resolved_by_name() {
        let store = MemoryTrackingStore::new();
        let a = store.get_or_create_experiment("a").unwrap();
        let again = store.get_or_create_experiment("a").unwrap();
        let b = store.get_or_create_experiment("b").unwrap();
        assert_eq!(a.experiment_id(), again.experiment_id());
        assert_ne!(a.experiment_id(), b.experiment_id());
    }

    #[test]
    fn test_run_ids_unique() {
        let (store, first) = store_with_run();
        let exp = store.get_or_create_experiment("exp").unwrap();
        let second = store.create_run(exp.experiment_id(), "RandomForest").unwrap();
        assert_ne!(first, second.run_id());
        assert_eq!(first.len(), 32);
        assert_eq!(store.run_count(), 2);
    }

    #[test]
    fn test_unknown_experiment() {
        let store = MemoryTrackingStore::new();
        assert!(matches!(
            store.create_run("missing", "x"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_params_are_immutable() {
        let (store, run_id) = store_with_run();
        store.log_param(&run_id, "random_state", "42").unwrap();
        store.log_param(&run_id, "random_state", "42").unwrap();
        assert!(store.log_param(&run_id, "random_state", "7").is_err());
        assert_eq!(store.get_params(&run_id).unwrap().len(), 1);
    }

    #[test]
    fn test_closed_run_rejects_logging() {
        let (store, run_id) = store_with_run();
        store.end_run(&run_id, RunStatus::Success).unwrap();
        assert!(matches!(
            store.log_metric(&run_id, "rmse", 0, 1.0),
            Err(Error::Tracking(_))
        ));
        assert!(store.end_run(&run_id, RunStatus::Failed).is_err());
        assert_eq!(store.get_run(&run_id).unwrap().status(), RunStatus::Success);
    }

    #[test]
    fn test_artifact_roundtrip_and_replace() {
        let (store, run_id) = store_with_run();
        store.log_artifact(&run_id, "model", b"v1").unwrap();
        let record = store.log_artifact(&run_id, "model", b"v2").unwrap();
        assert_eq!(store.load_artifact(&run_id, "model").unwrap(), b"v2");
        assert_eq!(store.list_artifacts(&run_id).unwrap(), vec![record]);
        assert!(matches!(
            store.load_artifact(&run_id, "other"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_model_versions_increment() {
        let (store, run_id) = store_with_run();
        let v1 = store.create_model_version("m", &run_id, "model").unwrap();
        let v2 = store.create_model_version("m", &run_id, "model").unwrap();
        let other = store.create_model_version("n", &run_id, "model").unwrap();
        assert_eq!((v1.version(), v2.version(), other.version()), (1, 2, 1));
        assert_eq!(store.get_model_version("m", 2).unwrap(), v2);
        assert!(store.get_model_version("m", 3).is_err());
    }
}
