//! Directory-backed tracking store.
//!
//! Layout under the root directory:
//!
//! ```text
//! experiments/<experiment_id>.json
//! runs/<run_id>/run.json
//! runs/<run_id>/params.json
//! runs/<run_id>/metrics.json
//! runs/<run_id>/artifacts.json
//! runs/<run_id>/artifacts/<path>
//! models/<name>/<version>.json
//! ```
//!
//! Records are JSON; artifact bytes are stored verbatim. Every file is
//! written to a temporary sibling and renamed into place.

use super::{
    check_artifact_path, ensure_running, ArtifactRecord, ExperimentRecord, MetricRecord,
    ModelVersionRecord, ParamRecord, RunRecord, RunStatus, TrackingBackend,
};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Tracking store persisted under a directory.
///
/// Safe to share between threads of one process. Separate processes may read
/// the same root concurrently but should not write to it at the same time.
pub struct FileTrackingStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTrackingStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory tree cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in ["experiments", "runs", "models"] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Tracking("tracking store lock poisoned".to_string()))
    }

    fn run_dir(&self, run_id: &str) -> Result<PathBuf> {
        if run_id.is_empty() || !run_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::NotFound(format!("run {run_id}")));
        }
        Ok(self.root.join("runs").join(run_id))
    }

    fn model_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::Tracking(format!("invalid model name: {name:?}")));
        }
        Ok(self.root.join("models").join(name))
    }

    fn experiments(&self) -> Result<Vec<ExperimentRecord>> {
        let mut experiments: Vec<ExperimentRecord> = json_files(&self.root.join("experiments"))?
            .iter()
            .map(|p| read_json(p))
            .collect::<Result<_>>()?;
        experiments.sort_by_key(|e| e.experiment_id().parse::<u64>().unwrap_or(u64::MAX));
        Ok(experiments)
    }

    fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        let path = self.run_dir(run_id)?.join("run.json");
        if !path.exists() {
            return Err(Error::NotFound(format!("run {run_id}")));
        }
        read_json(&path)
    }

    fn load_list<T: DeserializeOwned>(&self, run_id: &str, file: &str) -> Result<Vec<T>> {
        let path = self.run_dir(run_id)?.join(file);
        if path.exists() {
            read_json(&path)
        } else {
            Ok(Vec::new())
        }
    }
}

impl TrackingBackend for FileTrackingStore {
    fn uri(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn get_or_create_experiment(&self, name: &str) -> Result<ExperimentRecord> {
        let _guard = self.lock()?;
        let experiments = self.experiments()?;
        if let Some(existing) = experiments.iter().find(|e| e.name() == name) {
            return Ok(existing.clone());
        }
        let record = ExperimentRecord::new(experiments.len().to_string(), name);
        let path = self
            .root
            .join("experiments")
            .join(format!("{}.json", record.experiment_id()));
        write_json(&path, &record)?;
        tracing::debug!(experiment = name, id = record.experiment_id(), "created experiment");
        Ok(record)
    }

    fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunRecord> {
        let _guard = self.lock()?;
        if !self
            .experiments()?
            .iter()
            .any(|e| e.experiment_id() == experiment_id)
        {
            return Err(Error::NotFound(format!("experiment {experiment_id}")));
        }
        let run = RunRecord::new(Uuid::new_v4().simple().to_string(), experiment_id, run_name);
        let dir = self.run_dir(run.run_id())?;
        fs::create_dir_all(dir.join("artifacts"))?;
        write_json(&dir.join("run.json"), &run)?;
        Ok(run)
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<RunRecord> {
        let _guard = self.lock()?;
        let mut run = self.load_run(run_id)?;
        ensure_running(&run)?;
        run.complete(status);
        write_json(&self.run_dir(run_id)?.join("run.json"), &run)?;
        Ok(run)
    }

    fn get_run(&self, run_id: &str) -> Result<RunRecord> {
        self.load_run(run_id)
    }

    fn list_runs(&self, experiment_id: &str) -> Result<Vec<RunRecord>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(self.root.join("runs"))? {
            let path = entry?.path().join("run.json");
            if path.exists() {
                let run: RunRecord = read_json(&path)?;
                if run.experiment_id() == experiment_id {
                    runs.push(run);
                }
            }
        }
        runs.sort_by_key(RunRecord::started_at);
        Ok(runs)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock()?;
        ensure_running(&self.load_run(run_id)?)?;
        let mut params: Vec<ParamRecord> = self.load_list(run_id, "params.json")?;
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
        write_json(&self.run_dir(run_id)?.join("params.json"), &params)
    }

    fn log_metric(&self, run_id: &str, key: &str, step: u64, value: f64) -> Result<()> {
        let _guard = self.lock()?;
        ensure_running(&self.load_run(run_id)?)?;
        let mut metrics: Vec<MetricRecord> = self.load_list(run_id, "metrics.json")?;
        metrics.push(MetricRecord::new(run_id, key, step, value));
        write_json(&self.run_dir(run_id)?.join("metrics.json"), &metrics)
    }

    fn get_params(&self, run_id: &str) -> Result<Vec<ParamRecord>> {
        self.load_run(run_id)?;
        self.load_list(run_id, "params.json")
    }

    fn get_metrics(&self, run_id: &str) -> Result<Vec<MetricRecord>> {
        self.load_run(run_id)?;
        self.load_list(run_id, "metrics.json")
    }

    fn log_artifact(&self, run_id: &str, path: &str, bytes: &[u8]) -> Result<ArtifactRecord> {
        let _guard = self.lock()?;
        ensure_running(&self.load_run(run_id)?)?;
        check_artifact_path(path)?;

        let dir = self.run_dir(run_id)?;
        write_atomic(&dir.join("artifacts").join(path), bytes)?;

        let record = ArtifactRecord::for_bytes(run_id, path, bytes);
        let mut records: Vec<ArtifactRecord> = self.load_list(run_id, "artifacts.json")?;
        records.retain(|r| r.path() != path);
        records.push(record.clone());
        write_json(&dir.join("artifacts.json"), &records)?;

        tracing::debug!(run_id, path, size = bytes.len(), "stored artifact");
        Ok(record)
    }

    fn load_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>> {
        self.load_run(run_id)?;
        let records: Vec<ArtifactRecord> = self.load_list(run_id, "artifacts.json")?;
        let record = records
            .iter()
            .find(|r| r.path() == path)
            .ok_or_else(|| Error::NotFound(format!("artifact {path} in run {run_id}")))?;

        let bytes = fs::read(self.run_dir(run_id)?.join("artifacts").join(path))?;
        if !record.matches(&bytes) {
            return Err(Error::Tracking(format!(
                "artifact {path} in run {run_id} does not match {}",
                record.cas_hash()
            )));
        }
        Ok(bytes)
    }

    fn list_artifacts(&self, run_id: &str) -> Result<Vec<ArtifactRecord>> {
        self.load_run(run_id)?;
        self.load_list(run_id, "artifacts.json")
    }

    fn create_model_version(
        &self,
        name: &str,
        run_id: &str,
        artifact_path: &str,
    ) -> Result<ModelVersionRecord> {
        let _guard = self.lock()?;
        let dir = self.model_dir(name)?;
        fs::create_dir_all(&dir)?;
        let next = self
            .list_model_versions(name)?
            .last()
            .map_or(1, |v| v.version() + 1);
        let record = ModelVersionRecord::new(name, next, run_id, artifact_path);
        write_json(&dir.join(format!("{next}.json")), &record)?;
        Ok(record)
    }

    fn get_model_version(&self, name: &str, version: u32) -> Result<ModelVersionRecord> {
        let path = self.model_dir(name)?.join(format!("{version}.json"));
        if !path.exists() {
            return Err(Error::NotFound(format!("model {name} version {version}")));
        }
        read_json(&path)
    }

    fn list_model_versions(&self, name: &str) -> Result<Vec<ModelVersionRecord>> {
        let dir = self.model_dir(name)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions: Vec<ModelVersionRecord> = json_files(&dir)?
            .iter()
            .map(|p| read_json(p))
            .collect::<Result<_>>()?;
        versions.sort_by_key(ModelVersionRecord::version);
        Ok(versions)
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(value)?)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
