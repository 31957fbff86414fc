//! Explicit tracking context and the scoped run guard

use super::{ExperimentRecord, RunStatus, TrackingBackend};
use crate::Result;
use std::sync::Arc;

/// A backend plus the experiment new runs are attributed to.
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct TrackingContext {
    backend: Arc<dyn TrackingBackend>,
    experiment: ExperimentRecord,
}

impl TrackingContext {
    /// Resolve (or create) `experiment_name` on `backend`.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn new(backend: Arc<dyn TrackingBackend>, experiment_name: &str) -> Result<Self> {
        let experiment = backend.get_or_create_experiment(experiment_name)?;
        Ok(Self {
            backend,
            experiment,
        })
    }

    /// The active experiment.
    #[must_use]
    pub const fn experiment(&self) -> &ExperimentRecord {
        &self.experiment
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn TrackingBackend> {
        &self.backend
    }

    /// Open a run named `run_name` in the active experiment.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn start_run(&self, run_name: &str) -> Result<ActiveRun<'_>> {
        let run = self
            .backend
            .create_run(self.experiment.experiment_id(), run_name)?;
        tracing::debug!(run_id = run.run_id(), run_name, "started run");
        Ok(ActiveRun {
            backend: self.backend.as_ref(),
            run_id: run.run_id().to_string(),
            finished: false,
        })
    }
}

impl std::fmt::Debug for TrackingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingContext")
            .field("uri", &self.backend.uri())
            .field("experiment", &self.experiment)
            .finish()
    }
}

/// An open run. Logging calls attach to it.
///
/// [`finish`](Self::finish) closes the run as `Success`. Dropping the guard
/// without finishing (an early `?` return or a panic) closes it as `Failed`,
/// so no run is left open.
pub struct ActiveRun<'a> {
    backend: &'a dyn TrackingBackend,
    run_id: String,
    finished: bool,
}

impl ActiveRun<'_> {
    /// Identifier of the run.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Record a parameter.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn log_param(&self, key: &str, value: impl ToString) -> Result<()> {
        let value = value.to_string();
        tracing::debug!(run_id = %self.run_id, key, value = %value, "log param");
        self.backend.log_param(&self.run_id, key, &value)
    }

    /// Record a one-shot metric (step 0).
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn log_metric(&self, key: &str, value: f64) -> Result<()> {
        tracing::debug!(run_id = %self.run_id, key, value, "log metric");
        self.backend.log_metric(&self.run_id, key, 0, value)
    }

    /// Store artifact bytes under a run-relative path.
    ///
    /// # Errors
    ///
    /// Propagates backend failures.
    pub fn log_artifact(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let record = self.backend.log_artifact(&self.run_id, path, bytes)?;
        tracing::debug!(
            run_id = %self.run_id,
            path,
            hash = record.cas_hash(),
            size = record.size_bytes(),
            "log artifact"
        );
        Ok(())
    }

    /// Close the run as `Success` and return its identifier.
    ///
    /// # Errors
    ///
    /// Propagates backend failures. The run is then closed as `Failed` by
    /// the guard's drop.
    pub fn finish(mut self) -> Result<String> {
        self.backend.end_run(&self.run_id, RunStatus::Success)?;
        self.finished = true;
        Ok(std::mem::take(&mut self.run_id))
    }
}

impl std::fmt::Debug for ActiveRun<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRun")
            .field("run_id", &self.run_id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!(run_id = %self.run_id, "run closed without finishing, marking failed");
        if let Err(e) = self.backend.end_run(&self.run_id, RunStatus::Failed) {
            tracing::error!(run_id = %self.run_id, error = %e, "failed to close run");
        }
    }
}
