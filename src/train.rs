//! Training driver
//!
//! For each candidate, in order: open a run, log its parameters, fit on the
//! training split, evaluate on the held-out split, log the metrics and the
//! fitted model, close the run. The candidate with the strictly lowest RMSE
//! wins, so ties go to the earlier candidate.
//!
//! A failing candidate aborts the whole invocation. Its run is still closed
//! (as `Failed`) by the run guard.

use crate::artifact::{Compression, ModelArtifact, MODEL_ARTIFACT_PATH};
use crate::dataset::{get_data, DatasetSplit, HousingSource};
use crate::metrics::{eval_regression, RegressionMetrics};
use crate::models::{get_models, Candidate, Estimator};
use crate::tracking::{connect, TrackingContext};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Default experiment name.
pub const DEFAULT_EXPERIMENT_NAME: &str = "california_housing_regression";

/// Default seed for splitting and stochastic candidates.
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Held-out fraction used for evaluation.
pub const TEST_SIZE: f64 = 0.2;

/// Settings for one training invocation.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    experiment_name: String,
    tracking_uri: Option<String>,
    random_state: u64,
    source: HousingSource,
}

impl TrainConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> TrainConfigBuilder {
        TrainConfigBuilder::default()
    }

    /// Experiment the runs are attributed to.
    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    /// Tracking URI; `None` means a process-local store.
    #[must_use]
    pub fn tracking_uri(&self) -> Option<&str> {
        self.tracking_uri.as_deref()
    }

    /// Seed for the split and the stochastic candidates.
    #[must_use]
    pub const fn random_state(&self) -> u64 {
        self.random_state
    }

    /// Dataset source.
    #[must_use]
    pub const fn source(&self) -> &HousingSource {
        &self.source
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`TrainConfig`].
#[derive(Debug)]
pub struct TrainConfigBuilder {
    experiment_name: String,
    tracking_uri: Option<String>,
    random_state: u64,
    source: HousingSource,
}

impl Default for TrainConfigBuilder {
    fn default() -> Self {
        Self {
            experiment_name: DEFAULT_EXPERIMENT_NAME.to_string(),
            tracking_uri: None,
            random_state: DEFAULT_RANDOM_STATE,
            source: HousingSource::default(),
        }
    }
}

impl TrainConfigBuilder {
    /// Set the experiment name.
    #[must_use]
    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    /// Set the tracking URI.
    #[must_use]
    pub fn tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = Some(uri.into());
        self
    }

    /// Set the random seed.
    #[must_use]
    pub const fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    /// Set the dataset source.
    #[must_use]
    pub fn source(mut self, source: HousingSource) -> Self {
        self.source = source;
        self
    }

    /// Build the `TrainConfig`.
    #[must_use]
    pub fn build(self) -> TrainConfig {
        TrainConfig {
            experiment_name: self.experiment_name,
            tracking_uri: self.tracking_uri,
            random_state: self.random_state,
            source: self.source,
        }
    }
}

/// Summary of a training invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Winning candidate identifier
    pub best_model_name: String,
    /// Held-out RMSE of the winner
    pub best_rmse: f64,
    /// Run the winner was logged under
    pub best_run_id: String,
}

impl fmt::Display for TrainingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Best model: {} | RMSE={:.4} | run_id={}",
            self.best_model_name, self.best_rmse, self.best_run_id
        )
    }
}

/// Train every default candidate and track each as a run.
///
/// Opens the backend named by the config's tracking URI (a fresh in-memory
/// store when unset).
///
/// # Errors
///
/// Returns the first error from tracking, data loading, fitting or
/// evaluation. No partial result is returned.
pub fn train_and_track(config: &TrainConfig) -> Result<TrainingResult> {
    let backend = connect(config.tracking_uri())?;
    let ctx = TrackingContext::new(backend, config.experiment_name())?;
    train_in_context(&ctx, config)
}

/// Like [`train_and_track`], logging into an existing context.
///
/// # Errors
///
/// See [`train_and_track`].
pub fn train_in_context(ctx: &TrackingContext, config: &TrainConfig) -> Result<TrainingResult> {
    let split = get_data(config.source(), TEST_SIZE, config.random_state())?;
    tracing::info!(
        experiment = ctx.experiment().name(),
        train_rows = split.y_train().len(),
        test_rows = split.y_test().len(),
        "loaded dataset split"
    );
    run_candidates(
        ctx,
        &split,
        get_models(config.random_state()),
        config.random_state(),
    )
}

/// Fit, evaluate and track `candidates` in order, returning the best.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty candidate list or duplicate names;
/// otherwise the first candidate failure aborts the sweep.
pub fn run_candidates(
    ctx: &TrackingContext,
    split: &DatasetSplit,
    candidates: Vec<Candidate>,
    random_state: u64,
) -> Result<TrainingResult> {
    if candidates.is_empty() {
        return Err(Error::InvalidInput("no candidates to train".to_string()));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = candidates.iter().find(|c| !seen.insert(c.name())) {
        return Err(Error::InvalidInput(format!(
            "duplicate candidate name {}",
            dup.name()
        )));
    }

    let mut scores = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let name = candidate.name().to_string();
        tracing::info!(candidate = %name, "training candidate");
        let (run_id, metrics) = track_candidate(ctx, split, candidate, random_state)?;
        tracing::info!(
            candidate = %name,
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            run_id = %run_id,
            "candidate finished"
        );
        scores.push((name, metrics.rmse, run_id));
    }

    let best = select_best(scores.iter().map(|(n, r, id)| (n.as_str(), *r, id.as_str())))
        .ok_or_else(|| Error::InvalidInput("no candidate produced a finite RMSE".to_string()))?;
    tracing::info!(
        model = %best.best_model_name,
        rmse = best.best_rmse,
        run_id = %best.best_run_id,
        "selected best model"
    );
    Ok(best)
}

/// Pick the lowest RMSE from `(name, rmse, run_id)` scores.
///
/// Only a strictly lower RMSE replaces the current best, so the first of
/// several equal scores wins. Non-finite RMSEs never win.
///
/// ```
/// use housing_ml::train::select_best;
///
/// let best = select_best([("a", 0.5, "r1"), ("b", 0.4, "r2"), ("c", 0.4, "r3")]).unwrap();
/// assert_eq!(best.best_model_name, "b");
/// ```
pub fn select_best<'a, I>(scores: I) -> Option<TrainingResult>
where
    I: IntoIterator<Item = (&'a str, f64, &'a str)>,
{
    let mut best: Option<TrainingResult> = None;
    for (name, rmse, run_id) in scores {
        let current = best.as_ref().map_or(f64::INFINITY, |b| b.best_rmse);
        if rmse < current {
            best = Some(TrainingResult {
                best_model_name: name.to_string(),
                best_rmse: rmse,
                best_run_id: run_id.to_string(),
            });
        }
    }
    best
}

fn track_candidate(
    ctx: &TrackingContext,
    split: &DatasetSplit,
    candidate: Candidate,
    random_state: u64,
) -> Result<(String, RegressionMetrics)> {
    let (name, mut model) = candidate.into_parts();
    let run = ctx.start_run(&name)?;

    run.log_param("model_name", &name)?;
    run.log_param("random_state", random_state)?;
    for (key, value) in model.hyperparameters() {
        run.log_param(key, value)?;
    }

    model.fit(split.x_train(), split.y_train())?;
    let predictions = model.predict(split.x_test())?;
    let metrics = eval_regression(split.y_test(), &predictions)?;
    for (key, value) in metrics.as_pairs() {
        run.log_metric(key, value)?;
    }

    let artifact = ModelArtifact::new(name, split.feature_names().to_vec(), model);
    run.log_artifact(MODEL_ARTIFACT_PATH, &artifact.encode(Compression::default())?)?;

    let run_id = run.finish()?;
    Ok((run_id, metrics))
}
