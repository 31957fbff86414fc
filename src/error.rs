//! Error types for housing-ml
//!
//! Every variant names the failing stage so the CLI and the HTTP layer can
//! surface an actionable message without extra context.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// housing-ml error types
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied data that violates an input contract
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Estimator could not be fitted (bad hyperparameters, degenerate data)
    #[error("Model fitting failed: {0}")]
    Fit(String),

    /// Prediction requested before `fit`
    #[error("Model is not fitted: call fit() before predict()")]
    NotFitted,

    /// Tracking backend failure (run bookkeeping, store writes)
    #[error("Tracking error: {0}")]
    Tracking(String),

    /// Experiment, run, artifact or model version does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tracking URI scheme has no backend
    #[error("Unsupported tracking URI: {0}\nUse a filesystem path, file:// URI or memory:")]
    UnsupportedTrackingUri(String),

    /// Dataset storage error (Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Model artifact could not be encoded or decoded
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Serving could not resolve a model from any configured source
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
