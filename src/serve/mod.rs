//! HTTP serving layer
//!
//! | Route                 | Request                    | Response                      |
//! |-----------------------|----------------------------|-------------------------------|
//! | `GET /health`         |                            | `{"status": "ok"}`            |
//! | `POST /predict`       | eight named feature fields | `{"prediction": f64}`         |
//! | `POST /predict_batch` | `{"rows": [...]}`          | `{"predictions": [f64, ...]}` |
//!
//! Malformed bodies are answered with 422 and `{"error": "..."}` before the
//! model is touched; model failures are answered with 500 in the same shape.
//!
//! The model is resolved once at startup by [`load_model`]: a packaged
//! artifact at the configured path wins, otherwise the configured registry
//! entry is loaded. If neither resolves the server does not start.

mod api;
mod handlers;
mod state;

pub use api::{router, serve};
pub use handlers::{health, predict, predict_batch};
pub use state::{load_model, AppState, ModelSource, Predictor};

use crate::dataset::FEATURE_NAMES;
use crate::registry::DEFAULT_MODEL_NAME;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default packaged artifact path.
pub const DEFAULT_MODEL_PATH: &str = "model.bin";

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Values given on the command line; each one set replaces what
/// [`ServeConfig::from_env`] resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeOverrides {
    /// Listen address
    pub bind_addr: Option<SocketAddr>,
    /// Packaged artifact path
    pub model_path: Option<PathBuf>,
    /// Tracking store holding the registry (empty clears it)
    pub tracking_uri: Option<String>,
    /// Registered model name
    pub model_name: Option<String>,
    /// Registered model version
    pub model_version: Option<u32>,
}

/// Serving configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Packaged artifact, preferred when the file exists
    pub model_path: PathBuf,
    /// Tracking store holding the registry
    pub tracking_uri: Option<String>,
    /// Registered model name
    pub model_name: String,
    /// Registered model version
    pub model_version: u32,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            tracking_uri: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_version: 1,
        }
    }
}

impl ServeConfig {
    /// Read `BIND_ADDR`, `MODEL_PATH`, `TRACKING_URI`, `MODEL_NAME` and
    /// `MODEL_VERSION`, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `BIND_ADDR` or `MODEL_VERSION` do not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| Error::InvalidInput(format!("BIND_ADDR={addr}: {e}")))?;
        }
        if let Some(path) = lookup("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        config.tracking_uri = lookup("TRACKING_URI").filter(|uri| !uri.is_empty());
        if let Some(name) = lookup("MODEL_NAME") {
            config.model_name = name;
        }
        if let Some(version) = lookup("MODEL_VERSION") {
            config.model_version = version
                .parse()
                .map_err(|e| Error::InvalidInput(format!("MODEL_VERSION={version}: {e}")))?;
        }
        Ok(config)
    }

    /// Apply command-line values on top of this configuration.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ServeOverrides) -> Self {
        if let Some(addr) = overrides.bind_addr {
            self.bind_addr = addr;
        }
        if let Some(path) = overrides.model_path {
            self.model_path = path;
        }
        if let Some(uri) = overrides.tracking_uri {
            self.tracking_uri = Some(uri).filter(|u| !u.is_empty());
        }
        if let Some(name) = overrides.model_name {
            self.model_name = name;
        }
        if let Some(version) = overrides.model_version {
            self.model_version = version;
        }
        self
    }

    /// Set the listen address
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the packaged artifact path
    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Set the tracking URI
    #[must_use]
    pub fn with_tracking_uri(mut self, uri: impl Into<String>) -> Self {
        self.tracking_uri = Some(uri.into());
        self
    }

    /// Set the registered model name and version
    #[must_use]
    pub fn with_registered_model(mut self, name: impl Into<String>, version: u32) -> Self {
        self.model_name = name.into();
        self.model_version = version;
        self
    }
}

// =============================================================================
// Request/Response DTOs
// =============================================================================

/// One row of features. Field names on the wire match the dataset columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Median income in block group
    #[serde(rename = "MedInc")]
    pub med_inc: f64,
    /// Median house age in block group
    #[serde(rename = "HouseAge")]
    pub house_age: f64,
    /// Average number of rooms per household
    #[serde(rename = "AveRooms")]
    pub ave_rooms: f64,
    /// Average number of bedrooms per household
    #[serde(rename = "AveBedrms")]
    pub ave_bedrms: f64,
    /// Block group population
    #[serde(rename = "Population")]
    pub population: f64,
    /// Average number of household members
    #[serde(rename = "AveOccup")]
    pub ave_occup: f64,
    /// Block group latitude
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    /// Block group longitude
    #[serde(rename = "Longitude")]
    pub longitude: f64,
}

impl PredictRequest {
    /// Values in [`FEATURE_NAMES`] order.
    #[must_use]
    pub const fn values(&self) -> [f64; FEATURE_NAMES.len()] {
        [
            self.med_inc,
            self.house_age,
            self.ave_rooms,
            self.ave_bedrms,
            self.population,
            self.ave_occup,
            self.latitude,
            self.longitude,
        ]
    }
}

/// Single prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Predicted median house value
    pub prediction: f64,
}

/// Batch of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictRequest {
    /// Rows to predict, in order
    pub rows: Vec<PredictRequest>,
}

/// Batch predictions, same length and order as the request rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    /// One prediction per row
    pub predictions: Vec<f64>,
}

/// Liveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`
    pub status: String,
}

/// Error body for 4xx/5xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
}
