//! # housing-ml: Reproducible Model Selection for Housing Regression
//!
//! Trains a fixed set of candidate regressors on California-housing-shaped
//! tabular data, tracks every candidate as an experiment run, selects the
//! lowest-RMSE model, registers it, and serves predictions over HTTP.
//!
//! ## Workflow
//!
//! ```text
//! dataset ──> train (per candidate: fit → predict → eval → log) ──> best run
//!                                  │                                   │
//!                              tracking                            registry
//!                                                                      │
//!                                                                    serve
//! ```
//!
//! - **Reproducible**: the split and the stochastic candidates are seeded
//!   from one `random_state`
//! - **Deterministic selection**: strictly-lower RMSE wins, ties go to the
//!   earlier candidate
//! - **No leaked runs**: every run is closed on every exit path
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use housing_ml::train::{train_and_track, TrainConfig};
//!
//! let config = TrainConfig::builder()
//!     .experiment_name("t1")
//!     .random_state(42)
//!     .build();
//! let result = train_and_track(&config)?;
//! println!("{result}");
//! # Ok::<(), housing_ml::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod serve;
pub mod tracking;
pub mod train;

pub use error::{Error, Result};
pub use train::{train_and_track, TrainConfig, TrainingResult};
