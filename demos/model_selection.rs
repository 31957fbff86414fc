//! Model Selection Example
//!
//! Walks the whole workflow against a throwaway file-backed tracking store:
//! train the candidates, inspect the tracked runs, register the winner,
//! package it and predict with the packaged file.
//!
//! Run with: cargo run --example model_selection

use housing_ml::artifact::{ModelArtifact, MODEL_ARTIFACT_PATH};
use housing_ml::dataset::{HousingSource, Matrix, FEATURE_NAMES};
use housing_ml::metrics::{MAE, R2, RMSE};
use housing_ml::registry::{load_registered_model, register_best_model, DEFAULT_MODEL_NAME};
use housing_ml::tracking::{connect, TrackingContext};
use housing_ml::train::{train_in_context, TrainConfig};

fn main() -> anyhow::Result<()> {
    println!("=== housing-ml Model Selection ===\n");

    let workdir = tempfile::tempdir()?;
    let tracking_uri = format!("file://{}", workdir.path().join("mlruns").display());

    // -------------------------------------------------------------------------
    // 1. Train and track every candidate
    // -------------------------------------------------------------------------
    println!("1. Training candidates (tracking at {tracking_uri})...");

    let config = TrainConfig::builder()
        .experiment_name("demo")
        .tracking_uri(tracking_uri.clone())
        .random_state(42)
        .source(HousingSource::synthetic(2_000))
        .build();
    let backend = connect(config.tracking_uri())?;
    let ctx = TrackingContext::new(backend.clone(), config.experiment_name())?;
    let result = train_in_context(&ctx, &config)?;

    // -------------------------------------------------------------------------
    // 2. Compare the tracked runs
    // -------------------------------------------------------------------------
    println!("\n2. Tracked runs:");
    println!("   {:<18} {:>8} {:>8} {:>8}", "model", RMSE, MAE, R2);
    for run in backend.list_runs(ctx.experiment().experiment_id())? {
        let metric = |key| backend.latest_metric(run.run_id(), key);
        println!(
            "   {:<18} {:>8.4} {:>8.4} {:>8.4}",
            run.run_name(),
            metric(RMSE)?.unwrap_or(f64::NAN),
            metric(MAE)?.unwrap_or(f64::NAN),
            metric(R2)?.unwrap_or(f64::NAN),
        );
    }
    println!("\n   {result}");

    // -------------------------------------------------------------------------
    // 3. Register and package the winner
    // -------------------------------------------------------------------------
    println!("\n3. Registering best run...");
    let version = register_best_model(backend.as_ref(), &result.best_run_id, DEFAULT_MODEL_NAME)?;
    println!("   {} v{} <- {}", version.name, version.version, version.source);

    let artifact = load_registered_model(backend.as_ref(), &version.name, version.version)?;
    let packaged = workdir.path().join("model.bin");
    artifact.save(&packaged)?;
    println!(
        "   Packaged {MODEL_ARTIFACT_PATH} of {} to {}",
        artifact.model_name(),
        packaged.display()
    );

    // -------------------------------------------------------------------------
    // 4. Predict with the packaged model
    // -------------------------------------------------------------------------
    println!("\n4. Predicting with the packaged model...");
    let served = ModelArtifact::load(&packaged)?;
    let rows = Matrix::from_rows(&[
        vec![8.3252, 41.0, 6.984, 1.024, 322.0, 2.556, 37.88, -122.23],
        vec![2.1, 15.0, 4.5, 1.1, 1_500.0, 3.4, 34.05, -118.25],
    ])?;
    let predictions = served.predict_named(FEATURE_NAMES.as_slice(), &rows)?;
    for (row, prediction) in rows.rows().zip(predictions) {
        println!("   MedInc={:<7} -> {prediction:.3} (x $100k)", row[0]);
    }

    println!("\n=== Done ===");
    Ok(())
}
