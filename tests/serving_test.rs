//! HTTP serving tests, driven in-process through the router

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use housing_ml::artifact::ModelArtifact;
use housing_ml::dataset::{get_data, HousingSource, Matrix, FEATURE_NAMES};
use housing_ml::models::{Estimator, LinearPipeline, Regressor};
use housing_ml::registry::register_best_model;
use housing_ml::serve::{
    load_model, router, AppState, ModelSource, PredictRequest, Predictor, ServeConfig,
};
use housing_ml::tracking::{connect, TrackingContext};
use housing_ml::train::{train_in_context, TrainConfig};
use housing_ml::Error;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

// =============================================================================
// Fixtures
// =============================================================================

/// Predicts the `MedInc` column and counts calls.
#[derive(Default)]
struct CountingPredictor {
    calls: AtomicUsize,
}

impl Predictor for CountingPredictor {
    fn predict_rows(&self, columns: &[&str], rows: &Matrix) -> housing_ml::Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let col = columns
            .iter()
            .position(|c| *c == "MedInc")
            .ok_or_else(|| Error::InvalidInput("missing MedInc".to_string()))?;
        Ok(rows.rows().map(|r| r[col]).collect())
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

/// Always fails.
struct BrokenPredictor;

impl Predictor for BrokenPredictor {
    fn predict_rows(&self, _: &[&str], _: &Matrix) -> housing_ml::Result<Vec<f64>> {
        Err(Error::NotFitted)
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

fn app_with(predictor: Arc<dyn Predictor>) -> Router {
    router(AppState::new(
        predictor,
        ModelSource::LocalFile(PathBuf::from("model.bin")),
    ))
}

fn row(med_inc: f64) -> Value {
    json!({
        "MedInc": med_inc,
        "HouseAge": 41.0,
        "AveRooms": 6.98,
        "AveBedrms": 1.02,
        "Population": 322.0,
        "AveOccup": 2.55,
        "Latitude": 37.88,
        "Longitude": -122.23
    })
}

async fn post(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Linear model over all eight features, saved as a packaged file.
fn packaged_model(dir: &TempDir) -> PathBuf {
    let split = get_data(&HousingSource::synthetic(200), 0.2, 42).unwrap();
    let mut model = Regressor::from(LinearPipeline::new());
    model.fit(split.x_train(), split.y_train()).unwrap();
    let artifact = ModelArtifact::new("LinearRegression", split.feature_names().to_vec(), model);
    let path = dir.path().join("model.bin");
    artifact.save(&path).unwrap();
    path
}

// =============================================================================
// Endpoints
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = app_with(Arc::new(CountingPredictor::default()));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_predict_single_row() {
    let dir = TempDir::new().unwrap();
    let path = packaged_model(&dir);
    let artifact = ModelArtifact::load(&path).unwrap();

    let features: Vec<f64> = vec![8.3252, 41.0, 6.98, 1.02, 322.0, 2.55, 37.88, -122.23];
    let expected = artifact
        .predict(&Matrix::from_vec(1, 8, features).unwrap())
        .unwrap()[0];

    let app = app_with(Arc::new(artifact));
    let (status, body) = post(app, "/predict", &row(8.3252)).await;
    assert_eq!(status, StatusCode::OK);
    let prediction = body["prediction"].as_f64().unwrap();
    assert!(prediction.is_finite());
    assert!((prediction - expected).abs() < 1e-9);
}

#[tokio::test]
async fn test_predict_batch_preserves_order() {
    let predictor = Arc::new(CountingPredictor::default());
    let app = app_with(predictor.clone());
    let rows: Vec<Value> = [1.0, 5.0, 2.0, 4.0, 3.0].into_iter().map(row).collect();

    let (status, body) = post(app, "/predict_batch", &json!({ "rows": rows })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predictions": [1.0, 5.0, 2.0, 4.0, 3.0]}));
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_predict_batch_empty() {
    let predictor = Arc::new(CountingPredictor::default());
    let app = app_with(predictor.clone());
    let (status, body) = post(app, "/predict_batch", &json!({ "rows": [] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predictions": []}));
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_field_is_rejected_before_model() {
    let predictor = Arc::new(CountingPredictor::default());
    let mut body = row(8.3);
    body.as_object_mut().unwrap().remove("MedInc");

    let (status, response) = post(app_with(predictor.clone()), "/predict", &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response["error"].as_str().unwrap().contains("MedInc"));

    let (status, _) = post(
        app_with(predictor.clone()),
        "/predict_batch",
        &json!({ "rows": [row(1.0), body] }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_types_and_malformed_json_rejected() {
    let predictor = Arc::new(CountingPredictor::default());
    let mut wrong_type = row(8.3);
    wrong_type["HouseAge"] = json!("forty-one");
    let (status, _) = post(app_with(predictor.clone()), "/predict", &wrong_type).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app_with(predictor.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_model_failure_is_server_error() {
    let (status, body) = post(app_with(Arc::new(BrokenPredictor)), "/predict", &row(1.0)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("not fitted"));
}

// =============================================================================
// Startup Model Resolution
// =============================================================================

#[test]
fn test_load_model_prefers_local_file() {
    let dir = TempDir::new().unwrap();
    let path = packaged_model(&dir);
    let config = ServeConfig::default()
        .with_model_path(&path)
        .with_tracking_uri("http://unused:5000");
    let (artifact, source) = load_model(&config).unwrap();
    assert_eq!(artifact.model_name(), "LinearRegression");
    assert_eq!(source, ModelSource::LocalFile(path));
}

#[test]
fn test_load_model_falls_back_to_registry() {
    let dir = TempDir::new().unwrap();
    let uri = format!("file://{}", dir.path().join("mlruns").display());
    let backend = connect(Some(uri.as_str())).unwrap();
    let ctx = TrackingContext::new(Arc::clone(&backend), "serving").unwrap();
    let config = TrainConfig::builder()
        .experiment_name("serving")
        .source(HousingSource::synthetic(200))
        .build();
    let result = train_in_context(&ctx, &config).unwrap();
    register_best_model(backend.as_ref(), &result.best_run_id, "housing").unwrap();

    let config = ServeConfig::default()
        .with_model_path(dir.path().join("absent.bin"))
        .with_tracking_uri(uri)
        .with_registered_model("housing", 1);
    let (artifact, source) = load_model(&config).unwrap();
    assert_eq!(artifact.model_name(), result.best_model_name);
    assert_eq!(
        source,
        ModelSource::Registry {
            name: "housing".to_string(),
            version: 1
        }
    );
    assert_eq!(source.to_string(), "models:/housing/1");
}

#[test]
fn test_load_model_unavailable() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("model.bin");

    // No file, no tracking URI
    let config = ServeConfig::default().with_model_path(&missing);
    assert!(matches!(load_model(&config), Err(Error::ModelUnavailable(_))));

    // No file, registry store that does not exist
    let config = ServeConfig::default()
        .with_model_path(&missing)
        .with_tracking_uri(format!("file://{}", dir.path().join("nowhere").display()));
    assert!(matches!(load_model(&config), Err(Error::ModelUnavailable(_))));
    assert!(!dir.path().join("nowhere").exists());

    // No file, unsupported registry scheme
    let config = ServeConfig::default()
        .with_model_path(&missing)
        .with_tracking_uri("http://localhost:5000");
    assert!(matches!(load_model(&config), Err(Error::ModelUnavailable(_))));

    // Registry exists but the version does not
    let store = dir.path().join("mlruns");
    connect(Some(store.to_str().unwrap())).unwrap();
    let config = ServeConfig::default()
        .with_model_path(&missing)
        .with_tracking_uri(store.to_str().unwrap())
        .with_registered_model("housing", 3);
    assert!(matches!(load_model(&config), Err(Error::ModelUnavailable(_))));
}

#[tokio::test]
async fn test_serve_refuses_to_start_without_model() {
    let dir = TempDir::new().unwrap();
    // Ephemeral port; the test only returns if startup fails before binding
    let config = ServeConfig::default()
        .with_bind_addr("127.0.0.1:0".parse().unwrap())
        .with_model_path(dir.path().join("model.bin"));
    assert!(config.tracking_uri.is_none());

    let result = housing_ml::serve::serve(config).await;
    assert!(matches!(result, Err(Error::ModelUnavailable(_))));
}

#[test]
fn test_feature_order_on_the_wire() {
    let request: PredictRequest = serde_json::from_value(row(3.0)).unwrap();
    let values = request.values();
    assert_eq!(values.len(), FEATURE_NAMES.len());
    assert_eq!(values[0], 3.0);
    assert_eq!(values[7], -122.23);
}
