//! HTTP request handlers

use super::{
    AppState, BatchPredictRequest, BatchPredictResponse, ErrorResponse, HealthResponse,
    PredictRequest, PredictResponse,
};
use crate::dataset::{Matrix, FEATURE_NAMES};
use crate::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn rejected(rejection: &JsonRejection) -> ApiError {
    tracing::debug!(error = %rejection.body_text(), "rejected request body");
    error(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
}

/// Liveness check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Predict a single row
///
/// # Errors
///
/// 422 for a malformed body, 500 if the model fails.
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| rejected(&e))?;
    let predictions = run_model(&state, &[request]).await?;
    let prediction = predictions
        .first()
        .copied()
        .ok_or_else(|| error(StatusCode::INTERNAL_SERVER_ERROR, "model returned no prediction"))?;
    Ok(Json(PredictResponse { prediction }))
}

/// Predict a batch of rows, preserving order
///
/// # Errors
///
/// 422 for a malformed body, 500 if the model fails.
pub async fn predict_batch(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BatchPredictRequest>, JsonRejection>,
) -> std::result::Result<Json<BatchPredictResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| rejected(&e))?;
    if request.rows.is_empty() {
        return Ok(Json(BatchPredictResponse {
            predictions: Vec::new(),
        }));
    }
    let predictions = run_model(&state, &request.rows).await?;
    Ok(Json(BatchPredictResponse { predictions }))
}

async fn run_model(
    state: &AppState,
    rows: &[PredictRequest],
) -> std::result::Result<Vec<f64>, ApiError> {
    let n_rows = rows.len();
    let data: Vec<f64> = rows.iter().flat_map(PredictRequest::values).collect();
    let predictor = state.predictor.clone();

    let outcome = tokio::task::spawn_blocking(move || -> Result<Vec<f64>> {
        let matrix = Matrix::from_vec(n_rows, FEATURE_NAMES.len(), data)?;
        predictor.predict_rows(&FEATURE_NAMES, &matrix)
    })
    .await;

    match outcome {
        Ok(Ok(predictions)) if predictions.len() == n_rows => Ok(predictions),
        Ok(Ok(predictions)) => Err(error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("model returned {} predictions for {n_rows} rows", predictions.len()),
        )),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "prediction failed");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "prediction task failed");
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, "prediction task failed"))
        }
    }
}
