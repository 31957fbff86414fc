//! Router and server entry point

use super::{health, load_model, predict, predict_batch, AppState, ServeConfig};
use crate::Result;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/predict_batch", post(predict_batch))
        .with_state(state)
}

/// Load the model, then bind and serve until Ctrl-C.
///
/// The model is loaded before the socket is bound, so an unavailable model
/// never produces a listening server.
///
/// # Errors
///
/// Returns `ModelUnavailable`/`Artifact` from model loading and `Io` if the
/// address cannot be bound.
pub async fn serve(config: ServeConfig) -> Result<()> {
    let (artifact, source) = load_model(&config)?;
    tracing::info!(model = artifact.model_name(), %source, "model loaded");

    let app = router(AppState::new(Arc::new(artifact), source));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "serving predictions");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
