//! Tests for error types

use housing_ml::Error;

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("y_true has 3 values but y_pred has 2".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("y_pred has 2"));
}

#[test]
fn test_fit_error() {
    let error = Error::Fit("n_estimators must be positive".to_string());
    assert!(error.to_string().starts_with("Model fitting failed"));
}

#[test]
fn test_not_fitted_error() {
    let error_str = Error::NotFitted.to_string();
    assert!(error_str.contains("not fitted"));
    assert!(error_str.contains("fit()"));
}

#[test]
fn test_unsupported_tracking_uri_error() {
    let error = Error::UnsupportedTrackingUri("http://localhost:5000".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("http://localhost:5000"));
    assert!(error_str.contains("memory:"));
}

#[test]
fn test_model_unavailable_error() {
    let error = Error::ModelUnavailable("no model file at model.bin".to_string());
    assert!(error.to_string().contains("Model unavailable"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("file not found".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    let error: Error = io.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(error.to_string().contains("missing"));
}

#[test]
fn test_json_error_conversion() {
    let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = parse.into();
    assert!(matches!(error, Error::Json(_)));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync + std::error::Error>() {}
    assert_send_sync::<Error>();
}
