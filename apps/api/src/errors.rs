use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::evaluation::EvaluationError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Evaluation(err) => evaluation_error_parts(err),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

/// Engine output is never echoed back to the client; only the category is.
fn evaluation_error_parts(err: &EvaluationError) -> (StatusCode, &'static str, String) {
    match err {
        EvaluationError::InvalidInput(_) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
        }
        EvaluationError::TransportTimeout(_) => {
            tracing::error!("Inference timeout: {err}");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "INFERENCE_TIMEOUT",
                "The evaluation engine did not respond in time".to_string(),
            )
        }
        EvaluationError::TransportFailure(inner) => {
            tracing::error!(status = ?inner.status(), "Inference transport error: {err}");
            (
                StatusCode::BAD_GATEWAY,
                "INFERENCE_UNAVAILABLE",
                "The evaluation engine could not be reached".to_string(),
            )
        }
        EvaluationError::EmptyResponse
        | EvaluationError::MalformedResponse(_)
        | EvaluationError::InvalidShape { .. } => {
            tracing::error!("Inference output rejected: {err}");
            (
                StatusCode::BAD_GATEWAY,
                "INFERENCE_BAD_OUTPUT",
                "The evaluation engine returned an unusable answer".to_string(),
            )
        }
    }
}
