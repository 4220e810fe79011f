//! Axum route handlers for the Evaluation API.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::models::{EvaluationResult, FitBand};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub resume_text: String,
    pub job_description_text: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub model: String,
    pub fit_band: FitBand,
    pub result: EvaluationResult,
}

/// POST /api/v1/evaluations
///
/// Scores one resume against one job description. Nothing is persisted.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    let evaluation_id = Uuid::new_v4();
    let result = state
        .evaluator
        .evaluate(&request.resume_text, &request.job_description_text)
        .instrument(info_span!("evaluate_request", %evaluation_id))
        .await?;

    Ok(Json(EvaluateResponse {
        evaluation_id,
        evaluated_at: Utc::now(),
        model: state.evaluator.model().to_string(),
        fit_band: result.band(),
        result,
    }))
}
