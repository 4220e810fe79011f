//! Evaluation Client — the public entry point for candidate fit evaluation.
//!
//! Owns one request/response lifecycle per call: input check, payload build,
//! bounded transport call with transient-failure retry, text extraction, strict
//! decode, shape validation. Holds no mutable state, so one client is shared
//! freely across concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::evaluation::error::EvaluationError;
use crate::evaluation::models::{EvaluationRequest, EvaluationResult};
use crate::evaluation::request_builder::build_payload;
use crate::evaluation::validation::{decode_generation, validate_shape};
use crate::llm_client::{GenerationRequest, GenerationResponse, InferenceTransport, TransportError};

pub const DEFAULT_MODEL: &str = "llama3.1:8b-instruct-q4_K_M";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_RETRY_BUDGET: u32 = 1;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Per-client evaluation settings, passed in at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    pub model: String,
    /// Bound on each transport attempt.
    pub timeout: Duration,
    /// Extra attempts allowed after a transient failure.
    pub retry_budget: u32,
    /// Delay before the first retry; doubles for each one after.
    pub retry_backoff: Duration,
    pub strip_code_fences: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            strip_code_fences: true,
        }
    }
}

#[derive(Clone)]
pub struct EvaluationClient {
    transport: Arc<dyn InferenceTransport>,
    config: EvaluatorConfig,
}

impl EvaluationClient {
    pub fn new(transport: Arc<dyn InferenceTransport>, config: EvaluatorConfig) -> Self {
        Self { transport, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Evaluates one resume against one job description.
    ///
    /// Blank input fails before any network traffic. Dropping the returned future
    /// cancels the in-flight transport call.
    pub async fn evaluate(
        &self,
        resume_text: &str,
        job_description_text: &str,
    ) -> Result<EvaluationResult, EvaluationError> {
        let request = EvaluationRequest::new(resume_text, job_description_text)?;

        let span = info_span!("evaluation", model = %self.config.model);
        let outcome = self.run(&request).instrument(span.clone()).await;

        match &outcome {
            Ok(result) => span.in_scope(|| {
                info!(
                    fit_score = result.fit_score(),
                    strengths = result.strengths().len(),
                    missing = result.missing().len(),
                    "evaluation completed"
                )
            }),
            Err(err) => span.in_scope(|| warn!("evaluation failed: {err}")),
        }

        outcome
    }

    async fn run(
        &self,
        request: &EvaluationRequest<'_>,
    ) -> Result<EvaluationResult, EvaluationError> {
        let payload = build_payload(request);
        let generation = GenerationRequest {
            model: self.config.model.clone(),
            prompt: payload.instruction,
            structured_output: payload.structured_output,
        };

        let response = self.send_with_retry(&generation).await?;

        if let Some(model) = &response.model {
            debug!("generation answered by model {model}");
        }
        if !response.done {
            warn!("engine reported an unfinished generation");
        }

        let raw = response
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or(EvaluationError::EmptyResponse)?;

        let object = decode_generation(&raw, self.config.strip_code_fences)?;
        validate_shape(&object)
    }

    /// Sends the request, retrying transient failures up to the retry budget.
    /// Each attempt is bounded by the configured timeout.
    async fn send_with_retry(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, EvaluationError> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = self
                    .config
                    .retry_backoff
                    .saturating_mul(2_u32.saturating_pow(attempt - 1));
                warn!(
                    "inference attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let call = self.transport.generate(request);
            let outcome = match tokio::time::timeout(self.config.timeout, call).await {
                Ok(outcome) => outcome,
                Err(_elapsed) => Err(TransportError::Timeout),
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < self.config.retry_budget => {
                    debug!("transient inference failure: {err}");
                    attempt += 1;
                }
                Err(TransportError::Timeout) => {
                    return Err(EvaluationError::TransportTimeout(self.config.timeout))
                }
                Err(err) => return Err(EvaluationError::TransportFailure(err)),
            }
        }
    }
}
