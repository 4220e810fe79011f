use std::time::Duration;

use thiserror::Error;

use crate::llm_client::TransportError;

/// Every way a single evaluation can fail. Each variant is terminal for the call;
/// none of them is ever turned into a default result.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("{0} must not be blank")]
    InvalidInput(&'static str),

    #[error("inference engine did not respond within {0:?}")]
    TransportTimeout(Duration),

    #[error("inference transport failed: {0}")]
    TransportFailure(#[source] TransportError),

    #[error("inference engine returned no text")]
    EmptyResponse,

    #[error("engine output is not a JSON object: {0}")]
    MalformedResponse(String),

    #[error("engine output field `{field}` is invalid: {reason}")]
    InvalidShape { field: &'static str, reason: String },
}

impl EvaluationError {
    pub(crate) fn shape(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            field,
            reason: reason.into(),
        }
    }
}
