use crate::evaluation::EvaluationClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Stateless; clones share one transport.
    pub evaluator: EvaluationClient,
}
