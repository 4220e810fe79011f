pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Evaluation API
        .route("/api/v1/evaluations", post(handlers::handle_evaluate))
        .with_state(state)
}
