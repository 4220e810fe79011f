// Candidate Fit Evaluation: resume + job description in, validated verdict out.
// All engine calls go through llm_client — no direct HTTP here.

pub mod client;
pub mod error;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod request_builder;
pub mod validation;

pub use client::{EvaluationClient, EvaluatorConfig};
pub use error::EvaluationError;
