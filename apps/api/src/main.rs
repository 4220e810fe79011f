mod config;
mod errors;
mod evaluation;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::evaluation::EvaluationClient;
use crate::llm_client::OllamaClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on unparseable env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting placement API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize inference transport + evaluator
    let transport = OllamaClient::new(config.ollama_url.clone())
        .context("Failed to build inference HTTP client")?;
    info!("Inference endpoint: {}", transport.endpoint());

    let evaluator_config = config.evaluator_config();
    info!(
        "Evaluator initialized (model: {}, timeout: {:?}, retry budget: {}, fence stripping: {})",
        evaluator_config.model,
        evaluator_config.timeout,
        evaluator_config.retry_budget,
        evaluator_config.strip_code_fences
    );
    let evaluator = EvaluationClient::new(Arc::new(transport), evaluator_config);

    // Build app state
    let state = AppState { evaluator };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS to the portal frontend origin

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
