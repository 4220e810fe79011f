use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::evaluation::client::{
    EvaluatorConfig, DEFAULT_MODEL, DEFAULT_RETRY_BACKOFF, DEFAULT_RETRY_BUDGET, DEFAULT_TIMEOUT,
};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Application configuration loaded from environment variables.
/// Every variable has a default; startup fails only on values that do not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ollama_url: String,
    pub evaluation_model: String,
    pub evaluation_timeout: Duration,
    pub evaluation_retry_budget: u32,
    pub evaluation_retry_backoff: Duration,
    pub evaluation_strip_code_fences: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            ollama_url: lookup("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            evaluation_model: lookup("EVALUATION_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            evaluation_timeout: Duration::from_secs(parse_or(
                &lookup,
                "EVALUATION_TIMEOUT_SECS",
                DEFAULT_TIMEOUT.as_secs(),
            )?),
            evaluation_retry_budget: parse_or(
                &lookup,
                "EVALUATION_RETRY_BUDGET",
                DEFAULT_RETRY_BUDGET,
            )?,
            evaluation_retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "EVALUATION_RETRY_BACKOFF_MS",
                DEFAULT_RETRY_BACKOFF.as_millis() as u64,
            )?),
            evaluation_strip_code_fences: parse_or(&lookup, "EVALUATION_STRIP_CODE_FENCES", true)?,
        })
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            model: self.evaluation_model.clone(),
            timeout: self.evaluation_timeout,
            retry_budget: self.evaluation_retry_budget,
            retry_backoff: self.evaluation_retry_backoff,
            strip_code_fences: self.evaluation_strip_code_fences,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.evaluator_config(), EvaluatorConfig::default());
    }

    #[test]
    fn test_overrides_flow_into_evaluator_config() {
        let config = config_from(&[
            ("OLLAMA_URL", "http://inference:11434/api/generate"),
            ("EVALUATION_MODEL", "mistral:7b"),
            ("EVALUATION_TIMEOUT_SECS", "30"),
            ("EVALUATION_RETRY_BUDGET", "0"),
            ("EVALUATION_RETRY_BACKOFF_MS", "250"),
            ("EVALUATION_STRIP_CODE_FENCES", "false"),
        ])
        .unwrap();

        assert_eq!(config.ollama_url, "http://inference:11434/api/generate");
        let evaluator = config.evaluator_config();
        assert_eq!(evaluator.model, "mistral:7b");
        assert_eq!(evaluator.timeout, Duration::from_secs(30));
        assert_eq!(evaluator.retry_budget, 0);
        assert_eq!(evaluator.retry_backoff, Duration::from_millis(250));
        assert!(!evaluator.strip_code_fences);
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = config_from(&[("EVALUATION_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("EVALUATION_TIMEOUT_SECS"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(config_from(&[("PORT", "99999")]).is_err());
    }
}
