/// LLM Client — the single point of entry for all inference-engine calls in the portal.
///
/// ARCHITECTURAL RULE: No other module may talk to the generation engine directly.
/// All LLM interactions MUST go through an `InferenceTransport`.
///
/// The production transport speaks the Ollama `/api/generate` protocol with streaming
/// disabled, so the whole generation arrives as one JSON envelope.
use std::error::Error as _;
use std::io;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

/// Transport-level failures. Classification into transient / terminal drives retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection reset: {0}")]
    ConnectionReset(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("engine returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response envelope: {0}")]
    Envelope(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl TransportError {
    /// Timeouts and dropped connections may succeed on a second attempt.
    /// Application-level rejections (non-2xx) and refused connections will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionReset(_))
    }

    /// HTTP status carried by the failure, when the engine answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if is_connection_reset(&e) {
            return Self::ConnectionReset(e.to_string());
        }
        if e.is_connect() {
            return Self::Connect(e.to_string());
        }
        if e.is_decode() {
            return Self::Envelope(e.to_string());
        }
        Self::Http(e.to_string())
    }
}

/// True when the peer dropped us mid-flight: either an io reset in the source chain,
/// or a request that was sent on an established connection and closed without any
/// response ("connection closed before message completed").
fn is_connection_reset(e: &reqwest::Error) -> bool {
    let mut source = e.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        source = err.source();
    }
    e.is_request() && !e.is_connect() && e.status().is_none()
}

/// One generation request as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Ask the engine for constrained JSON decoding. A hint only.
    pub structured_output: bool,
}

/// What the transport got back. `text` is `None` when the envelope had no generation field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: Option<String>,
    pub model: Option<String>,
    pub done: bool,
}

impl GenerationResponse {
    #[cfg(test)]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            model: None,
            done: true,
        }
    }
}

/// Seam between the evaluation logic and the network. Implementations must be
/// cancel-safe: dropping the returned future releases whatever it holds.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, TransportError>;
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// HTTP transport for an Ollama-compatible `/api/generate` endpoint.
///
/// Carries no timeout of its own; the evaluation client bounds each attempt and
/// dropping the in-flight future aborts the request.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
}

impl OllamaClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceTransport for OllamaClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError> {
        let body = OllamaRequest {
            model: &request.model,
            prompt: &request.prompt,
            format: request.structured_output.then_some("json"),
            stream: false,
        };

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let raw = response.text().await?;
        let envelope: OllamaResponse =
            serde_json::from_str(&raw).map_err(|e| TransportError::Envelope(e.to_string()))?;

        debug!(
            "Ollama call succeeded: model={:?}, eval_count={:?}, total_duration_ns={:?}",
            envelope.model, envelope.eval_count, envelope.total_duration
        );

        Ok(GenerationResponse {
            text: envelope.response,
            model: envelope.model,
            done: envelope.done,
        })
    }
}

/// Strips a ```json ... ``` or ``` ... ``` wrapper from LLM output.
///
/// Only applies when both an opening and a closing fence are present; returns
/// `None` otherwise. Any language tag on the opening fence line (`json`, `JSON`,
/// `jsonc`, ...) is dropped.
pub fn strip_json_fences(text: &str) -> Option<&str> {
    let text = text.trim();
    let inner = text.strip_prefix("```")?.strip_suffix("```")?;
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if is_fence_tag(tag) => rest,
        _ => strip_json_tag(inner),
    };
    Some(inner.trim())
}

fn is_fence_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// Single-line fences: ```json {...}```
fn strip_json_tag(inner: &str) -> &str {
    match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{one_shot_engine, Canned};
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_strip_json_fences_with_uppercase_tag() {
        let input = "```JSON\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_strip_json_fences_with_other_tag() {
        let input = "```jsonc\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_strip_json_fences_single_line() {
        assert_eq!(strip_json_fences("```JSON {\"a\": 1}```"), Some("{\"a\": 1}"));
        assert_eq!(strip_json_fences("```{\"a\": 1}```"), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_strip_json_fences_keeps_object_on_first_line() {
        let input = "```{\"a\": 1,\n\"b\": 2}\n```";
        assert_eq!(strip_json_fences(input), Some("{\"a\": 1,\n\"b\": 2}"));
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("{\"key\": \"value\"}"), None);
    }

    #[test]
    fn test_strip_json_fences_requires_closing_fence() {
        assert_eq!(strip_json_fences("```json\n{\"key\": \"value\"}"), None);
    }

    #[test]
    fn test_strip_json_fences_tolerates_surrounding_whitespace() {
        let input = "\n\n  ```json\n{}\n```  \n";
        assert_eq!(strip_json_fences(input), Some("{}"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::ConnectionReset("peer reset".into()).is_transient());
        assert!(!TransportError::Connect("refused".into()).is_transient());
        assert!(!TransportError::Status {
            status: 503,
            message: "loading".into()
        }
        .is_transient());
        assert!(!TransportError::Envelope("eof".into()).is_transient());
    }

    #[test]
    fn test_status_only_for_http_rejections() {
        let err = TransportError::Status {
            status: 404,
            message: "model not found".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(TransportError::Timeout.status(), None);
    }

    #[test]
    fn test_ollama_request_sets_json_format_and_disables_streaming() {
        let body = OllamaRequest {
            model: "llama3.1",
            prompt: "hi",
            format: Some("json"),
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert_eq!(value["model"], "llama3.1");
    }

    #[test]
    fn test_ollama_request_omits_format_without_hint() {
        let body = OllamaRequest {
            model: "llama3.1",
            prompt: "hi",
            format: None,
            stream: false,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("format").is_none());
    }

    #[test]
    fn test_ollama_envelope_without_response_field() {
        let envelope: OllamaResponse =
            serde_json::from_str(r#"{"model": "llama3.1", "done": true}"#).unwrap();
        assert!(envelope.response.is_none());
        assert!(envelope.done);
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            model: "llama3.1".to_string(),
            prompt: "evaluate".to_string(),
            structured_output: true,
        }
    }

    fn respond(status: u16, body: &str) -> Canned {
        Canned::Respond {
            status,
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_posts_envelope_and_returns_text() {
        let body = r#"{"model":"llama3.1","response":"{\"fitScore\":82}","done":true,"eval_count":12}"#;
        let (client, engine) = one_shot_engine(respond(200, body)).await;

        let response = client.generate(&request()).await.unwrap();
        assert_eq!(response.text.as_deref(), Some(r#"{"fitScore":82}"#));
        assert_eq!(response.model.as_deref(), Some("llama3.1"));
        assert!(response.done);

        let sent = engine.await.unwrap();
        assert!(sent.starts_with("POST /api/generate HTTP/1.1"));
        assert!(sent.contains(r#""format":"json""#));
        assert!(sent.contains(r#""stream":false"#));
    }

    #[tokio::test]
    async fn test_generate_parses_error_body_on_rejection() {
        let body = r#"{"error":"model 'llama3.1' not found"}"#;
        let (client, _engine) = one_shot_engine(respond(404, body)).await;

        match client.generate(&request()).await.unwrap_err() {
            TransportError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "model 'llama3.1' not found");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_keeps_raw_body_when_error_is_not_json() {
        let (client, _engine) = one_shot_engine(respond(500, "upstream exploded")).await;

        let err = client.generate(&request()).await.unwrap_err();
        assert!(!err.is_transient());
        match err {
            TransportError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_non_json_success_body_is_envelope_error() {
        let (client, _engine) = one_shot_engine(respond(200, "<html>proxy page</html>")).await;

        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Envelope(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_generate_envelope_without_response_yields_no_text() {
        let body = r#"{"model":"llama3.1","done":true}"#;
        let (client, _engine) = one_shot_engine(respond(200, body)).await;

        let response = client.generate(&request()).await.unwrap();
        assert!(response.text.is_none());
        assert!(response.done);
    }

    #[tokio::test]
    async fn test_peer_closing_without_answer_is_transient_reset() {
        let (client, engine) = one_shot_engine(Canned::HangUp).await;

        let err = client.generate(&request()).await.unwrap_err();
        assert!(
            matches!(err, TransportError::ConnectionReset(_)),
            "expected ConnectionReset, got {err:?}"
        );
        assert!(err.is_transient());
        assert!(engine.await.unwrap().starts_with("POST "));
    }

    #[tokio::test]
    async fn test_refused_connection_is_terminal() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OllamaClient {
            client: Client::builder().no_proxy().build().unwrap(),
            endpoint: format!("http://{addr}/api/generate"),
        };
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
        assert!(!err.is_transient());
    }
}
