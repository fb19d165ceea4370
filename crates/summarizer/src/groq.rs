//! Groq backend over the OpenAI-compatible chat completions API

use crate::backend::{BackendError, FailureKind, SummaryBackend};
use crate::error::{Result, SummarizerError};
use crate::prompt::PromptPayload;
use async_trait::async_trait;
use knowledge_protocol::Secret;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`GroqBackend`]
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: Secret,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl GroqConfig {
    pub fn new(api_key: Secret) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Production [`SummaryBackend`]
pub struct GroqBackend {
    client: Client,
    api_key: Secret,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl GroqBackend {
    pub fn new(config: GroqConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(SummarizerError::invalid_config("Groq API key is required"));
        }
        if config.model.trim().is_empty() {
            return Err(SummarizerError::invalid_config("model name is required"));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            temperature: config.temperature,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body<'a>(&'a self, prompt: &'a PromptPayload) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        }
    }
}

#[async_trait]
impl SummaryBackend for GroqBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &PromptPayload) -> std::result::Result<String, BackendError> {
        log::debug!("POST {} (model {})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, retry_after.as_deref(), &body));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::new(FailureKind::Timeout, format!("reading response: {e}"))
            } else {
                BackendError::malformed(format!("undecodable response body: {e}"))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::malformed("response has no message content"))
    }
}

fn transport_error(err: &reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::new(FailureKind::Timeout, format!("request timed out: {err}"))
    } else {
        BackendError::new(FailureKind::Transport, format!("request failed: {err}"))
    }
}

/// Map a non-success HTTP status onto a failure class
#[must_use]
pub fn classify_status(status: StatusCode, retry_after: Option<&str>, body: &str) -> BackendError {
    let detail = error_detail(body);
    let message = if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    };

    match status.as_u16() {
        400 | 404 | 413 | 422 => BackendError::new(FailureKind::InvalidInput, message),
        401 | 403 => BackendError::new(FailureKind::Authentication, message),
        408 => BackendError::new(FailureKind::Timeout, message),
        429 => BackendError::rate_limited(message, retry_after.and_then(parse_retry_after)),
        500..=599 => BackendError::new(FailureKind::ServerError, message),
        _ => BackendError::new(FailureKind::InvalidInput, message),
    }
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}

/// Provider error message if the body is an OpenAI-style error envelope
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: ErrorBody,
    }
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groq_backend_creation() {
        let backend = GroqBackend::new(GroqConfig::new(Secret::new("gsk_test"))).unwrap();
        assert_eq!(
            backend.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(backend.name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_groq_backend_creation_empty_key() {
        let result = GroqBackend::new(GroqConfig::new(Secret::new("")));
        assert!(matches!(result, Err(SummarizerError::InvalidConfig(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let backend = GroqBackend::new(GroqConfig::new(Secret::new("gsk_test"))).unwrap();
        let prompt = PromptPayload {
            system: "sys".into(),
            user: "hello".into(),
        };
        let body = serde_json::to_value(backend.request_body(&prompt)).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_status_classification() {
        let cases = [
            (400, FailureKind::InvalidInput),
            (413, FailureKind::InvalidInput),
            (401, FailureKind::Authentication),
            (403, FailureKind::Authentication),
            (408, FailureKind::Timeout),
            (429, FailureKind::RateLimited),
            (500, FailureKind::ServerError),
            (503, FailureKind::ServerError),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(classify_status(status, None, "").kind, kind, "status {code}");
        }
    }

    #[test]
    fn test_rate_limit_reads_retry_after() {
        let err = classify_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some("2.5"),
            r#"{"error":{"message":"Rate limit reached"}}"#,
        );
        assert_eq!(err.retry_after, Some(Duration::from_millis(2500)));
        assert!(err.message.contains("Rate limit reached"));

        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, Some("soon"), "");
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn test_response_decoding() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
