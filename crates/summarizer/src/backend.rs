use crate::prompt::PromptPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure classes of a single model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request rejected as malformed or too large
    InvalidInput,
    /// Missing, invalid or unauthorized credentials
    Authentication,
    /// Response arrived but could not be used
    MalformedResponse,
    Timeout,
    RateLimited,
    /// 5xx from the provider
    ServerError,
    /// Connection-level failure before a response arrived
    Transport,
    /// The run was cancelled before the chunk resolved
    Cancelled,
}

impl FailureKind {
    /// Whether another attempt may succeed
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited | Self::ServerError | Self::Transport
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Authentication => "authentication",
            Self::MalformedResponse => "malformed_response",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Transport => "transport",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed model call, classified for the retry policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
    /// Provider-supplied minimum wait before the next attempt
    pub retry_after: Option<Duration>,
}

impl BackendError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(FailureKind::RateLimited, message)
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "run cancelled")
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Remote text-completion capability used for summarization
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Send one prompt and return the raw completion text
    async fn complete(&self, prompt: &PromptPayload) -> Result<String, BackendError>;
}
