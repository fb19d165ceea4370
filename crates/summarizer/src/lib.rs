//! # Knowledge Summarizer
//!
//! Sends each chunk to a remote model, one request at a time, and turns every outcome into a
//! [`SummaryResult`].
//!
//! - [`SummaryBackend`] is the seam to the model API; [`GroqBackend`] talks to any
//!   OpenAI-compatible `/chat/completions` endpoint.
//! - [`RetryPolicy`] caps attempts and spaces them with capped exponential backoff.
//! - Non-retryable failures (bad input, bad credentials, unusable responses) stop after one
//!   attempt; timeouts, rate limits, 5xx and transport errors are retried.
//! - A `CancellationToken` interrupts backoff and resolves the remaining chunks as cancelled.

mod backend;
mod error;
mod groq;
mod orchestrator;
mod prompt;
mod retry;
mod types;

pub use backend::{BackendError, FailureKind, SummaryBackend};
pub use error::{Result, SummarizerError};
pub use groq::{
    classify_status, GroqBackend, GroqConfig, DEFAULT_API_BASE, DEFAULT_MODEL,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use orchestrator::SummarizationOrchestrator;
pub use prompt::{OverviewPrompt, PromptPayload, StructuredSummary, MAX_CLASSES_IN_OVERVIEW};
pub use retry::{RetryPolicy, DEFAULT_BASE_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF};
pub use types::{OverviewResult, SummaryResult};
