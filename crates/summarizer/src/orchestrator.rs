use crate::backend::{BackendError, SummaryBackend};
use crate::prompt::{OverviewPrompt, PromptPayload, StructuredSummary};
use crate::retry::RetryPolicy;
use crate::types::{OverviewResult, SummaryResult};
use knowledge_chunker::Chunk;
use knowledge_protocol::Redactor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives chunk summarization one request at a time.
///
/// Every chunk resolves to a [`SummaryResult`]; backend errors, exhausted retries and
/// cancellation are all represented as `Failure` values rather than returned errors.
pub struct SummarizationOrchestrator {
    backend: Arc<dyn SummaryBackend>,
    policy: RetryPolicy,
    redactor: Redactor,
    cancel: CancellationToken,
}

impl SummarizationOrchestrator {
    #[must_use]
    pub fn new(backend: Arc<dyn SummaryBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            redactor: Redactor::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Mask these credentials in every log line and failure message
    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Summarize chunks in index order; the output has one result per chunk, same order.
    pub async fn summarize_all(&self, chunks: &[Chunk]) -> Vec<SummaryResult> {
        let total = chunks.len();
        let mut results = Vec::with_capacity(total);
        let mut announced_cancel = false;

        for chunk in chunks {
            if self.cancel.is_cancelled() && !announced_cancel {
                log::warn!(
                    "cancelled: {} of {total} chunks left unsummarized",
                    total - results.len()
                );
                announced_cancel = true;
            }
            results.push(self.summarize_chunk(chunk, total).await);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        log::info!(
            "summarized {succeeded}/{total} chunks via {}",
            self.backend.name()
        );
        results
    }

    pub async fn summarize_chunk(&self, chunk: &Chunk, total: usize) -> SummaryResult {
        let entities = chunk.entities();
        let label = format!("chunk {}/{}", chunk.index + 1, total.max(1));
        log::debug!(
            "{label}: {} fragments, ~{} tokens",
            chunk.fragments.len(),
            chunk.token_estimate
        );

        let payload = PromptPayload::for_chunk(chunk, total);
        let parse = |raw: String| StructuredSummary::parse(&raw, &entities);
        match self.call_with_retry(&label, &payload, parse).await {
            Ok((summary, attempts)) => SummaryResult::Success {
                chunk_index: chunk.index,
                entities,
                summary,
                attempts,
            },
            Err((error, attempts)) => SummaryResult::Failure {
                chunk_index: chunk.index,
                entities,
                kind: error.kind,
                message: error.message,
                attempts,
            },
        }
    }

    /// Project-level narrative, under the same retry policy
    pub async fn summarize_overview(&self, prompt: &OverviewPrompt) -> OverviewResult {
        let payload = prompt.to_payload();
        let parse = |raw: String| {
            let text = raw.trim();
            if text.is_empty() {
                Err(BackendError::malformed("empty completion"))
            } else {
                Ok(text.to_string())
            }
        };
        match self.call_with_retry("overview", &payload, parse).await {
            Ok((text, attempts)) => OverviewResult::Success { text, attempts },
            Err((error, attempts)) => OverviewResult::Failure {
                kind: error.kind,
                message: error.message,
                attempts,
            },
        }
    }

    async fn call_with_retry<T, F>(
        &self,
        label: &str,
        payload: &PromptPayload,
        parse: F,
    ) -> Result<(T, u32), (BackendError, u32)>
    where
        F: Fn(String) -> Result<T, BackendError>,
    {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err((BackendError::cancelled(), attempt));
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(BackendError::cancelled()),
                result = self.backend.complete(payload) => result.and_then(&parse),
            };

            let error = match outcome {
                Ok(value) => {
                    log::info!("{label} attempt {attempt}/{max} succeeded");
                    return Ok((value, attempt));
                }
                Err(error) => BackendError {
                    message: self.redactor.redact(&error.message),
                    ..error
                },
            };

            log::warn!(
                "{label} attempt {attempt}/{max} failed ({}): {}",
                error.kind,
                error.message
            );
            if !error.is_retryable() || !self.policy.has_attempts_after(attempt) {
                return Err((error, attempt));
            }

            let delay = self.policy.delay_after(attempt, error.retry_after);
            log::debug!("{label} retrying in {:.1}s", delay.as_secs_f64());
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    return Err((BackendError::cancelled(), attempt));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
