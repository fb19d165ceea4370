use thiserror::Error;

/// Result type for summarizer setup
pub type Result<T> = std::result::Result<T, SummarizerError>;

/// Errors raised while constructing a summarization backend.
///
/// Per-chunk call failures never surface here; they are folded into
/// [`crate::SummaryResult::Failure`].
#[derive(Error, Debug)]
pub enum SummarizerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SummarizerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
