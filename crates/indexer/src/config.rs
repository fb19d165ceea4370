use knowledge_chunker::ChunkerConfig;
use knowledge_protocol::{Redactor, Secret};
use knowledge_summarizer::{
    GroqConfig, RetryPolicy, DEFAULT_API_BASE, DEFAULT_BASE_BACKOFF, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_BACKOFF, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REPO_PATH: &str = "cloned_code_repo";
pub const DEFAULT_OUTPUT_FILE: &str = "structured_knowledge.json";
pub const DEFAULT_STORE_DIR: &str = "knowledge_store";

/// Fatal configuration problems; nothing is processed when one of these is returned
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GROQ_API_KEY is not set; provide an API key or run with --dry-run")]
    MissingApiKey,

    #[error("no repository URL given and no existing repository at {}", .0.display())]
    MissingRepository(PathBuf),

    #[error("invalid chunking budget: {0}")]
    InvalidChunking(String),

    #[error("max attempts must be at least 1")]
    ZeroAttempts,

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("cannot load config file {}: {message}", path.display())]
    File { path: PathBuf, message: String },
}

/// Immutable settings for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub chunker: ChunkerConfig,

    /// Total attempts per model call, first one included
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,

    pub api_key: Option<Secret>,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Duration,

    /// Cloned into `repo_path` when set; otherwise `repo_path` must already exist
    pub repo_url: Option<String>,
    pub repo_path: PathBuf,
    pub git_token: Option<Secret>,
    pub force_clone: bool,

    pub output_file: PathBuf,
    pub store_dir: PathBuf,
    pub vector_store: bool,

    /// Source extensions to scan, without the leading dot
    pub extensions: Vec<String>,
    pub overview_summary: bool,
    pub dry_run: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            repo_url: None,
            repo_path: PathBuf::from(DEFAULT_REPO_PATH),
            git_token: None,
            force_clone: false,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            vector_store: true,
            extensions: vec!["java".to_string()],
            overview_summary: true,
            dry_run: false,
        }
    }
}

impl ExtractorConfig {
    /// Layer `overrides` on top of the current values. Unset fields keep their value and
    /// blank credentials or URLs count as unset.
    pub fn apply(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(v) = overrides.chunk_size {
            self.chunker.chunk_size = v;
        }
        if let Some(v) = overrides.overlap_size {
            self.chunker.overlap_size = v;
        }
        if let Some(v) = overrides.max_retries {
            self.max_attempts = v;
        }
        if let Some(v) = overrides.base_backoff {
            self.base_backoff = seconds("base_backoff", v)?;
        }
        if let Some(v) = overrides.max_backoff {
            self.max_backoff = seconds("max_backoff", v)?;
        }
        if let Some(v) = overrides.api_key.filter(|k| !k.is_empty()) {
            self.api_key = Some(v);
        }
        if let Some(v) = overrides.api_base.filter(|s| !s.trim().is_empty()) {
            self.api_base = v;
        }
        if let Some(v) = overrides.model.filter(|s| !s.trim().is_empty()) {
            self.model = v;
        }
        if let Some(v) = overrides.request_timeout {
            self.request_timeout = seconds("request_timeout", v)?;
        }
        if let Some(v) = overrides.repo_url.filter(|s| !s.trim().is_empty()) {
            self.repo_url = Some(v);
        }
        if let Some(v) = overrides.repo_path {
            self.repo_path = v;
        }
        if let Some(v) = overrides.git_token.filter(|k| !k.is_empty()) {
            self.git_token = Some(v);
        }
        if let Some(v) = overrides.force_clone {
            self.force_clone = v;
        }
        if let Some(v) = overrides.output_file {
            self.output_file = v;
        }
        if let Some(v) = overrides.store_dir {
            self.store_dir = v;
        }
        if let Some(v) = overrides.vector_store {
            self.vector_store = v;
        }
        if let Some(v) = overrides.extensions {
            self.extensions = v
                .into_iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        if let Some(v) = overrides.overview_summary {
            self.overview_summary = v;
        }
        if let Some(v) = overrides.dry_run {
            self.dry_run = v;
        }
        Ok(())
    }

    /// Checked once, before any repository access or parsing
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker
            .validate()
            .map_err(ConfigError::InvalidChunking)?;

        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.base_backoff > self.max_backoff {
            return Err(ConfigError::InvalidValue {
                key: "base_backoff",
                reason: format!(
                    "{:?} exceeds max_backoff {:?}",
                    self.base_backoff, self.max_backoff
                ),
            });
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "extensions",
                reason: "at least one file extension is required".to_string(),
            });
        }
        if self.repo_url.is_none() && !self.repo_path.exists() {
            return Err(ConfigError::MissingRepository(self.repo_path.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn summaries_enabled(&self) -> bool {
        !self.dry_run
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_backoff).with_max_backoff(self.max_backoff)
    }

    /// Backend settings, when a non-blank API key is configured
    #[must_use]
    pub fn groq_config(&self) -> Option<GroqConfig> {
        let api_key = self.api_key.clone().filter(|key| !key.is_empty())?;
        let mut config = GroqConfig::new(api_key);
        config.base_url = self.api_base.clone();
        config.model = self.model.clone();
        config.request_timeout = self.request_timeout;
        Some(config)
    }

    /// Redactor that knows every configured credential
    #[must_use]
    pub fn redactor(&self) -> Redactor {
        let mut redactor = Redactor::new();
        for secret in [&self.api_key, &self.git_token].into_iter().flatten() {
            redactor.add_secret(secret);
        }
        redactor
    }
}

fn seconds(key: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::InvalidValue {
        key,
        reason: format!("{value} is not a valid number of seconds ({e})"),
    })
}

/// One configuration layer: a TOML file, the environment or command-line flags
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub chunk_size: Option<usize>,
    pub overlap_size: Option<usize>,
    pub max_retries: Option<u32>,
    /// Seconds
    pub base_backoff: Option<f64>,
    /// Seconds
    pub max_backoff: Option<f64>,
    pub api_key: Option<Secret>,
    pub api_base: Option<String>,
    pub model: Option<String>,
    /// Seconds
    pub request_timeout: Option<f64>,
    pub repo_url: Option<String>,
    pub repo_path: Option<PathBuf>,
    pub git_token: Option<Secret>,
    pub force_clone: Option<bool>,
    pub output_file: Option<PathBuf>,
    pub store_dir: Option<PathBuf>,
    pub vector_store: Option<bool>,
    pub extensions: Option<Vec<String>>,
    pub overview_summary: Option<bool>,
    pub dry_run: Option<bool>,
}

impl ConfigOverrides {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&raw).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
