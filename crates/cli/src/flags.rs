use anyhow::{Context as AnyhowContext, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use knowledge_indexer::{ConfigOverrides, ExtractorConfig};
use knowledge_protocol::Secret;
use std::path::PathBuf;

/// Command-line flags. Each option also reads its environment variable; an explicit flag wins.
#[derive(Parser, Default)]
#[command(name = "knowledge-extractor")]
#[command(about = "Extract structured, summarized knowledge from a Java repository", long_about = None)]
#[command(version)]
pub struct Cli {
    /// TOML config file, layered between built-in defaults and the environment
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Git repository to clone (HTTPS or SSH)
    #[arg(long, env = "REPO_URL")]
    pub repo_url: Option<String>,

    /// Checkout directory (cloned into, or used as-is when no URL is given)
    #[arg(long, env = "REPO_PATH")]
    pub repo_path: Option<PathBuf>,

    /// Personal access token for private HTTPS repositories
    #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
    pub git_token: Option<String>,

    /// Remove an existing checkout before cloning
    #[arg(long, env = "FORCE_CLONE", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub force_clone: Option<bool>,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "GROQ_API_BASE")]
    pub api_base: Option<String>,

    /// Model name
    #[arg(long, env = "GROQ_MODEL")]
    pub model: Option<String>,

    /// Token budget per chunk
    #[arg(long, env = "CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// Tokens of trailing context carried into the next chunk
    #[arg(long, env = "OVERLAP_SIZE")]
    pub overlap_size: Option<usize>,

    /// Total attempts per model call
    #[arg(long, env = "MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// First retry delay in seconds; doubles on every retry
    #[arg(long, env = "BASE_BACKOFF")]
    pub base_backoff: Option<f64>,

    /// Where the knowledge JSON is written
    #[arg(short, long, env = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,

    /// Vector document store directory
    #[arg(long, env = "STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Skip the vector document store
    #[arg(long)]
    pub no_store: bool,

    /// Source extension to scan (repeatable)
    #[arg(long = "extension", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Skip the project narrative overview request
    #[arg(long)]
    pub no_overview: bool,

    /// Extract structure and metrics without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Print run statistics as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also append log lines to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// The environment-and-flags layer
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            chunk_size: self.chunk_size,
            overlap_size: self.overlap_size,
            max_retries: self.max_retries,
            base_backoff: self.base_backoff,
            api_key: self.api_key.clone().map(Secret::from),
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            repo_url: self.repo_url.clone(),
            repo_path: self.repo_path.clone(),
            git_token: self.git_token.clone().map(Secret::from),
            force_clone: self.force_clone,
            output_file: self.output.clone(),
            store_dir: self.store_dir.clone(),
            vector_store: self.no_store.then_some(false),
            extensions: (!self.extensions.is_empty()).then(|| self.extensions.clone()),
            overview_summary: self.no_overview.then_some(false),
            dry_run: self.dry_run.then_some(true),
            ..Default::default()
        }
    }
}

/// defaults < TOML file < environment < flags
pub fn resolve_config(cli: &Cli) -> Result<ExtractorConfig> {
    let mut config = ExtractorConfig::default();
    if let Some(path) = &cli.config {
        let file = ConfigOverrides::from_file(path)?;
        config
            .apply(file)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
    }
    config
        .apply(cli.overrides())
        .context("Invalid command-line or environment settings")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unset_switches_leave_lower_layers_alone() {
        let overrides = Cli::default().overrides();
        assert!(overrides.vector_store.is_none());
        assert!(overrides.overview_summary.is_none());
        assert!(overrides.dry_run.is_none());
        assert!(overrides.extensions.is_none());
    }
}
