use knowledge_protocol::{Redactor, Secret};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// Failures while obtaining the source tree; messages never contain the token
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("authentication failed for {url}: {message}")]
    Authentication { url: String, message: String },

    #[error("network error while cloning {url}: {message}")]
    Network { url: String, message: String },

    #[error("repository not found: {url}")]
    NotFound { url: String },

    #[error("git failed: {0}")]
    Git(String),
}

/// Shallow-clones a repository into a fixed target directory
#[derive(Debug, Clone)]
pub struct RepositoryFetcher {
    target_dir: PathBuf,
    token: Option<Secret>,
    redactor: Redactor,
}

impl RepositoryFetcher {
    pub fn new(target_dir: impl AsRef<Path>, token: Option<Secret>) -> Self {
        let mut redactor = Redactor::new();
        if let Some(token) = &token {
            redactor.add_secret(token);
        }
        Self {
            target_dir: target_dir.as_ref().to_path_buf(),
            token,
            redactor,
        }
    }

    #[must_use]
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Clone `url` unless a checkout already exists; `force` removes it first
    pub async fn fetch(&self, url: &str, force: bool) -> Result<PathBuf, RepositoryError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RepositoryError::Git("repository URL is empty".to_string()));
        }
        let masked = self.redactor.redact(url);

        if self.target_dir.exists() {
            if force {
                log::warn!("Removing existing checkout {}", self.target_dir.display());
                tokio::fs::remove_dir_all(&self.target_dir)
                    .await
                    .map_err(|e| {
                        RepositoryError::Git(format!(
                            "cannot remove {}: {e}",
                            self.target_dir.display()
                        ))
                    })?;
            } else if self.target_dir.join(".git").exists() {
                log::info!("Using existing checkout at {}", self.target_dir.display());
                return Ok(self.target_dir.clone());
            } else {
                return Err(RepositoryError::Git(format!(
                    "{} exists but is not a git repository; use --force-clone to replace it",
                    self.target_dir.display()
                )));
            }
        }

        if self.token.is_some() {
            log::info!("Cloning {masked} (token authentication)");
        } else {
            log::info!("Cloning {masked} (unauthenticated)");
        }

        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--quiet"])
            .arg(self.authenticated_url(url))
            .arg(&self.target_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| RepositoryError::Git(format!("cannot run git: {e}")))?;

        if !output.status.success() {
            let stderr = self.redactor.redact(String::from_utf8_lossy(&output.stderr).trim());
            return Err(classify_clone_failure(&masked, &stderr));
        }

        log::info!("Cloned into {}", self.target_dir.display());
        Ok(self.target_dir.clone())
    }

    /// HTTPS URL with the token embedded; SSH and tokenless URLs pass through unchanged
    #[must_use]
    pub fn authenticated_url(&self, url: &str) -> String {
        let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) else {
            return url.to_string();
        };
        let Some(rest) = url.strip_prefix("https://") else {
            return url.to_string();
        };
        if rest.starts_with("gitlab.com") {
            format!("https://oauth2:{}@{rest}", token.expose())
        } else {
            format!("https://{}@{rest}", token.expose())
        }
    }
}

fn classify_clone_failure(url: &str, stderr: &str) -> RepositoryError {
    let lowered = stderr.to_ascii_lowercase();
    let url = url.to_string();
    if lowered.contains("authentication failed")
        || lowered.contains("could not read username")
        || lowered.contains("permission denied")
        || lowered.contains("403")
    {
        RepositoryError::Authentication {
            url,
            message: stderr.to_string(),
        }
    } else if lowered.contains("not found") || lowered.contains("does not exist") {
        RepositoryError::NotFound { url }
    } else if lowered.contains("could not resolve host")
        || lowered.contains("unable to access")
        || lowered.contains("timed out")
        || lowered.contains("connection")
        || lowered.contains("rate limit")
    {
        RepositoryError::Network {
            url,
            message: stderr.to_string(),
        }
    } else {
        RepositoryError::Git(stderr.to_string())
    }
}
