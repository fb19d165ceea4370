use crate::tokens::ModelFamily;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 3500;
pub const DEFAULT_OVERLAP_SIZE: usize = 300;

/// Configuration for structural chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Maximum chunk size in tokens (hard limit, except for a single oversized fragment)
    pub chunk_size: usize,

    /// Trailing context carried into the next chunk, in tokens
    pub overlap_size: usize,

    /// Tokenizer family the estimates are calibrated for
    pub model_family: ModelFamily,

    /// Maximum number of fields listed in an entity header fragment
    pub max_header_fields: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
            model_family: ModelFamily::default(),
            max_header_fields: 40,
        }
    }
}

impl ChunkerConfig {
    /// Config with explicit budgets and defaults for everything else
    #[must_use]
    pub fn with_budget(chunk_size: usize, overlap_size: usize) -> Self {
        Self {
            chunk_size,
            overlap_size,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.overlap_size >= self.chunk_size {
            return Err(format!(
                "overlap_size ({}) must be smaller than chunk_size ({})",
                self.overlap_size, self.chunk_size
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 3500);
        assert_eq!(config.overlap_size, 300);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ChunkerConfig::with_budget(0, 0);
        assert!(config.validate().is_err());

        config.chunk_size = 100;
        config.overlap_size = 100;
        assert!(config.validate().is_err());

        config.overlap_size = 99;
        assert!(config.validate().is_ok());

        config.overlap_size = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_like_input_fills_defaults() {
        let config: ChunkerConfig = serde_json::from_str(r#"{"chunk_size": 1200}"#).unwrap();
        assert_eq!(config.chunk_size, 1200);
        assert_eq!(config.overlap_size, DEFAULT_OVERLAP_SIZE);
    }
}
