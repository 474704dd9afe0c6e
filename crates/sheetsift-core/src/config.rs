//! Query configuration passed into the relevance engine at construction time.
//!
//! Loaded from TOML with per-field defaults, e.g.
//!
//! ```toml
//! model_id = "gpt-4.1-mini-2025-04-14"
//! relevance_threshold = 0.7
//! chunk_size = 100
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_MODEL_ID: &str = "gpt-4.1-mini-2025-04-14";
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Passed verbatim to the classifier.
    pub model_id: String,
    /// Minimum relevance score, stated in the prompt.
    pub relevance_threshold: f32,
    /// Maximum rows per classifier request.
    pub chunk_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl QueryConfig {
    /// Parse and validate a TOML document. Missing fields take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), model = %config.model_id, "loaded query config");
        Ok(config)
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_relevance_threshold(mut self, threshold: f32) -> Self {
        self.relevance_threshold = threshold;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model_id.trim().is_empty() {
            return Err(ConfigError::Invalid("model_id must not be empty".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::Invalid(format!(
                "relevance_threshold must be within [0, 1], got {}",
                self.relevance_threshold
            )));
        }
        Ok(())
    }
}
