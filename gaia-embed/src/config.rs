//! Configuration for embedding providers

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model served by Ollama.
pub const DEFAULT_EMBEDDING_MODEL: &str = "jina/jina-embeddings-v2-base-de";

/// Configuration for a remote embedding model.
///
/// Deserializes from the `[embedding]` table of the gaia configuration file;
/// any field left out takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Base URL of the embedding server
    pub base_url: String,
    /// Name of the embedding model to use
    pub model: String,
    /// Maximum number of texts sent per request
    pub batch_size: usize,
    /// Whether to L2-normalize embeddings
    pub normalize: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EmbedConfig {
    /// Configuration for `model` on the default local Ollama server.
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the server URL (builder style)
    pub fn with_base_url<S: Into<String>>(self, base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            ..self
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Endpoint used for batched embedding requests.
    pub fn embed_endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(EmbedError::invalid_config("base_url must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(EmbedError::invalid_config("model must not be empty"));
        }
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch_size must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            batch_size: 16,
            normalize: true,
            timeout_secs: 60,
        }
    }
}
