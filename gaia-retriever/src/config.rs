//! Configuration for indexing, retrieval, embeddings and answer generation.
//!
//! Everything has a default, so a missing file means a working setup against a
//! local Ollama server. A `gaia.toml` can override any subset:
//!
//! ```toml
//! database_dir = "./vectors"
//!
//! [retrieval]
//! similarity_threshold = 0.35
//! recall_width = 40
//!
//! [embedding]
//! model = "jina/jina-embeddings-v2-base-de"
//!
//! [answer]
//! model = "cyberwald/llama-3.1-sauerkrautlm-8b-instruct"
//! ```

use crate::error::{Result, RetrieverError};
use gaia_context::DEFAULT_OVERLAP_RATIO;
use gaia_embed::{DEFAULT_OLLAMA_URL, EmbedConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "gaia.toml";

/// Parameters of the two chunk granularities and the two-stage search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Target window size of the fine collection, in characters
    pub fine_chunk_size: usize,
    /// Target window size of the coarse collection, in characters
    pub coarse_chunk_size: usize,
    /// Fraction of a window repeated at the start of the next one
    pub overlap_ratio: f64,
    /// Number of fine chunks fetched in stage 1
    pub recall_width: usize,
    /// Number of coarse chunks fetched per candidate document in stage 2
    pub rerank_width: usize,
    /// Fine chunks must score strictly above this to nominate their document
    pub similarity_threshold: f32,
    /// Name of the fine collection
    pub fine_collection: String,
    /// Name of the coarse collection
    pub coarse_collection: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fine_chunk_size: 512,
            coarse_chunk_size: 2048,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            recall_width: 25,
            rerank_width: 5,
            similarity_threshold: 0.4,
            fine_collection: "small-chunks".to_string(),
            coarse_collection: "big-chunks".to_string(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_chunk_sizes(self, fine_chunk_size: usize, coarse_chunk_size: usize) -> Self {
        Self {
            fine_chunk_size,
            coarse_chunk_size,
            ..self
        }
    }

    pub fn with_overlap_ratio(self, overlap_ratio: f64) -> Self {
        Self {
            overlap_ratio,
            ..self
        }
    }

    pub fn with_recall_width(self, recall_width: usize) -> Self {
        Self {
            recall_width,
            ..self
        }
    }

    pub fn with_rerank_width(self, rerank_width: usize) -> Self {
        Self {
            rerank_width,
            ..self
        }
    }

    pub fn with_similarity_threshold(self, similarity_threshold: f32) -> Self {
        Self {
            similarity_threshold,
            ..self
        }
    }

    /// Check value ranges. Errors carry no path; [`GaiaConfig::load`] adds it.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| RetrieverError::config(None, message);

        if self.fine_chunk_size == 0 || self.coarse_chunk_size == 0 {
            return Err(invalid("chunk sizes must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.overlap_ratio) {
            return Err(invalid(format!(
                "overlap_ratio must be in [0, 1), got {}",
                self.overlap_ratio
            )));
        }
        if self.recall_width == 0 || self.rerank_width == 0 {
            return Err(invalid("recall_width and rerank_width must be at least 1".to_string()));
        }
        if !self.similarity_threshold.is_finite() {
            return Err(invalid("similarity_threshold must be a finite number".to_string()));
        }
        if self.fine_collection == self.coarse_collection {
            return Err(invalid("fine and coarse collections must have different names".to_string()));
        }
        Ok(())
    }
}

/// Settings for the language model that turns passages into an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    pub base_url: String,
    pub model: String,
    /// Request timeout in seconds; generation on CPU can be slow
    pub timeout_secs: u64,
    /// Prompt preamble. `{question}` is replaced by the question.
    pub preamble: String,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: "cyberwald/llama-3.1-sauerkrautlm-8b-instruct".to_string(),
            timeout_secs: 300,
            preamble: crate::answer::DEFAULT_PREAMBLE.to_string(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaiaConfig {
    /// Directory holding the vector database
    pub database_dir: PathBuf,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbedConfig,
    pub answer: AnswerConfig,
}

impl Default for GaiaConfig {
    fn default() -> Self {
        Self {
            database_dir: PathBuf::from("./vectors"),
            retrieval: RetrievalConfig::default(),
            embedding: EmbedConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

impl GaiaConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`] in the
    /// working directory is used when present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    tracing::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| RetrieverError::config(Some(path.clone()), e.to_string()))?;
        let config = Self::from_toml(&raw).map_err(|e| match e {
            RetrieverError::Config { message, .. } => RetrieverError::config(Some(path.clone()), message),
            other => other,
        })?;

        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| RetrieverError::config(None, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        self.embedding
            .validate()
            .map_err(|e| RetrieverError::config(None, e.to_string()))?;
        Ok(())
    }
}
