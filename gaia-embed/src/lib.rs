//! # gaia-embed
//!
//! Text embeddings for the gaia retrieval pipeline, behind one async trait so
//! that storage and retrieval code never care where vectors come from.
//!
//! ## Providers
//!
//! - [`OllamaEmbeddingProvider`]: batched requests to an Ollama server
//!   (`/api/embed`), defaulting to `jina/jina-embeddings-v2-base-de`.
//! - [`HashEmbeddingProvider`]: deterministic feature hashing, for offline use
//!   and tests.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gaia_embed::{EmbedConfig, EmbeddingProvider, OllamaEmbeddingProvider};
//!
//! # async fn example() -> gaia_embed::Result<()> {
//! let provider = OllamaEmbeddingProvider::new(EmbedConfig::default())?;
//!
//! let texts = vec!["Hallo Welt".to_string(), "Wie geht es dir?".to_string()];
//! let result = provider.embed_texts(&texts).await?;
//!
//! println!("Generated {} embeddings of dimension {}",
//!          result.len(), result.dimension);
//! # Ok(())
//! # }
//! ```
//!
//! ## Memory Usage
//!
//! Embeddings are returned as half-precision (`f16`) vectors, normalized to unit
//! length by default, so cosine similarity reduces to a dot product downstream.

pub mod config;
pub mod error;
pub mod ollama;
pub mod provider;

// Re-export main types for easy access
pub use config::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_URL, EmbedConfig};
pub use error::{EmbedError, Result};
pub use ollama::OllamaEmbeddingProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult, HashEmbeddingProvider, to_f16};
