//! gaia-retriever: question answering over a folder of documents
//!
//! Documents are chunked at two granularities and stored in two vector
//! collections. A question first recalls small chunks to find the relevant
//! documents, then ranks the large chunks of only those documents. The ranked
//! passages feed an answer prompt.
//!
//! ## Key Modules
//!
//! - **[`documents`]**: directory walking, format conversion, category files
//! - **[`storage`]**: the `Collection` trait with SQLite and in-memory backends
//! - **[`retrieval`]**: dual-granularity indexer and two-stage coordinator
//! - **[`answer`]**: prompt assembly and the Ollama answer generator
//! - **[`config`]**: TOML configuration with defaults for every value
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gaia_embed::HashEmbeddingProvider;
//! use gaia_retriever::{
//!     config::RetrievalConfig,
//!     documents::Document,
//!     retrieval::{CollectionPair, DualIndexer, RetrievalCoordinator},
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RetrievalConfig::default();
//! let collections = CollectionPair::in_memory(&config, Arc::new(HashEmbeddingProvider::default()));
//!
//! let docs = vec![Document::new("orden.txt", "Der Orden der Waldtempler ...")];
//! DualIndexer::new(&collections, &config).store_documents(&docs).await;
//!
//! let passages = RetrievalCoordinator::new(&collections, config)
//!     .query("Wer führt den Orden?", 5)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Files → documents → DualIndexer → fine + coarse Collection (SQLite)
//!                                          ↓
//! Question → RetrievalCoordinator (recall → re-rank) → answer → LLM
//! ```

pub mod answer;
pub mod config;
pub mod documents;
pub mod error;
pub mod retrieval;
pub mod storage;

pub use error::{RetrieverError, Stage};
