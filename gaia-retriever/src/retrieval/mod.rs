//! Dual-granularity indexing and two-stage retrieval.
//!
//! ```text
//! Document ─┬─ chunk(fine_chunk_size)   → fine collection   ─┐
//!           └─ chunk(coarse_chunk_size) → coarse collection ─┤
//!                                                            │
//! Question → recall (fine, k = recall_width, similarity > threshold)
//!          → candidate documents
//!          → re-rank (coarse, k = rerank_width, per candidate)
//!          → merge, sort, truncate
//! ```

pub mod coordinator;
pub mod indexer;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::storage::Collection;
use crate::storage::memory_store::MemoryCollection;
use crate::storage::sqlite_store::VectorDatabase;
use gaia_embed::EmbeddingProvider;
use std::sync::Arc;

pub use coordinator::{RecallOutcome, RetrievalCoordinator};
pub use indexer::{DualIndexer, IngestionChunkError, IngestionReport};

/// The fine and coarse collections of one corpus.
#[derive(Clone)]
pub struct CollectionPair {
    pub fine: Arc<dyn Collection>,
    pub coarse: Arc<dyn Collection>,
}

impl CollectionPair {
    pub fn new(fine: Arc<dyn Collection>, coarse: Arc<dyn Collection>) -> Self {
        Self { fine, coarse }
    }

    /// Open both collections named in `config` inside `db`.
    pub async fn open(
        db: &VectorDatabase,
        config: &RetrievalConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let fine = db
            .get_or_create_collection(&config.fine_collection, Arc::clone(&provider))
            .await?;
        let coarse = db
            .get_or_create_collection(&config.coarse_collection, provider)
            .await?;
        Ok(Self::new(Arc::new(fine), Arc::new(coarse)))
    }

    /// Two fresh in-memory collections.
    pub fn in_memory(config: &RetrievalConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            Arc::new(MemoryCollection::new(&config.fine_collection, Arc::clone(&provider))),
            Arc::new(MemoryCollection::new(&config.coarse_collection, provider)),
        )
    }
}

impl std::fmt::Debug for CollectionPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionPair")
            .field("fine", &self.fine.name())
            .field("coarse", &self.coarse.name())
            .finish()
    }
}
