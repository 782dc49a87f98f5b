//! In-memory [`Collection`], mainly for tests and one-shot runs.

use super::{ChunkRecord, Collection, MetadataFilter, QueryResult, cosine_similarity, rank_by_similarity};
use anyhow::Result;
use async_trait::async_trait;
use gaia_embed::EmbeddingProvider;
use half::f16;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Chunks and their embeddings kept in insertion order.
pub struct MemoryCollection {
    name: String,
    provider: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<(ChunkRecord, Vec<f16>)>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl std::fmt::Debug for MemoryCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCollection")
            .field("name", &self.name)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert(&self, record: ChunkRecord) -> Result<()> {
        let embedding = self.provider.embed_text(&record.content).await?;
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|(existing, _)| existing.id == record.id) {
            Some(slot) => *slot = (record, embedding),
            None => entries.push((record, embedding)),
        }
        Ok(())
    }

    async fn query(&self, text: &str, k: usize, filter: &MetadataFilter) -> Result<Vec<QueryResult>> {
        let query_embedding = self.provider.embed_text(text).await?;
        let entries = self.entries.read().await;

        let mut results: Vec<QueryResult> = entries
            .iter()
            .filter(|(record, _)| filter.matches(&record.document_id, &record.categories))
            .map(|(record, embedding)| QueryResult {
                chunk_id: record.id.clone(),
                content: record.content.clone(),
                document_id: record.document_id.clone(),
                categories: record.categories.clone(),
                similarity: cosine_similarity(&query_embedding, embedding),
            })
            .collect();

        rank_by_similarity(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
