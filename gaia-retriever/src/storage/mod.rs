//! Storage abstraction for chunk collections.
//!
//! A [`Collection`] is a named set of chunks of one granularity, searchable by
//! text similarity. The indexer writes into two collections and the retrieval
//! coordinator reads from them; neither knows which backend sits behind the
//! trait.
//!
//! ## Key Components
//!
//! - **Collection**: insert, similarity query with a metadata filter, count, clear
//! - **ChunkRecord / QueryResult**: what goes in and what comes back
//! - **MetadataFilter**: equality on `document_id` and category membership
//! - **Backends**: [`sqlite_store`] (persistent) and [`memory_store`] (tests, ad hoc use)
//!
//! ## Architecture
//!
//! ```text
//!                ┌─ SqliteCollection ── VectorDatabase (one file, many collections)
//! Collection ────┤
//!                └─ MemoryCollection
//!        ↑
//!   EmbeddingProvider (content and query text → f16 vectors)
//! ```

use anyhow::Result;
use async_trait::async_trait;
use half::f16;
use serde::Serialize;
use std::collections::BTreeSet;

pub mod memory_store;
pub mod sqlite_store;

/// One chunk as handed to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    /// `"{document_id}_{index}"`, unique within its collection
    pub id: String,
    pub content: String,
    pub document_id: String,
    pub categories: BTreeSet<String>,
}

/// A chunk returned from a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub chunk_id: String,
    pub content: String,
    pub document_id: String,
    pub categories: BTreeSet<String>,
    /// Higher is more relevant
    pub similarity: f32,
}

/// Equality filter applied before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub document_id: Option<String>,
    pub category: Option<String>,
}

impl MetadataFilter {
    /// No constraints.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_document(document_id: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            category: None,
        }
    }

    pub fn with_category(self, category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..self
        }
    }

    pub fn matches(&self, document_id: &str, categories: &BTreeSet<String>) -> bool {
        self.document_id.as_deref().is_none_or(|d| d == document_id)
            && self.category.as_ref().is_none_or(|c| categories.contains(c))
    }
}

/// A named, single-granularity set of searchable chunks.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Store a chunk. A chunk with the same id replaces the previous one.
    async fn insert(&self, record: ChunkRecord) -> Result<()>;

    /// Up to `k` chunks matching `filter`, most similar to `text` first.
    async fn query(&self, text: &str, k: usize, filter: &MetadataFilter) -> Result<Vec<QueryResult>>;

    async fn count(&self) -> Result<usize>;

    /// Drop every chunk of this collection.
    async fn clear(&self) -> Result<()>;
}

/// Cosine similarity; 0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot_product = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        let x = x.to_f32();
        let y = y.to_f32();
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a.sqrt() * norm_b.sqrt())
    }
}

/// Sort by similarity, highest first, keeping input order among ties.
///
/// NaN scores rank below every number.
pub(crate) fn rank_by_similarity(results: &mut [QueryResult]) {
    results.sort_by(|a, b| rank_key(b.similarity).total_cmp(&rank_key(a.similarity)));
}

fn rank_key(similarity: f32) -> f32 {
    if similarity.is_nan() {
        f32::NEG_INFINITY
    } else {
        // -0.0 ties with 0.0
        similarity + 0.0
    }
}
