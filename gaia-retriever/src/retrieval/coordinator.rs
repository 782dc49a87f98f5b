//! Two-stage retrieval.
//!
//! Stage 1 (recall) asks the fine collection for the `recall_width` nearest
//! chunks and keeps those scoring strictly above `similarity_threshold`. The
//! documents behind the kept chunks, in first-seen order, are the candidates.
//!
//! Stage 2 (re-rank) asks the coarse collection for the `rerank_width` nearest
//! chunks of each candidate. The per-candidate queries run concurrently; their
//! results are concatenated in candidate order, stably sorted by similarity and
//! truncated to the requested limit, so ties keep candidate order.
//!
//! Any failed query aborts the whole call. A cancelled call fails with
//! [`RetrieverError::Cancelled`] and returns nothing.

use super::CollectionPair;
use crate::config::RetrievalConfig;
use crate::error::{Result, RetrieverError, Stage};
use crate::storage::{Collection, MetadataFilter, QueryResult, rank_by_similarity};
use futures::future::try_join_all;
use itertools::Itertools;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Stage 1 results, split by the similarity threshold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallOutcome {
    pub kept: Vec<QueryResult>,
    pub discarded: Vec<QueryResult>,
    /// Distinct document ids of `kept`, in first-seen order
    pub candidates: Vec<String>,
}

pub struct RetrievalCoordinator {
    fine: Arc<dyn Collection>,
    coarse: Arc<dyn Collection>,
    config: RetrievalConfig,
}

impl RetrievalCoordinator {
    pub fn new(collections: &CollectionPair, config: RetrievalConfig) -> Self {
        Self {
            fine: Arc::clone(&collections.fine),
            coarse: Arc::clone(&collections.coarse),
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Ranked coarse chunks relevant to `question`, at most `limit` of them.
    ///
    /// Returns an empty list when no fine chunk clears the threshold.
    pub async fn query(&self, question: &str, limit: usize) -> Result<Vec<QueryResult>> {
        self.query_with_cancel(question, limit, &CancellationToken::new())
            .await
    }

    /// [`RetrievalCoordinator::query`], aborting when `cancel` fires.
    pub async fn query_with_cancel(
        &self,
        question: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<QueryResult>> {
        let recall = self.recall_with_cancel(question, cancel).await?;
        if recall.candidates.is_empty() {
            debug!("No fine chunk above {}, nothing to re-rank", self.config.similarity_threshold);
            return Ok(Vec::new());
        }

        let results = self.rerank(question, &recall.candidates, cancel).await?;
        Ok(merge_ranked(results, limit))
    }

    /// Stage 1 on its own, for inspection.
    pub async fn recall(&self, question: &str) -> Result<RecallOutcome> {
        self.recall_with_cancel(question, &CancellationToken::new())
            .await
    }

    async fn recall_with_cancel(
        &self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<RecallOutcome> {
        let results = guarded_query(
            self.fine.as_ref(),
            question,
            self.config.recall_width,
            &MetadataFilter::none(),
            Stage::Recall,
            cancel,
        )
        .await?;

        let threshold = self.config.similarity_threshold;
        let (kept, discarded): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.similarity > threshold);

        for result in &kept {
            debug!("recall kept {} ({:.3})", result.chunk_id, result.similarity);
        }
        for result in &discarded {
            debug!("recall discarded {} ({:.3})", result.chunk_id, result.similarity);
        }

        let candidates = kept.iter().map(|r| r.document_id.clone()).unique().collect();
        Ok(RecallOutcome {
            kept,
            discarded,
            candidates,
        })
    }

    async fn rerank(
        &self,
        question: &str,
        candidates: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<QueryResult>> {
        debug!("Re-ranking within {} candidate documents", candidates.len());

        let per_document = try_join_all(candidates.iter().map(|document_id| async move {
            let filter = MetadataFilter::for_document(document_id.as_str());
            guarded_query(
                self.coarse.as_ref(),
                question,
                self.config.rerank_width,
                &filter,
                Stage::Rerank,
                cancel,
            )
            .await
        }))
        .await?;

        Ok(per_document.into_iter().flatten().collect())
    }
}

/// Run one collection query, mapping failures to `stage` and racing `cancel`.
async fn guarded_query(
    collection: &dyn Collection,
    question: &str,
    k: usize,
    filter: &MetadataFilter,
    stage: Stage,
    cancel: &CancellationToken,
) -> Result<Vec<QueryResult>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RetrieverError::Cancelled { stage }),
        result = collection.query(question, k, filter) => {
            result.map_err(|source| RetrieverError::Query {
                stage,
                document: filter.document_id.clone(),
                source,
            })
        }
    }
}

/// Stable sort by similarity, highest first, then keep `limit`.
fn merge_ranked(mut results: Vec<QueryResult>, limit: usize) -> Vec<QueryResult> {
    rank_by_similarity(&mut results);
    results.truncate(limit);
    results
}
