//! Writes every document into both collections.
//!
//! Each document is chunked twice, once per granularity, and every chunk carries
//! the document id and an owned copy of the document's categories. Chunk ids are
//! `"{document_id}_{index}"`, numbered independently in each collection.
//!
//! A chunk that fails to store is logged and recorded in the
//! [`IngestionReport`]; the remaining chunks and documents are still ingested.

use super::CollectionPair;
use crate::config::RetrievalConfig;
use crate::documents::Document;
use crate::storage::{ChunkRecord, Collection};
use gaia_context::WindowChunker;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A chunk that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionChunkError {
    pub chunk_id: String,
    pub collection: String,
    pub message: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub documents: usize,
    pub fine_chunks_stored: usize,
    pub coarse_chunks_stored: usize,
    pub failures: Vec<IngestionChunkError>,
}

impl IngestionReport {
    /// True when every chunk was stored.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct DualIndexer {
    fine: Arc<dyn Collection>,
    coarse: Arc<dyn Collection>,
    fine_chunker: WindowChunker,
    coarse_chunker: WindowChunker,
}

impl DualIndexer {
    pub fn new(collections: &CollectionPair, config: &RetrievalConfig) -> Self {
        Self {
            fine: Arc::clone(&collections.fine),
            coarse: Arc::clone(&collections.coarse),
            fine_chunker: WindowChunker::new(config.fine_chunk_size)
                .with_overlap_ratio(config.overlap_ratio),
            coarse_chunker: WindowChunker::new(config.coarse_chunk_size)
                .with_overlap_ratio(config.overlap_ratio),
        }
    }

    /// Ingest `documents` in order.
    pub async fn store_documents(&self, documents: &[Document]) -> IngestionReport {
        let mut report = IngestionReport::default();

        for document in documents {
            self.store_document(document, &mut report).await;
        }

        info!(
            "Ingested {} documents: {} fine chunks, {} coarse chunks, {} failures",
            report.documents,
            report.fine_chunks_stored,
            report.coarse_chunks_stored,
            report.failures.len()
        );
        report
    }

    /// Ingest one document, adding its counts and failures to `report`.
    pub async fn store_document(&self, document: &Document, report: &mut IngestionReport) {
        debug!("Indexing {}", document.id);
        report.documents += 1;

        report.fine_chunks_stored += store_chunks(
            self.fine.as_ref(),
            &self.fine_chunker,
            document,
            &mut report.failures,
        )
        .await;
        report.coarse_chunks_stored += store_chunks(
            self.coarse.as_ref(),
            &self.coarse_chunker,
            document,
            &mut report.failures,
        )
        .await;
    }
}

async fn store_chunks(
    collection: &dyn Collection,
    chunker: &WindowChunker,
    document: &Document,
    failures: &mut Vec<IngestionChunkError>,
) -> usize {
    let mut stored = 0;

    for (index, content) in chunker.chunks(&document.text).into_iter().enumerate() {
        let record = ChunkRecord {
            id: format!("{}_{}", document.id, index),
            content,
            document_id: document.id.clone(),
            categories: document.categories.clone(),
        };
        let chunk_id = record.id.clone();

        match collection.insert(record).await {
            Ok(()) => stored += 1,
            Err(e) => {
                warn!("Skipping chunk {chunk_id} in {}: {e:#}", collection.name());
                failures.push(IngestionChunkError {
                    chunk_id,
                    collection: collection.name().to_string(),
                    message: format!("{e:#}"),
                });
            }
        }
    }

    debug!(
        "{}: stored {stored} chunks of {} at size {}",
        collection.name(),
        document.id,
        chunker.chunk_size()
    );
    stored
}
