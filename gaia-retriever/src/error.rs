//! Error taxonomy for indexing and retrieval.
//!
//! Storage backends speak `anyhow`; the indexer and coordinator wrap those
//! failures into [`RetrieverError`] so callers can tell which collection or
//! which retrieval stage went wrong.

use std::fmt;
use std::path::PathBuf;

/// Which half of the two-stage search a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Stage 1: broad query over the fine collection.
    Recall,
    /// Stage 2: per-document query over the coarse collection.
    Rerank,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Recall => write!(f, "recall"),
            Stage::Rerank => write!(f, "re-rank"),
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrieverError>;

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    /// A collection could not be opened or created. Fatal before ingestion starts.
    #[error("Failed to open collection {collection}: {source}")]
    Initialization {
        collection: String,
        #[source]
        source: anyhow::Error,
    },

    /// A collection query failed. No partial results are returned.
    #[error(
        "{stage} query failed{}: {source}",
        .document.as_deref().map(|d| format!(" for document {d}")).unwrap_or_default()
    )]
    Query {
        stage: Stage,
        document: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// The caller cancelled the query while `stage` was in flight.
    #[error("Query cancelled during {stage}")]
    Cancelled { stage: Stage },

    /// Walking or reading the document tree failed.
    #[error("Failed to read documents from {}: {source}", .path.display())]
    Documents {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// Answer generation failed.
    #[error("Answer generation failed: {source}")]
    Answer {
        #[source]
        source: anyhow::Error,
    },

    /// The configuration file is missing or invalid.
    #[error("Invalid configuration{}: {message}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config {
        path: Option<PathBuf>,
        message: String,
    },
}

impl RetrieverError {
    pub fn config<S: Into<String>>(path: Option<PathBuf>, message: S) -> Self {
        Self::Config {
            path,
            message: message.into(),
        }
    }
}
