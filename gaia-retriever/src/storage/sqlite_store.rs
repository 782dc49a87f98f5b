//! SQLite-backed collections.
//!
//! One database file holds any number of named collections. Chunks are stored
//! with their f16 embedding as a blob; similarity is computed in memory over the
//! rows that pass the metadata filter, which SQLite applies first.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE collections (
//!     name TEXT PRIMARY KEY,
//!     created_at TIMESTAMP NOT NULL
//! );
//!
//! CREATE TABLE chunks (
//!     collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
//!     id TEXT NOT NULL,                -- "{document_id}_{index}"
//!     document_id TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     categories TEXT NOT NULL,        -- JSON array of strings
//!     embedding BLOB NOT NULL,         -- f16 vector
//!     created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
//!     PRIMARY KEY (collection, id)
//! );
//! ```

use super::{ChunkRecord, Collection, MetadataFilter, QueryResult, cosine_similarity, rank_by_similarity};
use crate::error::RetrieverError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gaia_embed::EmbeddingProvider;
use half::f16;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the database inside the configured directory.
pub const DATABASE_FILE: &str = "gaia.db";

/// Summary of one collection, for `gaia stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub chunk_count: usize,
    pub document_count: usize,
}

/// Handle to the vector database. Cheap to clone.
#[derive(Clone, Debug)]
pub struct VectorDatabase {
    location: Option<PathBuf>,
    pool: SqlitePool,
}

impl VectorDatabase {
    /// Opens (or creates) `dir/gaia.db`.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating database directory {}", dir.display()))?;
        let db_path = dir.join(DATABASE_FILE);

        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(&db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true),
        )
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;

        tracing::debug!("Opened vector database at {}", db_path.display());
        Self::new_with_pool(Some(db_path), pool).await
    }

    /// In-memory database for tests.
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub async fn open_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::new().in_memory(true).foreign_keys(true))
            .await?;
        Self::new_with_pool(None, pool).await
    }

    async fn new_with_pool(location: Option<PathBuf>, pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { location, pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                created_at TIMESTAMP NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                content TEXT NOT NULL,
                categories TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id),
                FOREIGN KEY (collection) REFERENCES collections(name) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(collection, document_id)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Path of the database file, `None` for in-memory databases.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Open the collection `name`, registering it on first use.
    pub async fn get_or_create_collection(
        &self,
        name: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> std::result::Result<SqliteCollection, RetrieverError> {
        let registered = sqlx::query(
            r#"
            INSERT INTO collections (name, created_at)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RetrieverError::Initialization {
            collection: name.to_string(),
            source: e.into(),
        })?;

        if registered.rows_affected() > 0 {
            tracing::info!("Created collection {name}");
        } else {
            tracing::debug!("Opened existing collection {name}");
        }

        Ok(SqliteCollection {
            name: name.to_string(),
            pool: self.pool.clone(),
            provider,
        })
    }

    pub async fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let rows = sqlx::query(
            r#"
            SELECT c.name AS name,
                   c.created_at AS created_at,
                   COUNT(k.id) AS chunk_count,
                   COUNT(DISTINCT k.document_id) AS document_count
            FROM collections c
            LEFT JOIN chunks k ON k.collection = c.name
            GROUP BY c.name, c.created_at
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let chunk_count: i64 = row.try_get("chunk_count")?;
                let document_count: i64 = row.try_get("document_count")?;
                Ok(CollectionInfo {
                    name: row.try_get("name")?,
                    created_at: row.try_get("created_at")?,
                    chunk_count: chunk_count as usize,
                    document_count: document_count as usize,
                })
            })
            .collect()
    }
}

/// A named collection inside a [`VectorDatabase`].
#[derive(Clone)]
pub struct SqliteCollection {
    name: String,
    pool: SqlitePool,
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SqliteCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCollection")
            .field("name", &self.name)
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

fn encode_embedding(embedding: &[f16]) -> &[u8] {
    bytemuck::cast_slice::<f16, u8>(embedding)
}

// Blobs come back with byte alignment, so they are decoded pairwise instead of cast.
fn decode_embedding(bytes: &[u8]) -> Vec<f16> {
    bytes
        .chunks_exact(2)
        .map(|pair| f16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[async_trait]
impl Collection for SqliteCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert(&self, record: ChunkRecord) -> Result<()> {
        let embedding = self.provider.embed_text(&record.content).await?;
        let categories = serde_json::to_string(&record.categories)?;

        sqlx::query(
            r#"
            INSERT INTO chunks (collection, id, document_id, content, categories, embedding)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(collection, id) DO UPDATE SET
                document_id = excluded.document_id,
                content = excluded.content,
                categories = excluded.categories,
                embedding = excluded.embedding,
                created_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&self.name)
        .bind(&record.id)
        .bind(&record.document_id)
        .bind(&record.content)
        .bind(categories)
        .bind(encode_embedding(&embedding))
        .execute(&self.pool)
        .await
        .with_context(|| format!("storing chunk {} in {}", record.id, self.name))?;

        Ok(())
    }

    async fn query(&self, text: &str, k: usize, filter: &MetadataFilter) -> Result<Vec<QueryResult>> {
        let query_embedding = self.provider.embed_text(text).await?;

        let rows = sqlx::query(
            r#"
            SELECT id, document_id, content, categories, embedding
            FROM chunks
            WHERE collection = ?1
              AND (?2 IS NULL OR document_id = ?2)
              AND (?3 IS NULL OR EXISTS (
                    SELECT 1 FROM json_each(chunks.categories) WHERE json_each.value = ?3
                  ))
            ORDER BY rowid
            "#,
        )
        .bind(&self.name)
        .bind(filter.document_id.as_deref())
        .bind(filter.category.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let categories: String = row.try_get("categories")?;
            let embedding: Vec<u8> = row.try_get("embedding")?;
            results.push(QueryResult {
                chunk_id: row.try_get("id")?,
                content: row.try_get("content")?,
                document_id: row.try_get("document_id")?,
                categories: serde_json::from_str::<BTreeSet<String>>(&categories)?,
                similarity: cosine_similarity(&query_embedding, &decode_embedding(&embedding)),
            });
        }

        rank_by_similarity(&mut results);
        results.truncate(k);

        tracing::debug!("{}: {} results for query", self.name, results.len());
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM chunks WHERE collection = ?1")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        tracing::info!("Cleared {} chunks from {}", deleted.rows_affected(), self.name);
        Ok(())
    }
}
