//! End-to-end scenarios for indexing and two-stage retrieval
//!
//! These tests drive the public API the way the CLI does:
//! - Parsing a document folder with category files
//! - Indexing into both collections (in memory and SQLite)
//! - Recall narrowing the candidate documents before re-ranking
//! - Questions without any relevant document

use anyhow::Result;
use async_trait::async_trait;
use gaia_embed::{EmbeddingProvider, EmbeddingResult, to_f16};
use gaia_retriever::{
    config::RetrievalConfig,
    documents::{CONTEXT_FILE, Document, parse_documents},
    retrieval::{CollectionPair, DualIndexer, RetrievalCoordinator},
    storage::{Collection, MetadataFilter, sqlite_store::VectorDatabase},
};
use std::sync::Arc;
use tempfile::tempdir;

/// Counts occurrences of a fixed vocabulary. Texts without any of the words
/// embed to the zero vector, which is dissimilar to everything.
struct KeywordEmbedder;

const VOCABULARY: &[&str] = &["orden", "waldtempler", "schwur", "alchemie", "trank", "kessel"];

impl KeywordEmbedder {
    fn embed_one(text: &str) -> Vec<half::f16> {
        let lowered = text.to_lowercase();
        let counts: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| {
                lowered
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|token| token == word)
                    .count() as f32
            })
            .collect();
        to_f16(&counts, true)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> gaia_embed::Result<EmbeddingResult> {
        Ok(EmbeddingResult::new(
            texts.iter().map(|t| Self::embed_one(t)).collect(),
        ))
    }

    fn embedding_dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn provider_name(&self) -> &str {
        "keyword"
    }
}

fn lore_document() -> Document {
    Document::new(
        "doc1",
        "Der Orden der Waldtempler wurde im Norden gegruendet. \
         Jeder Waldtempler leistet den Schwur auf den Orden. \
         Der Schwur bindet den Waldtempler an den Orden bis zum Tod.",
    )
    .with_categories(["lore"])
}

fn character_document() -> Document {
    Document::new(
        "doc2",
        "Meister Albrecht lebt am Rand der Stadt. Seine Alchemie ist beruehmt. \
         In seinem Kessel braut er jeden Trank, den man sich wuenschen kann. \
         Der Trank gegen das Fieber ist sein bekanntester.",
    )
    .with_categories(["character"])
}

fn small_config() -> RetrievalConfig {
    RetrievalConfig::default().with_chunk_sizes(60, 200)
}

async fn indexed_pair(config: &RetrievalConfig) -> CollectionPair {
    let collections = CollectionPair::in_memory(config, Arc::new(KeywordEmbedder));
    let report = DualIndexer::new(&collections, config)
        .store_documents(&[lore_document(), character_document()])
        .await;
    assert!(report.is_complete());
    collections
}

/// A lore question recalls only the lore document, and re-ranking never looks at the other one
#[tokio::test]
async fn test_recall_limits_rerank_to_relevant_document() -> Result<()> {
    let config = small_config();
    let collections = indexed_pair(&config).await;
    let coordinator = RetrievalCoordinator::new(&collections, config);

    let recall = coordinator.recall("Wer gehoert zum Orden der Waldtempler?").await?;
    assert_eq!(recall.candidates, vec!["doc1".to_string()]);
    assert!(recall.kept.iter().all(|r| r.similarity > 0.4));
    assert!(recall.discarded.iter().all(|r| r.similarity <= 0.4));
    assert!(recall.discarded.iter().any(|r| r.document_id == "doc2"));

    let passages = coordinator
        .query("Wer gehoert zum Orden der Waldtempler?", 5)
        .await?;
    assert!(!passages.is_empty());
    assert!(passages.len() <= 5);
    assert!(passages.iter().all(|p| p.document_id == "doc1"));
    assert!(passages.iter().all(|p| p.categories.contains("lore")));
    assert!(
        passages
            .windows(2)
            .all(|pair| pair[0].similarity >= pair[1].similarity)
    );

    Ok(())
}

/// A question matching nothing yields no passages at all
#[tokio::test]
async fn test_unrelated_question_returns_nothing() -> Result<()> {
    let config = small_config();
    let collections = indexed_pair(&config).await;
    let coordinator = RetrievalCoordinator::new(&collections, config);

    let recall = coordinator.recall("Wie hoch ist der Berg?").await?;
    assert!(recall.candidates.is_empty());
    assert!(recall.kept.is_empty());

    let passages = coordinator.query("Wie hoch ist der Berg?", 5).await?;
    assert!(passages.is_empty());

    Ok(())
}

/// Both collections hold chunks of both documents at their own granularity
#[tokio::test]
async fn test_both_granularities_are_indexed() -> Result<()> {
    let config = small_config();
    let collections = indexed_pair(&config).await;

    let fine = collections.fine.count().await?;
    let coarse = collections.coarse.count().await?;
    assert!(fine > coarse, "fine {fine} should exceed coarse {coarse}");

    let doc2_coarse = collections
        .coarse
        .query("Trank", 10, &MetadataFilter::for_document("doc2"))
        .await?;
    assert!(!doc2_coarse.is_empty());
    assert!(doc2_coarse.iter().all(|r| r.chunk_id.starts_with("doc2_")));
    assert!(doc2_coarse.iter().all(|r| r.content.chars().count() <= 200));

    Ok(())
}

/// Indexing into SQLite survives reopening the database
#[tokio::test]
async fn test_sqlite_index_is_persistent() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = small_config();

    {
        let db = VectorDatabase::open(temp_dir.path()).await?;
        let collections = CollectionPair::open(&db, &config, Arc::new(KeywordEmbedder)).await?;
        let report = DualIndexer::new(&collections, &config)
            .store_documents(&[lore_document(), character_document()])
            .await;
        assert!(report.is_complete());
        assert_eq!(report.documents, 2);
    }

    let db = VectorDatabase::open(temp_dir.path()).await?;
    let collections = CollectionPair::open(&db, &config, Arc::new(KeywordEmbedder)).await?;
    let passages = RetrievalCoordinator::new(&collections, config)
        .query("Welchen Trank braut der Meister mit Alchemie?", 3)
        .await?;

    assert!(!passages.is_empty());
    assert!(passages.iter().all(|p| p.document_id == "doc2"));
    assert!(passages.iter().all(|p| p.categories.contains("character")));

    let infos = db.list_collections().await?;
    let names: Vec<_> = infos.iter().map(|i| i.name.as_str()).collect();
    assert!(names.contains(&"small-chunks"));
    assert!(names.contains(&"big-chunks"));
    assert!(infos.iter().all(|i| i.document_count == 2));

    Ok(())
}

/// From files on disk to ranked passages, with categories from CONTEXT.yml
#[tokio::test]
async fn test_folder_to_passages() -> Result<()> {
    let temp_dir = tempdir()?;
    let lore_dir = temp_dir.path().join("lore");
    let people_dir = temp_dir.path().join("personen");
    std::fs::create_dir_all(&lore_dir)?;
    std::fs::create_dir_all(&people_dir)?;

    std::fs::write(lore_dir.join("orden.txt"), lore_document().text)?;
    std::fs::write(
        lore_dir.join(CONTEXT_FILE),
        "categories:\n  - lore\n  - geschichte\n",
    )?;
    std::fs::write(people_dir.join("albrecht.md"), character_document().text)?;
    std::fs::write(
        people_dir.join(CONTEXT_FILE),
        "categories: [character]\noverwrites:\n  albrecht.md:\n    categories: [character, alchemie]\n",
    )?;
    std::fs::write(people_dir.join("bild.png"), [0u8, 1, 2])?;

    let documents = parse_documents(temp_dir.path()).await?;
    assert_eq!(documents.len(), 2);

    let config = small_config();
    let collections = CollectionPair::in_memory(&config, Arc::new(KeywordEmbedder));
    DualIndexer::new(&collections, &config)
        .store_documents(&documents)
        .await;

    let passages = RetrievalCoordinator::new(&collections, config)
        .query("Der Schwur der Waldtempler", 5)
        .await?;

    assert!(!passages.is_empty());
    for passage in &passages {
        assert!(passage.document_id.ends_with("orden.txt"));
        assert!(passage.categories.contains("lore"));
        assert!(passage.categories.contains("geschichte"));
    }

    let alchemy = collections
        .fine
        .query(
            "Alchemie",
            10,
            &MetadataFilter::none().with_category("alchemie"),
        )
        .await?;
    assert!(!alchemy.is_empty());
    assert!(alchemy.iter().all(|r| r.document_id.ends_with("albrecht.md")));

    Ok(())
}
