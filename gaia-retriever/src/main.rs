use clap::{Parser, Subcommand};
use gaia_embed::{EmbeddingProvider, HashEmbeddingProvider, OllamaEmbeddingProvider};
use gaia_retriever::{
    answer::{OllamaAnswerGenerator, answer_question},
    config::GaiaConfig,
    documents::parse_documents,
    retrieval::{CollectionPair, DualIndexer, RetrievalCoordinator},
    storage::{Collection, MetadataFilter, QueryResult, sqlite_store::VectorDatabase},
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Index a folder of documents and ask questions about it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./gaia.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the vector database, overriding the configuration
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Embedding backend: "ollama" or "hash" (offline, lower quality)
    #[arg(long, global = true, default_value = "ollama")]
    embedder: EmbedderKind,

    /// Log debug output, including recall decisions and the final prompt
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse documents under a path and store them in both collections
    Index {
        /// File or directory to index
        path: PathBuf,
        /// Drop all stored chunks before indexing
        #[arg(long)]
        rebuild: bool,
    },
    /// Answer a question from the indexed documents
    Ask {
        question: String,
        /// Maximum number of passages handed to the model
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
        /// Print the ranked passages instead of generating an answer
        #[arg(long)]
        no_answer: bool,
    },
    /// Query a single collection directly
    Search {
        query: String,
        /// Which collection to search: "fine" or "coarse"
        #[arg(short, long, default_value = "fine")]
        granularity: Granularity,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Only chunks of this document
        #[arg(long)]
        document: Option<String>,
        /// Only chunks carrying this category
        #[arg(long)]
        category: Option<String>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show chunk counts per collection
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EmbedderKind {
    Ollama,
    Hash,
}

impl std::str::FromStr for EmbedderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "hash" => Ok(EmbedderKind::Hash),
            _ => Err(format!("Invalid embedder: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Granularity {
    Fine,
    Coarse,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fine" | "small" => Ok(Granularity::Fine),
            "coarse" | "big" => Ok(Granularity::Coarse),
            _ => Err(format!("Invalid granularity: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let config = GaiaConfig::load(args.config.as_deref())?;
    let db_dir = args.db.clone().unwrap_or_else(|| config.database_dir.clone());

    let provider: Arc<dyn EmbeddingProvider> = match args.embedder {
        EmbedderKind::Ollama => Arc::new(OllamaEmbeddingProvider::new(config.embedding.clone())?),
        EmbedderKind::Hash => Arc::new(HashEmbeddingProvider::default()),
    };

    let db = VectorDatabase::open(&db_dir).await?;
    let collections = CollectionPair::open(&db, &config.retrieval, provider).await?;

    match args.command {
        Commands::Index { path, rebuild } => {
            let documents = parse_documents(&path).await?;

            if rebuild {
                collections.fine.clear().await?;
                collections.coarse.clear().await?;
            }

            let report = DualIndexer::new(&collections, &config.retrieval)
                .store_documents(&documents)
                .await;

            println!("Indexed {} documents into {}", report.documents, db_dir.display());
            println!(
                "  {}: {} chunks",
                collections.fine.name(),
                report.fine_chunks_stored
            );
            println!(
                "  {}: {} chunks",
                collections.coarse.name(),
                report.coarse_chunks_stored
            );

            if !report.is_complete() {
                println!("  Failed chunks: {}", report.failures.len());
                for failure in report.failures.iter().take(10) {
                    println!(
                        "    {} ({}): {}",
                        failure.chunk_id, failure.collection, failure.message
                    );
                }
                if report.failures.len() > 10 {
                    println!("    ... and {} more", report.failures.len() - 10);
                }
            }
            Ok(())
        }
        Commands::Ask {
            question,
            limit,
            no_answer,
        } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let coordinator = RetrievalCoordinator::new(&collections, config.retrieval.clone());
            let passages = coordinator
                .query_with_cancel(&question, limit, &cancel)
                .await?;

            if passages.is_empty() {
                println!("No relevant passages found.");
                return Ok(());
            }

            if no_answer {
                print_results(&passages, &OutputFormat::Summary)?;
                return Ok(());
            }

            let generator = OllamaAnswerGenerator::new(config.answer.clone())?;
            let answer =
                answer_question(&generator, &question, &passages, &config.answer.preamble).await?;

            println!("{answer}");
            if args.verbose {
                println!();
                println!("Sources:");
                for passage in &passages {
                    println!("  {} ({:.3})", passage.chunk_id, passage.similarity);
                }
            }
            Ok(())
        }
        Commands::Search {
            query,
            granularity,
            limit,
            document,
            category,
            format,
        } => {
            let collection = match granularity {
                Granularity::Fine => &collections.fine,
                Granularity::Coarse => &collections.coarse,
            };
            let filter = MetadataFilter {
                document_id: document,
                category,
            };

            let results = collection.query(&query, limit, &filter).await?;
            print_results(&results, &format)
        }
        Commands::Stats { format } => {
            let collections = db.list_collections().await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&collections)?);
                }
                OutputFormat::Summary => {
                    println!("Database Statistics ({}):", db_dir.display());
                    for info in collections {
                        println!(
                            "  {}: {} chunks from {} documents (created {})",
                            info.name,
                            info.chunk_count,
                            info.document_count,
                            info.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

fn print_results(results: &[QueryResult], format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Summary => {
            println!("Found {} chunks:", results.len());
            for result in results {
                let preview: String = result.content.chars().take(100).collect();
                println!(
                    "  Similarity: {:.3} | Chunk: {} | Document: {}",
                    result.similarity, result.chunk_id, result.document_id
                );
                println!("    {preview}");
            }
        }
    }
    Ok(())
}
