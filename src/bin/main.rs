//! findoc-rag CLI
//!
//! Bulk-ingests extracted documents and answers ad-hoc queries.
//!
//! Run with: cargo run --features cli -- ingest --data-dir ./processed_data

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use findoc_rag::config::RagConfig;
use findoc_rag::ingestion::IngestionPipeline;
use findoc_rag::providers::{
    EmbeddingProvider, LlmProvider, OpenAiChat, OpenAiEmbedder, PineconeIndex,
    VectorIndexProvider,
};
use findoc_rag::retrieval::QueryPipeline;
use findoc_rag::types::{document::Document, query::QueryRequest, response::IngestOutcome};

#[derive(Parser)]
#[command(name = "findoc-rag", about = "Financial document retrieval and Q&A")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest extracted JSON documents from a directory
    Ingest {
        /// Directory containing `{filename, text, tables}` JSON files
        #[arg(long)]
        data_dir: PathBuf,
    },
    /// Ask a question against the indexed documents
    Query {
        /// The question to answer
        question: String,
        /// Number of results to retrieve
        #[arg(long)]
        top_k: Option<usize>,
        /// Metadata equality filters as key=value pairs
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

/// The extraction step's output shape
#[derive(serde::Deserialize)]
struct ExtractedDocument {
    filename: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    tables: Vec<serde_json::Value>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "findoc_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RagConfig::from_file(path)?,
        None => RagConfig::default(),
    };

    let openai_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
    let pinecone_key = std::env::var("PINECONE_API_KEY")
        .map_err(|_| anyhow::anyhow!("PINECONE_API_KEY environment variable not set"))?;

    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(OpenAiEmbedder::new(&config.embeddings, openai_key.clone())?);
    let index: Arc<dyn VectorIndexProvider> = Arc::new(PineconeIndex::new(
        &config.index,
        pinecone_key,
        config.embeddings.dimensions,
    )?);

    tracing::info!(
        index = %config.index.name,
        model = %config.embeddings.model,
        dimensions = config.embeddings.dimensions,
        "initializing index"
    );
    index
        .ensure_index(config.embeddings.dimensions, config.index.metric)
        .await?;

    match cli.command {
        Command::Ingest { data_dir } => {
            let pipeline = IngestionPipeline::new(&config, embedder, index)?;
            ingest_directory(&pipeline, &data_dir).await?;
        }
        Command::Query {
            question,
            top_k,
            filters,
        } => {
            let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiChat::new(&config.llm, openai_key)?);
            let pipeline = QueryPipeline::new(&config, embedder, index, llm);

            let mut request =
                QueryRequest::new(question).with_top_k(top_k.unwrap_or(config.query.top_k));
            for (key, value) in filters {
                request = request.with_filter(key, value);
            }

            let response = pipeline.query(request).await?;

            println!("{}\n", response.answer);
            if !response.sources.is_empty() {
                println!("Sources:");
                for source in &response.sources {
                    let filename = source
                        .metadata
                        .get("filename")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown");
                    let preview: String = source.content().chars().take(200).collect();
                    println!("- {} (score {:.3}): {}", filename, source.score, preview);
                }
            }
        }
    }

    Ok(())
}

/// Ingest every extracted JSON document under `data_dir`
async fn ingest_directory(
    pipeline: &IngestionPipeline,
    data_dir: &PathBuf,
) -> anyhow::Result<()> {
    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut failed_chunks = 0usize;

    for entry in walkdir::WalkDir::new(data_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let document = match load_document(path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load document");
                skipped += 1;
                continue;
            }
        };

        let report = pipeline.ingest(&document).await?;
        if report.outcome == IngestOutcome::Indexed {
            processed += 1;
            failed_chunks += report.failed_chunks;
            tracing::info!(
                filename = %report.filename,
                indexed = report.indexed_chunks,
                failed = report.failed_chunks,
                "ingested"
            );
        }
    }

    println!(
        "Ingestion complete: {} documents processed, {} skipped, {} chunks failed",
        processed, skipped, failed_chunks
    );
    Ok(())
}

/// Load one extraction-output JSON file as a document
fn load_document(path: &std::path::Path) -> anyhow::Result<Document> {
    let content = std::fs::read_to_string(path)?;
    let extracted: ExtractedDocument = serde_json::from_str(&content)?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid file name"))?
        .to_string();
    Ok(Document::new(
        id,
        extracted.filename,
        extracted.text,
        extracted.tables,
    ))
}
