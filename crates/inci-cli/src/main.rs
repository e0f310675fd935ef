//! inci - Command-line interface for the ingredient knowledge base.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use inci_chunk::ChunkBuilder;
use inci_core::{EngineConfig, SourceRecord};
use inci_embed::{Embedder, TrigramEmbedder};
use inci_query::SearchEngine;
use inci_store::{RecordStore, SqliteStore, VectorStore};

/// Hybrid retrieval over a cosmetic-ingredient knowledge base
#[derive(Parser)]
#[command(name = "inci")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database path (default: platform data dir)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Ingest ingredient records from a JSON file and index their chunks
    Ingest {
        /// Path to a JSON array of records
        path: PathBuf,
    },

    /// Search the knowledge base
    Search {
        /// Search query (codes, names or free text)
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum final score
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Restrict to a category
        #[arg(long)]
        category: Option<String>,

        /// Disable the second-pass reranker
        #[arg(long)]
        no_rerank: bool,

        /// Disable the exact-match short-circuit
        #[arg(long)]
        no_short_circuit: bool,

        /// Requesting user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Show the chunks a record produces
    Chunks {
        /// Record code
        code: String,
    },

    /// Show statistics
    Stats,
}

/// Ingest-file record shape: a source record minus generated fields.
#[derive(Debug, Deserialize)]
struct RecordInput {
    code: String,
    trade_name: Option<String>,
    inci_name: Option<String>,
    supplier: Option<String>,
    company: Option<String>,
    cost: Option<f64>,
    benefits: Option<String>,
    details: Option<String>,
    category: Option<String>,
    function: Option<String>,
    source: Option<String>,
    #[serde(default)]
    extra: std::collections::HashMap<String, serde_json::Value>,
}

impl RecordInput {
    fn into_record(self) -> SourceRecord {
        let mut record = SourceRecord::new(&self.code);
        record.trade_name = self.trade_name;
        record.inci_name = self.inci_name;
        record.supplier = self.supplier;
        record.company = self.company;
        record.cost = self.cost;
        record.benefits = self.benefits;
        record.details = self.details;
        record.category = self.category;
        record.function = self.function;
        record.source = self.source;
        record.extra = self.extra;
        record
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::load_default()?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(database) = cli.database {
        config.database.path = database;
    }

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::open(&config.database.path)?;
            drop(store);
            println!("Initialized database at {:?}", config.database.path);
        }
        Commands::Ingest { path } => {
            ingest(&config, &path).await?;
        }
        Commands::Search {
            query,
            top_k,
            threshold,
            category,
            no_rerank,
            no_short_circuit,
            user,
        } => {
            search(
                &config,
                &query,
                top_k,
                threshold,
                category,
                no_rerank,
                no_short_circuit,
                user,
            )
            .await?;
        }
        Commands::Chunks { code } => {
            chunks(&config, &code).await?;
        }
        Commands::Stats => {
            stats(&config).await?;
        }
    }

    Ok(())
}

async fn ingest(
    config: &EngineConfig,
    path: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let inputs: Vec<RecordInput> = serde_json::from_str(&content)?;

    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    let embedder = TrigramEmbedder::with_dimension(config.embedding.dimension);
    let builder = ChunkBuilder::new(config.chunking.clone())?;

    let mut record_count = 0usize;
    let mut chunk_count = 0usize;

    for input in inputs {
        let record = input.into_record();
        store.upsert_record(record.clone()).await?;

        let chunks = builder.chunk_record(&record)?;
        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            embeddings.push(embedder.embed(&chunk.text).await?);
        }
        store.upsert(&chunks, &embeddings).await?;

        record_count += 1;
        chunk_count += chunks.len();
    }

    println!(
        "Ingested {} records ({} chunks indexed)",
        record_count, chunk_count
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn search(
    config: &EngineConfig,
    query: &str,
    top_k: Option<usize>,
    threshold: Option<f32>,
    category: Option<String>,
    no_rerank: bool,
    no_short_circuit: bool,
    user: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SqliteStore::open(&config.database.path)?);
    let embedder = Arc::new(TrigramEmbedder::with_dimension(config.embedding.dimension));
    let engine = SearchEngine::new(
        store.clone(),
        store,
        embedder,
        config.search.clone(),
    )?;

    let mut options = engine.default_options();
    if let Some(top_k) = top_k {
        options.top_k = top_k;
    }
    if let Some(threshold) = threshold {
        options.score_threshold = threshold;
    }
    options.category = category;
    if no_rerank {
        options.rerank = false;
    }
    if no_short_circuit {
        options.exact_short_circuit = false;
    }
    options.user_id = user;

    match engine.search_and_format(query, &options).await {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("{} ({})", e, e.error_code());
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn chunks(config: &EngineConfig, code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&config.database.path)?;
    let builder = ChunkBuilder::new(config.chunking.clone())?;

    let record = match store.get_record(code).await? {
        Some(record) => record,
        None => {
            eprintln!("Record not found: {}", code);
            std::process::exit(1);
        }
    };

    let chunks = builder.chunk_record(&record)?;
    println!("{} chunks for {}:", chunks.len(), record.code);
    for chunk in chunks {
        let split = match chunk.split_index {
            Some(i) => format!(" (split {})", i),
            None => String::new(),
        };
        println!(
            "- {}{} priority {:.2}, {} chars",
            chunk.chunk_type, split, chunk.priority, chunk.char_count
        );
        for line in chunk.text.lines().take(2) {
            println!("    {}", line);
        }
    }

    Ok(())
}

async fn stats(config: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open(&config.database.path)?;
    let records = store.count_records().await?;
    let chunks = store.count_chunks().await?;

    println!("Records: {}", records);
    println!("Indexed chunks: {}", chunks);
    println!("Database: {:?}", config.database.path);

    Ok(())
}
