//! Fathom CLI binary.
//!
//! Builds both indexes from a JSON fragment file and answers queries
//! against them, standing in for an external ingestion pipeline and
//! serving layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use fathom::config::RetrievalConfig;
use fathom::embedding::{HashingTextEmbedder, TextEmbedder};
use fathom::metadata::InMemoryTitleProvider;
use fathom::retrieval::{RetrievalEngine, SearchMode};
use fathom::storage::{self, FileStorage, Storage};
use fathom::types::Fid;
use fathom::vector::Vector;

/// Storage name for the CLI's fid -> title mapping.
const TITLES_SNAPSHOT: &str = "titles.bin";

#[derive(Debug, Parser)]
#[command(name = "fathom", version, about = "Hybrid retrieval engine CLI")]
struct FathomArgs {
    /// Directory holding index snapshots.
    #[arg(long, env = "FATHOM_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Embedding dimension.
    #[arg(long, default_value_t = 384)]
    dimension: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build both indexes from a JSON fragment file and persist them.
    Index {
        /// Path to a JSON array of fragments: [{"text": ..., "title": ...}].
        fragments: PathBuf,
    },
    /// Run a query against persisted indexes.
    Query {
        /// The query text.
        query: String,

        /// Number of results to return.
        #[arg(long, default_value_t = 5)]
        top_k: usize,

        /// Search mode: vector, lexical (or bm25), hybrid. Unrecognized
        /// values fall back to hybrid.
        #[arg(long, default_value = "hybrid")]
        mode: String,
    },
}

/// One ingestable fragment.
#[derive(Debug, Serialize, Deserialize)]
struct Fragment {
    text: String,
    title: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = FathomArgs::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(args: FathomArgs) -> anyhow::Result<()> {
    let storage = Arc::new(FileStorage::new(&args.data_dir)?);
    let embedder = Arc::new(HashingTextEmbedder::new(args.dimension));
    let config = RetrievalConfig {
        dimension: args.dimension,
        ..Default::default()
    };

    match args.command {
        Command::Index { fragments } => index(&fragments, config, embedder, storage),
        Command::Query { query, top_k, mode } => {
            run_query(&query, top_k, &mode, config, embedder, storage)
        }
    }
}

fn index(
    path: &PathBuf,
    config: RetrievalConfig,
    embedder: Arc<HashingTextEmbedder>,
    storage: Arc<FileStorage>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading fragment file {}", path.display()))?;
    let fragments: Vec<Fragment> = serde_json::from_str(&raw).context("parsing fragment file")?;
    anyhow::ensure!(!fragments.is_empty(), "fragment file is empty");

    let engine = RetrievalEngine::new(
        config,
        embedder.clone() as Arc<dyn TextEmbedder>,
        Arc::new(InMemoryTitleProvider::new()),
        storage.clone() as Arc<dyn Storage>,
    )?;

    let vectors: Vec<Vector> = fragments
        .iter()
        .map(|f| embedder.embed(&f.text))
        .collect::<fathom::error::Result<_>>()?;
    let fids = engine.add_vectors(vectors)?;

    let corpus: Vec<(Fid, String)> = fids
        .iter()
        .zip(fragments.iter())
        .map(|(fid, f)| (*fid, f.text.clone()))
        .collect();
    engine.rebuild_lexical(&corpus);
    engine.persist_all()?;

    let titles: HashMap<Fid, String> = fids
        .iter()
        .zip(fragments.iter())
        .map(|(fid, f)| (*fid, f.title.clone()))
        .collect();
    storage::write_snapshot(storage.as_ref(), TITLES_SNAPSHOT, &titles)?;

    println!("indexed {} fragments", fragments.len());
    Ok(())
}

fn run_query(
    query: &str,
    top_k: usize,
    mode: &str,
    config: RetrievalConfig,
    embedder: Arc<HashingTextEmbedder>,
    storage: Arc<FileStorage>,
) -> anyhow::Result<()> {
    let titles: HashMap<Fid, String> =
        storage::read_snapshot(storage.as_ref(), TITLES_SNAPSHOT)?.unwrap_or_default();
    let titles = Arc::new(InMemoryTitleProvider::from_pairs(titles));

    let engine = RetrievalEngine::open(
        config,
        embedder as Arc<dyn TextEmbedder>,
        titles,
        storage as Arc<dyn Storage>,
    )?;

    let response = engine.retrieve(query, top_k, SearchMode::parse_lossy(mode))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
