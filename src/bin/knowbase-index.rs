use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use knowbase::cache::EmbeddingCache;
use knowbase::config::Config;
use knowbase::embeddings::{EmbeddingGenerator, EmbeddingProvider, OllamaEmbeddingProvider};
use knowbase::extractor::ExtractorRegistry;
use knowbase::reconciler::Reconciler;
use knowbase::retry::RetryPolicy;
use knowbase::store::ChromaStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "knowbase-index")]
#[command(about = "Run a full reconciliation of the watched directory against the vector store")]
#[command(version)]
struct Cli {
    /// Directory to index (overrides config)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Chroma URL (overrides config)
    #[arg(long)]
    chroma_url: Option<String>,

    /// Chroma collection name (overrides config)
    #[arg(long)]
    collection: Option<String>,

    /// Drop the collection and reindex everything from scratch
    #[arg(long)]
    reset: bool,

    /// Only reattempt paths that previously failed
    #[arg(long)]
    retry_failed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    let root = cli.dir.unwrap_or_else(|| config.watch.root.clone());
    let chroma_url = cli.chroma_url.unwrap_or_else(|| config.chroma.url.clone());
    let collection = cli
        .collection
        .unwrap_or_else(|| config.chroma.collection.clone());

    println!("Indexing directory: {}", root.display());

    let store = Arc::new(
        ChromaStore::connect(&chroma_url, &collection)
            .await
            .context("Failed to connect to Chroma")?,
    );

    let provider = Arc::new(OllamaEmbeddingProvider::new(
        &config.embedding.url,
        &config.embedding.model,
        config.embedding.dims,
    ));
    if !provider.probe().await {
        eprintln!(
            "Warning: embedding provider at {} is not reachable; indexing will likely fail",
            config.embedding.url
        );
    }
    println!(
        "Using embedding model: {} ({} dimensions)",
        config.embedding.model,
        provider.dimension()
    );

    let generator = Arc::new(EmbeddingGenerator::new(
        provider,
        Arc::new(EmbeddingCache::new()),
        config.embedding.workers,
        RetryPolicy::from_secs(
            &config.embedding.timeouts_secs,
            config.embedding.retry_pause_ms,
        ),
    ));

    let reconciler = Reconciler::new(
        root,
        config.watch.extensions.clone(),
        store,
        Arc::new(ExtractorRegistry::with_defaults()),
        generator,
        config.chunking.size,
        config.chunking.overlap,
        config.watch.scan_workers,
    );

    if cli.reset {
        println!("Resetting collection '{}'...", collection);
        reconciler.clear().await.context("Failed to reset index")?;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(if cli.retry_failed {
        "Retrying failed files..."
    } else {
        "Reconciling files..."
    });

    let summary = if cli.retry_failed {
        reconciler.retry_failed().await
    } else {
        reconciler.reconcile_all().await
    };

    pb.finish_and_clear();

    println!("\n✓ Reconciliation complete");
    println!("  indexed:   {}", summary.indexed);
    println!("  unchanged: {}", summary.unchanged);
    println!("  removed:   {}", summary.removed);
    println!("  failed:    {}", summary.failed);

    let status = reconciler.status();
    if !status.failed_files.is_empty() {
        println!("\nFailed files:");
        for failure in &status.failed_files {
            println!("  {} — {}", failure.path.display(), failure.reason);
        }
        println!("\nRe-run with --retry-failed to attempt these again.");
    }

    Ok(())
}
