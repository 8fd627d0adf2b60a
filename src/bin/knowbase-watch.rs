use anyhow::{Context, Result};
use clap::Parser;
use knowbase::cache::EmbeddingCache;
use knowbase::config::Config;
use knowbase::debounce::Debouncer;
use knowbase::embeddings::{EmbeddingGenerator, OllamaEmbeddingProvider};
use knowbase::extractor::ExtractorRegistry;
use knowbase::reconciler::Reconciler;
use knowbase::retry::RetryPolicy;
use knowbase::store::ChromaStore;
use knowbase::watcher::FileWatcher;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "knowbase-watch")]
#[command(about = "Watch a directory and keep the vector index synchronized with it")]
#[command(version)]
struct Cli {
    /// Directory to watch (overrides config)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Chroma URL (overrides config)
    #[arg(long)]
    chroma_url: Option<String>,

    /// Chroma collection name (overrides config)
    #[arg(long)]
    collection: Option<String>,

    /// Skip the initial full reconciliation pass
    #[arg(long)]
    no_initial_scan: bool,

    /// Print a status report every N seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    status_interval: u64,
}

/// Seconds between watcher liveness checks
const LIVENESS_INTERVAL_SECS: u64 = 30;

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

    println!("Watching directory: {}", root.display());

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
            "Warning: embedding provider at {} is not reachable",
            config.embedding.url
        );
    }

    let generator = Arc::new(EmbeddingGenerator::new(
        provider,
        Arc::new(EmbeddingCache::new()),
        config.embedding.workers,
        RetryPolicy::from_secs(
            &config.embedding.timeouts_secs,
            config.embedding.retry_pause_ms,
        ),
    ));

    let reconciler = Arc::new(Reconciler::new(
        root.clone(),
        config.watch.extensions.clone(),
        store,
        Arc::new(ExtractorRegistry::with_defaults()),
        generator,
        config.chunking.size,
        config.chunking.overlap,
        config.watch.scan_workers,
    ));

    if !cli.no_initial_scan {
        println!("Running initial reconciliation...");
        let summary = reconciler.reconcile_all().await;
        println!(
            "  indexed: {}, unchanged: {}, removed: {}, failed: {}",
            summary.indexed, summary.unchanged, summary.removed, summary.failed
        );
    }

    // Watcher → debouncer → reconciler, each decoupled by a channel.
    let (event_tx, event_rx) = mpsc::channel(1024);
    let (task_tx, mut task_rx) = mpsc::channel(1024);

    let watcher = Arc::new(FileWatcher::new(&root, event_tx)?);
    watcher.start().context("Failed to start filesystem watcher")?;
    reconciler.set_watcher_alive(true);

    let debouncer = Arc::new(Debouncer::new(config.watch.extensions.clone(), task_tx));
    tokio::spawn(Arc::clone(&debouncer).run(event_rx));

    // Dispatch loop: tasks for distinct paths run in parallel; the
    // reconciler serializes per path internally.
    {
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move {
            while let Some(task) = task_rx.recv().await {
                let reconciler = Arc::clone(&reconciler);
                tokio::spawn(async move {
                    reconciler.handle_task(task).await;
                });
            }
        });
    }

    // Liveness loop: restart a dead watcher; if the restart fails the daemon
    // degrades to manual reconciliation and says so in the status report.
    {
        let watcher = Arc::clone(&watcher);
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(LIVENESS_INTERVAL_SECS));
            interval.tick().await;
            loop {
                interval.tick().await;
                if watcher.is_alive() {
                    continue;
                }
                warn!("watcher is down, attempting restart");
                match watcher.restart() {
                    Ok(()) => {
                        info!("watcher restarted");
                        reconciler.set_watcher_alive(true);
                    }
                    Err(e) => {
                        error!(error = %e, "watcher restart failed; only explicit reconciliation will pick up changes");
                        reconciler.set_watcher_alive(false);
                    }
                }
            }
        });
    }

    if cli.status_interval > 0 {
        let reconciler = Arc::clone(&reconciler);
        let every = Duration::from_secs(cli.status_interval);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let status = reconciler.status();
                println!(
                    "status: indexed={} pending={} failed={} watcher_alive={}",
                    status.indexed_files,
                    status.pending_tasks,
                    status.failed_files.len(),
                    status.watcher_alive
                );
            }
        });
    }

    println!("Watcher running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    println!("Shutting down.");

    Ok(())
}
