use anyhow::{Context, Result};
use clap::Parser;
use knowbase::answerer::Answerer;
use knowbase::cache::{EmbeddingCache, ResponseCache};
use knowbase::config::Config;
use knowbase::embeddings::{EmbeddingGenerator, OllamaEmbeddingProvider};
use knowbase::llm::OllamaChatProvider;
use knowbase::retry::RetryPolicy;
use knowbase::store::ChromaStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "knowbase-ask")]
#[command(about = "Ask a question against the indexed documents")]
#[command(version)]
struct Cli {
    /// The question to answer
    #[arg(value_name = "QUESTION")]
    question: String,

    /// Chroma URL (overrides config)
    #[arg(long)]
    chroma_url: Option<String>,

    /// Chroma collection name (overrides config)
    #[arg(long)]
    collection: Option<String>,

    /// Number of nearest chunks to build the context from (overrides config)
    #[arg(long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    let chroma_url = cli.chroma_url.unwrap_or_else(|| config.chroma.url.clone());
    let collection = cli
        .collection
        .unwrap_or_else(|| config.chroma.collection.clone());
    let top_k = cli.top_k.unwrap_or(config.chat.top_k);

    let store = Arc::new(
        ChromaStore::connect(&chroma_url, &collection)
            .await
            .context("Failed to connect to Chroma")?,
    );

    let generator = Arc::new(EmbeddingGenerator::new(
        Arc::new(OllamaEmbeddingProvider::new(
            &config.embedding.url,
            &config.embedding.model,
            config.embedding.dims,
        )),
        Arc::new(EmbeddingCache::new()),
        config.embedding.workers,
        RetryPolicy::from_secs(
            &config.embedding.timeouts_secs,
            config.embedding.retry_pause_ms,
        ),
    ));

    let chat = Arc::new(OllamaChatProvider::new(
        &config.chat.url,
        &config.chat.model,
        config.chat.temperature,
        config.chat.max_tokens,
        Duration::from_secs(config.chat.timeout_secs),
    ));

    let cache = Arc::new(ResponseCache::new(
        config.response_cache.capacity,
        Duration::from_secs(config.response_cache.ttl_secs),
    ));

    let answerer = Answerer::new(store, generator, chat, cache, top_k);
    let answer = answerer.answer(&cli.question).await;

    println!("{}", answer);
    Ok(())
}
