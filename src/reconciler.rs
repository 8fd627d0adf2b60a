use crate::chunker;
use crate::debounce;
use crate::embeddings::EmbeddingGenerator;
use crate::extractor::ExtractorRegistry;
use crate::models::{
    Chunk, ChunkMetadata, FailedFile, IndexTask, ScanSummary, StatusReport, TaskKind, VectorRecord,
    WatchedFile,
};
use crate::store::VectorStore;
use crate::utils;
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a reconciliation pass did for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Content was (re)indexed; counts surviving and failed chunks
    Indexed { chunks: usize, failed_chunks: usize },
    /// Fingerprint matched the stored one; nothing written
    Unchanged,
    /// Path no longer exists; its records were removed
    Removed,
    /// Processing failed; the path sits in the retryable failed set
    Failed(String),
}

/// Single authority over a file's representation in the vector store.
///
/// Holds the fingerprint map and the failed set, serializes work per path,
/// and guarantees that the stored fingerprint only ever advances after a
/// fully successful upsert. Reconciliation of distinct paths runs in
/// parallel; a full scan is bounded by a worker pool.
pub struct Reconciler {
    root: PathBuf,
    extensions: HashSet<String>,
    store: Arc<dyn VectorStore>,
    extractors: Arc<ExtractorRegistry>,
    generator: Arc<EmbeddingGenerator>,
    chunk_size: usize,
    chunk_overlap: usize,
    scan_workers: usize,
    watched: Mutex<HashMap<PathBuf, WatchedFile>>,
    failed: Mutex<HashMap<PathBuf, String>>,
    path_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
    pending: AtomicUsize,
    watcher_alive: AtomicBool,
}

impl Reconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: PathBuf,
        extensions: impl IntoIterator<Item = String>,
        store: Arc<dyn VectorStore>,
        extractors: Arc<ExtractorRegistry>,
        generator: Arc<EmbeddingGenerator>,
        chunk_size: usize,
        chunk_overlap: usize,
        scan_workers: usize,
    ) -> Self {
        Self {
            root,
            extensions: extensions.into_iter().map(|e| e.to_lowercase()).collect(),
            store,
            extractors,
            generator,
            chunk_size,
            chunk_overlap,
            scan_workers: scan_workers.max(1),
            watched: Mutex::new(HashMap::new()),
            failed: Mutex::new(HashMap::new()),
            path_locks: Mutex::new(HashMap::new()),
            pending: AtomicUsize::new(0),
            watcher_alive: AtomicBool::new(false),
        }
    }

    /// Process one task from the debouncer.
    pub async fn handle_task(&self, task: IndexTask) -> Outcome {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let outcome = match task.kind {
            TaskKind::Created | TaskKind::Modified => self.reconcile_path(&task.path).await,
            TaskKind::Removed => self.remove_path(&task.path).await,
        };
        self.pending.fetch_sub(1, Ordering::SeqCst);

        match &outcome {
            Outcome::Indexed {
                chunks,
                failed_chunks,
            } => info!(
                path = %task.path.display(),
                chunks = *chunks,
                failed_chunks = *failed_chunks,
                "indexed"
            ),
            Outcome::Unchanged => debug!(path = %task.path.display(), "content unchanged"),
            Outcome::Removed => info!(path = %task.path.display(), "removed from index"),
            Outcome::Failed(reason) => {
                warn!(path = %task.path.display(), reason = %reason, "indexing failed")
            }
        }
        outcome
    }

    /// Bring the vector store in line with a path's current on-disk content.
    /// Re-entrant, but never concurrently for the same path.
    pub async fn reconcile_path(&self, path: &Path) -> Outcome {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;

        if !path.exists() {
            return self.remove_locked(path).await;
        }

        let owned = path.to_path_buf();
        let fingerprint = match tokio::task::spawn_blocking(move || {
            utils::compute_file_hash(&owned)
        })
        .await
        {
            Ok(Ok(fingerprint)) => fingerprint,
            Ok(Err(e)) => return self.fail(path, format!("hashing failed: {e:#}")),
            Err(e) => return self.fail(path, format!("hashing task failed: {e}")),
        };

        let already_indexed = {
            let watched = self.watched.lock().expect("watched map poisoned");
            watched
                .get(path)
                .map(|w| w.fingerprint == fingerprint)
                .unwrap_or(false)
        };
        if already_indexed {
            return Outcome::Unchanged;
        }

        match self.index_file(path, &fingerprint).await {
            Ok((chunks, failed_chunks)) => {
                self.failed.lock().expect("failed map poisoned").remove(path);
                Outcome::Indexed {
                    chunks,
                    failed_chunks,
                }
            }
            Err(e) => self.fail(path, format!("{e:#}")),
        }
    }

    /// Extract, chunk, embed and upsert one file. The fingerprint record is
    /// only advanced after the store accepted the whole batch.
    async fn index_file(&self, path: &Path, fingerprint: &str) -> Result<(usize, usize)> {
        let text = self
            .extractors
            .extract(path)
            .await
            .context("text extraction failed")?;

        if text.trim().is_empty() {
            anyhow::bail!("no text extracted");
        }

        let texts = chunker::chunk_text(&text, self.chunk_size, self.chunk_overlap);
        if texts.is_empty() {
            anyhow::bail!("chunking produced no content");
        }

        let total = texts.len();
        let chunks: Vec<Chunk> = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                text,
                source_path: path.to_path_buf(),
                index,
                total,
            })
            .collect();

        let outcome = self.generator.embed_all(&chunks).await;
        if outcome.vectors.is_empty() {
            anyhow::bail!("all {total} chunks failed embedding");
        }
        if !outcome.failed.is_empty() {
            warn!(
                path = %path.display(),
                failed = outcome.failed.len(),
                total,
                "proceeding without embeddings for some chunks"
            );
        }

        // Old records must never coexist with the new version's chunks.
        let source = path.to_string_lossy().to_string();
        let old_ids = self
            .store
            .ids_for_source(&source)
            .await
            .context("looking up existing records failed")?;
        if !old_ids.is_empty() {
            self.store
                .delete(&old_ids)
                .await
                .context("deleting stale records failed")?;
        }

        let indexed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let stem = utils::file_stem(path);
        let short = utils::short_fingerprint(fingerprint);
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let records: Vec<VectorRecord> = outcome
            .vectors
            .iter()
            .map(|(index, embedding)| VectorRecord {
                id: format!("{}_{}_{}", stem, index, short),
                embedding: embedding.clone(),
                text: chunks[*index].text.clone(),
                metadata: ChunkMetadata {
                    source_path: source.clone(),
                    filename: filename.clone(),
                    fingerprint: fingerprint.to_string(),
                    chunk_index: *index,
                    total_chunks: total,
                    indexed_at,
                },
            })
            .collect();

        let stored = records.len();
        self.store
            .upsert(records)
            .await
            .context("vector store upsert failed")?;

        self.watched.lock().expect("watched map poisoned").insert(
            path.to_path_buf(),
            WatchedFile {
                path: path.to_path_buf(),
                fingerprint: fingerprint.to_string(),
                last_indexed_at: SystemTime::now(),
                chunk_count: stored,
            },
        );

        Ok((stored, outcome.failed.len()))
    }

    /// Drop every record for a path and forget its fingerprint.
    pub async fn remove_path(&self, path: &Path) -> Outcome {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;
        self.remove_locked(path).await
    }

    async fn remove_locked(&self, path: &Path) -> Outcome {
        let source = path.to_string_lossy().to_string();
        let ids = match self.store.ids_for_source(&source).await {
            Ok(ids) => ids,
            Err(e) => return self.fail(path, format!("lookup for removal failed: {e}")),
        };

        if !ids.is_empty() {
            if let Err(e) = self.store.delete(&ids).await {
                // Keep the fingerprint so the next pass retries the removal.
                return self.fail(path, format!("removal failed: {e}"));
            }
        }

        self.watched.lock().expect("watched map poisoned").remove(path);
        self.failed.lock().expect("failed map poisoned").remove(path);
        Outcome::Removed
    }

    /// Full reconciliation: enumerate supported files under the root, remove
    /// records for files that vanished, and reindex whatever changed, bounded
    /// by the scan worker pool. One file's failure never stops the others.
    pub async fn reconcile_all(&self) -> ScanSummary {
        let root = self.root.clone();
        let extensions = self.extensions.clone();
        let candidates = tokio::task::spawn_blocking(move || {
            let mut paths = Vec::new();
            for entry in WalkDir::new(&root).into_iter().flatten() {
                let path = entry.path();
                if path.is_file() && !debounce::is_ignored(path, &extensions) {
                    paths.push(path.to_path_buf());
                }
            }
            paths
        })
        .await
        .unwrap_or_default();

        info!(files = candidates.len(), root = %self.root.display(), "starting full reconciliation");

        let mut summary = ScanSummary::default();

        // Files we believe are indexed but which no longer exist on disk.
        let on_disk: HashSet<PathBuf> = candidates.iter().cloned().collect();
        let stale: Vec<PathBuf> = {
            let watched = self.watched.lock().expect("watched map poisoned");
            watched
                .keys()
                .filter(|p| !on_disk.contains(*p))
                .cloned()
                .collect()
        };
        for path in stale {
            match self.remove_path(&path).await {
                Outcome::Removed => summary.removed += 1,
                _ => summary.failed += 1,
            }
        }

        let outcomes: Vec<Outcome> = stream::iter(candidates)
            .map(|path| async move { self.reconcile_path(&path).await })
            .buffer_unordered(self.scan_workers)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Indexed { .. } => summary.indexed += 1,
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Removed => summary.removed += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }

        info!(?summary, "full reconciliation finished");
        summary
    }

    /// Reattempt only paths that previously failed.
    pub async fn retry_failed(&self) -> ScanSummary {
        let paths: Vec<PathBuf> = {
            let failed = self.failed.lock().expect("failed map poisoned");
            failed.keys().cloned().collect()
        };

        let mut summary = ScanSummary::default();
        let outcomes: Vec<Outcome> = stream::iter(paths)
            .map(|path| async move { self.reconcile_path(&path).await })
            .buffer_unordered(self.scan_workers)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Outcome::Indexed { .. } => summary.indexed += 1,
                Outcome::Unchanged => summary.unchanged += 1,
                Outcome::Removed => summary.removed += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Wipe the collection and all bookkeeping.
    pub async fn clear(&self) -> Result<()> {
        self.store
            .reset()
            .await
            .context("resetting vector store failed")?;
        self.watched.lock().expect("watched map poisoned").clear();
        self.failed.lock().expect("failed map poisoned").clear();
        Ok(())
    }

    /// Counts of indexed/pending/failed files plus watcher liveness.
    pub fn status(&self) -> StatusReport {
        let failed_files = {
            let failed = self.failed.lock().expect("failed map poisoned");
            let mut list: Vec<FailedFile> = failed
                .iter()
                .map(|(path, reason)| FailedFile {
                    path: path.clone(),
                    reason: reason.clone(),
                })
                .collect();
            list.sort_by(|a, b| a.path.cmp(&b.path));
            list
        };

        StatusReport {
            indexed_files: self.watched.lock().expect("watched map poisoned").len(),
            pending_tasks: self.pending.load(Ordering::SeqCst),
            failed_files,
            watcher_alive: self.watcher_alive.load(Ordering::SeqCst),
        }
    }

    pub fn set_watcher_alive(&self, alive: bool) {
        self.watcher_alive.store(alive, Ordering::SeqCst);
    }

    /// Fingerprint currently recorded for a path, if it is indexed.
    pub fn fingerprint_of(&self, path: &Path) -> Option<String> {
        self.watched
            .lock()
            .expect("watched map poisoned")
            .get(path)
            .map(|w| w.fingerprint.clone())
    }

    fn fail(&self, path: &Path, reason: String) -> Outcome {
        self.failed
            .lock()
            .expect("failed map poisoned")
            .insert(path.to_path_buf(), reason.clone());
        Outcome::Failed(reason)
    }

    fn path_lock(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.path_locks.lock().expect("path locks poisoned");
        Arc::clone(
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}
