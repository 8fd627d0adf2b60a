use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

/// Bookkeeping record for a file that has been successfully indexed.
///
/// The fingerprint always reflects the last content that made it into the
/// vector store in full; it is never advanced on a partial or failed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFile {
    /// Full path to the source file
    pub path: PathBuf,
    /// Blake3 fingerprint of the indexed content
    pub fingerprint: String,
    /// When the file last completed indexing
    pub last_indexed_at: SystemTime,
    /// Number of chunks stored for this file
    pub chunk_count: usize,
}

/// What happened to a path, as seen by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Created,
    Modified,
    Removed,
}

/// A unit of reconciliation work emitted by the debouncer.
#[derive(Debug, Clone)]
pub struct IndexTask {
    pub path: PathBuf,
    pub kind: TaskKind,
    pub enqueued_at: Instant,
}

impl IndexTask {
    pub fn new(path: PathBuf, kind: TaskKind) -> Self {
        Self {
            path,
            kind,
            enqueued_at: Instant::now(),
        }
    }
}

/// A bounded segment of a document's extracted text, the unit of embedding.
/// Derived data; recomputed on every reindex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub source_path: PathBuf,
    pub index: usize,
    pub total: usize,
}

/// Metadata attached to every vector record, queryable by exact match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub source_path: String,
    pub filename: String,
    pub fingerprint: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Seconds since the UNIX epoch at indexing time
    pub indexed_at: u64,
}

/// One entry written to the vector store.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A ranked hit returned from a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

/// Snapshot of pipeline health exposed through the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub indexed_files: usize,
    pub pending_tasks: usize,
    pub failed_files: Vec<FailedFile>,
    pub watcher_alive: bool,
}

/// A path that could not be indexed, with the reason it failed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Totals from a full reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub indexed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: usize,
}
