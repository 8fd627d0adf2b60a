/// Constants used throughout the knowbase pipeline
/// This module centralizes all constant values for better maintainability

/// File extensions the indexing pipeline knows how to extract text from
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

/// Filename prefixes that mark editor/temp artifacts which must never be indexed
pub const TEMP_FILE_PREFIXES: &[&str] = &["~", "#", ".#"];

/// Extensions used by in-progress writes and editor swap files
pub const TEMP_FILE_EXTENSIONS: &[&str] = &["tmp", "swp", "swx", "part", "crdownload"];

/// Block size for streaming file hashing
pub const HASH_BLOCK_SIZE: usize = 8192;

/// Hex characters of a fingerprint carried into vector record ids
pub const SHORT_FINGERPRINT_LEN: usize = 12;

/// Default chunk window in characters
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A sentence/line boundary is only taken as a chunk end if it lies at least
/// this many characters past the window start
pub const MIN_BOUNDARY_OFFSET: usize = 200;

/// How long a newly created file must sit untouched before it is processed
pub const SETTLE_WAIT_MS: u64 = 500;

/// Interval between the two size samples taken during settle probing
pub const SIZE_PROBE_INTERVAL_MS: u64 = 200;

/// Upper bound on extra settle waits for a file that keeps growing
pub const MAX_SETTLE_PROBES: usize = 5;

/// Minimum interval between two index tasks for the same modified path
pub const RETRIGGER_INTERVAL_MS: u64 = 2000;

/// Default number of concurrent in-flight embedding calls
pub const DEFAULT_EMBED_WORKERS: usize = 4;

/// Default per-attempt embedding timeouts in seconds, one entry per attempt
pub const DEFAULT_EMBED_TIMEOUTS_SECS: &[u64] = &[30, 45, 60];

/// Pause between embedding retry attempts
pub const DEFAULT_RETRY_PAUSE_MS: u64 = 500;

/// Default number of files reconciled concurrently during a full scan
pub const DEFAULT_SCAN_WORKERS: usize = 3;

/// Bound on the content-addressed embedding cache
pub const EMBEDDING_CACHE_CAPACITY: usize = 16_384;

/// Default response cache capacity (entries)
pub const DEFAULT_RESPONSE_CACHE_CAPACITY: usize = 256;

/// Default response cache TTL in seconds
pub const DEFAULT_RESPONSE_CACHE_TTL_SECS: u64 = 3600;

/// Per-segment character budget when building answer context
pub const CONTEXT_SEGMENT_BUDGET: usize = 1500;

/// Total character budget for answer context
pub const CONTEXT_TOTAL_BUDGET: usize = 6000;

/// Default number of nearest chunks retrieved for a question
pub const DEFAULT_TOP_K: usize = 5;

/// Fixed reply when the answer path cannot produce a grounded answer
pub const CANNOT_ANSWER: &str =
    "I cannot answer that from the indexed documents right now. Try rephrasing the question or indexing more material.";
