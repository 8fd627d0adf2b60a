use crate::error::StoreError;
use crate::models::{VectorMatch, VectorRecord};

/// Trait over the external vector store.
///
/// The store is assumed durable, queryable by exact metadata match, and safe
/// for concurrent use; the reconciler is the only writer in this crate.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a batch of records in one operation
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError>;

    /// Nearest-neighbor search by cosine distance
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorMatch>, StoreError>;

    /// Ids of every record whose metadata source_path matches exactly
    async fn ids_for_source(&self, source_path: &str) -> Result<Vec<String>, StoreError>;

    /// Delete records by id
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    /// Distinct source paths currently present in the store
    async fn list_sources(&self) -> Result<Vec<String>, StoreError>;

    /// Drop and recreate the backing collection
    async fn reset(&self) -> Result<(), StoreError>;
}
