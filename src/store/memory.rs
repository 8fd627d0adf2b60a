use crate::error::StoreError;
use crate::models::{VectorMatch, VectorRecord};
use crate::store::VectorStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory vector store used by tests and local experimentation. Keeps a
/// cosine-distance query path so the answer pipeline behaves like the real
/// store.
pub struct MemoryStore {
    records: Mutex<HashMap<String, VectorRecord>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of upsert batches applied; lets tests assert idempotence.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("memory store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        let mut map = self.records.lock().expect("memory store poisoned");
        self.writes.fetch_add(1, Ordering::SeqCst);
        for record in records {
            map.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorMatch>, StoreError> {
        let map = self.records.lock().expect("memory store poisoned");
        let mut matches: Vec<VectorMatch> = map
            .values()
            .map(|r| VectorMatch {
                id: r.id.clone(),
                text: r.text.clone(),
                metadata: r.metadata.clone(),
                distance: Self::cosine_distance(embedding, &r.embedding),
            })
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(k);
        Ok(matches)
    }

    async fn ids_for_source(&self, source_path: &str) -> Result<Vec<String>, StoreError> {
        let map = self.records.lock().expect("memory store poisoned");
        Ok(map
            .values()
            .filter(|r| r.metadata.source_path == source_path)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut map = self.records.lock().expect("memory store poisoned");
        for id in ids {
            map.remove(id);
        }
        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<String>, StoreError> {
        let map = self.records.lock().expect("memory store poisoned");
        let mut sources: Vec<String> = map
            .values()
            .map(|r| r.metadata.source_path.clone())
            .collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.records.lock().expect("memory store poisoned").clear();
        Ok(())
    }
}
