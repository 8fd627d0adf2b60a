use crate::error::StoreError;
use crate::models::{ChunkMetadata, VectorMatch, VectorRecord};
use crate::store::VectorStore;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

/// Vector store client speaking the Chroma REST API.
///
/// The collection is created with cosine distance on connect (get-or-create,
/// so reconnecting to an existing index is cheap). All batch operations go
/// through the collection-id endpoints.
pub struct ChromaStore {
    base_url: String,
    collection_name: String,
    collection_id: Mutex<String>,
    client: reqwest::Client,
}

impl ChromaStore {
    /// Connect to a Chroma server and resolve (or create) the collection.
    pub async fn connect(base_url: &str, collection_name: &str) -> Result<Self, StoreError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();

        let collection_id =
            Self::get_or_create_collection(&client, &base_url, collection_name).await?;

        Ok(Self {
            base_url,
            collection_name: collection_name.to_string(),
            collection_id: Mutex::new(collection_id),
            client,
        })
    }

    async fn get_or_create_collection(
        client: &reqwest::Client,
        base_url: &str,
        name: &str,
    ) -> Result<String, StoreError> {
        let url = format!("{}/api/v1/collections", base_url);
        let body = json!({
            "name": name,
            "get_or_create": true,
            "metadata": {"hnsw:space": "cosine"},
        });

        let value = Self::send(client, &url, &body).await?;
        value
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| StoreError::Collection(format!("no id in create response for '{name}'")))
    }

    async fn send(
        client: &reqwest::Client,
        url: &str,
        body: &Value,
    ) -> Result<Value, StoreError> {
        let response = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Request {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn collection_url(&self, op: &str) -> String {
        let id = self.collection_id.lock().await;
        format!("{}/api/v1/collections/{}/{}", self.base_url, *id, op)
    }

    fn metadata_to_value(metadata: &ChunkMetadata) -> Result<Value, StoreError> {
        serde_json::to_value(metadata).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn metadata_from_value(value: Value) -> Result<ChunkMetadata, StoreError> {
        serde_json::from_value(value).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl VectorStore for ChromaStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(records.len());
        let mut embeddings = Vec::with_capacity(records.len());
        let mut documents = Vec::with_capacity(records.len());
        let mut metadatas = Vec::with_capacity(records.len());
        for record in records {
            metadatas.push(Self::metadata_to_value(&record.metadata)?);
            ids.push(record.id);
            embeddings.push(record.embedding);
            documents.push(record.text);
        }

        debug!(count = ids.len(), "upserting records into chroma");
        let url = self.collection_url("upsert").await;
        let body = json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": documents,
            "metadatas": metadatas,
        });

        Self::send(&self.client, &url, &body).await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<VectorMatch>, StoreError> {
        let url = self.collection_url("query").await;
        let body = json!({
            "query_embeddings": [embedding],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });

        let value = Self::send(&self.client, &url, &body).await?;

        // Results come back as one nested array per query embedding.
        let first = |key: &str| -> Option<Vec<Value>> {
            value
                .get(key)
                .and_then(|v| v.get(0))
                .and_then(|v| v.as_array())
                .cloned()
        };

        let ids = first("ids")
            .ok_or_else(|| StoreError::InvalidResponse("query response missing ids".to_string()))?;
        let documents = first("documents").unwrap_or_default();
        let metadatas = first("metadatas").unwrap_or_default();
        let distances = first("distances").unwrap_or_default();

        let mut matches = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let id = id
                .as_str()
                .ok_or_else(|| StoreError::InvalidResponse("non-string id".to_string()))?
                .to_string();
            let text = documents
                .get(i)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let metadata = Self::metadata_from_value(
                metadatas.get(i).cloned().unwrap_or(Value::Null),
            )?;
            let distance = distances.get(i).and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;

            matches.push(VectorMatch {
                id,
                text,
                metadata,
                distance,
            });
        }

        Ok(matches)
    }

    async fn ids_for_source(&self, source_path: &str) -> Result<Vec<String>, StoreError> {
        let url = self.collection_url("get").await;
        let body = json!({
            "where": {"source_path": {"$eq": source_path}},
        });

        let value = Self::send(&self.client, &url, &body).await?;
        let ids = value
            .get("ids")
            .and_then(|v| v.as_array())
            .ok_or_else(|| StoreError::InvalidResponse("get response missing ids".to_string()))?;

        Ok(ids
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let url = self.collection_url("delete").await;
        let body = json!({"ids": ids});
        Self::send(&self.client, &url, &body).await?;
        Ok(())
    }

    async fn list_sources(&self) -> Result<Vec<String>, StoreError> {
        let url = self.collection_url("get").await;
        let body = json!({"include": ["metadatas"]});

        let value = Self::send(&self.client, &url, &body).await?;
        let metadatas = value
            .get("metadatas")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut sources: Vec<String> = metadatas
            .iter()
            .filter_map(|m| m.get("source_path"))
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let url = format!(
            "{}/api/v1/collections/{}",
            self.base_url, self.collection_name
        );
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|e| StoreError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        // 404 means the collection was already gone; anything else non-2xx is real.
        let status = response.status();
        if !status.is_success() && status.as_u16() != 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Http {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let new_id =
            Self::get_or_create_collection(&self.client, &self.base_url, &self.collection_name)
                .await?;
        *self.collection_id.lock().await = new_id;
        Ok(())
    }
}
