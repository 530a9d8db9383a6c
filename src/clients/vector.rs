use crate::clients::embedding::EMBEDDING_DIM;
use crate::clients::http_client;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Name of the dense vector within the collection.
const VECTOR_NAME: &str = "text-dense";

/// A point stored in the vector index, tagged with the owning tenant.
#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub tenant_id: String,
    pub tenant_user_id: String,
}

/// A ranked search hit.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: Uuid,
    pub score: f32,
}

/// Vector store interface: upsert, tenant-filtered similarity search,
/// delete.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection and its payload indexes if absent.
    async fn ensure_collection(&self) -> AppResult<()>;
    async fn health(&self) -> AppResult<()>;
    async fn upsert(&self, point: VectorPoint) -> AppResult<()>;
    async fn search(
        &self,
        vector: &[f32],
        tenant_id: &str,
        tenant_user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ScoredPoint>>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Client for the Qdrant REST API.
pub struct QdrantVectorStore {
    client: Client,
    base_url: String,
    collection_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

impl QdrantVectorStore {
    pub fn new(base_url: String, collection_name: String) -> Self {
        Self {
            client: http_client(),
            base_url,
            collection_name,
        }
    }

    fn unavailable(context: &str, err: impl std::fmt::Display) -> AppError {
        AppError::VectorStoreUnavailable(format!("{}: {}", context, err))
    }

    async fn create_payload_index(&self, field_name: &str) -> AppResult<()> {
        let url = format!(
            "{}/collections/{}/index",
            self.base_url, self.collection_name
        );
        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({
                "field_name": field_name,
                "field_schema": "keyword",
            }))
            .send()
            .await
            .map_err(|e| Self::unavailable("payload index request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreUnavailable(format!(
                "payload index returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn ensure_collection(&self) -> AppResult<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection_name);

        let exists = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unavailable("collection lookup failed", e))?
            .status()
            .is_success();
        if exists {
            return Ok(());
        }

        debug!("Creating vector collection {}", self.collection_name);

        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({
                "vectors": {
                    VECTOR_NAME: {
                        "size": EMBEDDING_DIM,
                        "distance": "Cosine",
                    },
                },
                "hnsw_config": {
                    // global index off; tenants are indexed through payload
                    "m": 0,
                    "payload_m": 16,
                },
            }))
            .send()
            .await
            .map_err(|e| Self::unavailable("collection create failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreUnavailable(format!(
                "collection create returned {}: {}",
                status, body
            )));
        }

        self.create_payload_index("tenant_id").await?;
        self.create_payload_index("tenant_user_id").await?;
        Ok(())
    }

    async fn health(&self) -> AppResult<()> {
        let url = format!("{}/collections", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Self::unavailable("vector store unreachable", e))?;
        if !response.status().is_success() {
            return Err(AppError::VectorStoreUnavailable(format!(
                "vector store returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn upsert(&self, point: VectorPoint) -> AppResult<()> {
        let url = format!(
            "{}/collections/{}/points",
            self.base_url, self.collection_name
        );
        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({
                "points": [{
                    "id": point.id.to_string(),
                    "vector": { VECTOR_NAME: point.vector },
                    "payload": {
                        "tenant_id": point.tenant_id,
                        "tenant_user_id": point.tenant_user_id,
                    },
                }],
            }))
            .send()
            .await
            .map_err(|e| Self::unavailable("upsert request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreUnavailable(format!(
                "upsert returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        tenant_id: &str,
        tenant_user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ScoredPoint>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection_name
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "vector": { "name": VECTOR_NAME, "vector": vector },
                "filter": {
                    "must": [
                        { "key": "tenant_id", "match": { "value": tenant_id } },
                        { "key": "tenant_user_id", "match": { "value": tenant_user_id } },
                    ],
                },
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(|e| Self::unavailable("search request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreUnavailable(format!(
                "search returned {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Self::unavailable("search response", e))?;

        // Post-filter on the returned payload as well; the tenant boundary
        // must not rest on the filter alone.
        Ok(parsed
            .result
            .into_iter()
            .filter(|hit| {
                hit.payload
                    .as_ref()
                    .map(|p| {
                        p.get("tenant_id").and_then(serde_json::Value::as_str) == Some(tenant_id)
                            && p.get("tenant_user_id").and_then(serde_json::Value::as_str)
                                == Some(tenant_user_id)
                    })
                    .unwrap_or(false)
            })
            .filter_map(|hit| {
                Uuid::parse_str(&hit.id).ok().map(|id| ScoredPoint {
                    id,
                    score: hit.score,
                })
            })
            .collect())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let url = format!(
            "{}/collections/{}/points/delete",
            self.base_url, self.collection_name
        );
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "points": [id.to_string()] }))
            .send()
            .await
            .map_err(|e| Self::unavailable("delete request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VectorStoreUnavailable(format!(
                "delete returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}

/// In-memory vector store: exact cosine scan, used by tests and keyless
/// development.
pub struct InMemoryVectorStore {
    points: RwLock<HashMap<Uuid, VectorPoint>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self) -> AppResult<()> {
        Ok(())
    }

    async fn health(&self) -> AppResult<()> {
        Ok(())
    }

    async fn upsert(&self, point: VectorPoint) -> AppResult<()> {
        let mut points = self.points.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        points.insert(point.id, point);
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        tenant_id: &str,
        tenant_user_id: &str,
        limit: usize,
    ) -> AppResult<Vec<ScoredPoint>> {
        let points = self.points.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let mut scored: Vec<ScoredPoint> = points
            .values()
            .filter(|p| p.tenant_id == tenant_id && p.tenant_user_id == tenant_user_id)
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(vector, &p.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut points = self.points.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        points.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(vector: Vec<f32>, tenant_id: &str, tenant_user_id: &str) -> VectorPoint {
        VectorPoint {
            id: Uuid::new_v4(),
            vector,
            tenant_id: tenant_id.to_string(),
            tenant_user_id: tenant_user_id.to_string(),
        }
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let store = InMemoryVectorStore::new();
        let close = point(vec![1.0, 0.1, 0.0], "t1", "u1");
        let far = point(vec![0.0, 1.0, 1.0], "t1", "u1");
        let close_id = close.id;
        store.upsert(close).await.unwrap();
        store.upsert(far).await.unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], "t1", "u1", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, close_id);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn search_never_crosses_tenants() {
        let store = InMemoryVectorStore::new();
        let foreign = point(vec![1.0, 0.0], "t2", "u1");
        let other_user = point(vec![1.0, 0.0], "t1", "u2");
        store.upsert(foreign).await.unwrap();
        store.upsert(other_user).await.unwrap();

        // identical vectors, but neither belongs to (t1, u1)
        let hits = store.search(&[1.0, 0.0], "t1", "u1", 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_point() {
        let store = InMemoryVectorStore::new();
        let p = point(vec![1.0], "t1", "u1");
        let id = p.id;
        store.upsert(p).await.unwrap();
        store.delete(id).await.unwrap();

        let hits = store.search(&[1.0], "t1", "u1", 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
