use crate::clients::vector::VectorPoint;
use crate::clients::{Embedder, VectorStore};
use crate::domain::models::Chunk;
use crate::error::{AppError, AppResult};
use crate::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// A chunk matched by a semantic query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub chunk_id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
    pub score: f32,
}

/// Tenant-scoped chunk operations, including semantic query over the
/// vector index.
pub struct ChunkService {
    storage: Arc<dyn Storage>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    tenant_id: String,
    tenant_user_id: String,
}

impl ChunkService {
    pub fn new(
        storage: Arc<dyn Storage>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        tenant_id: String,
        tenant_user_id: String,
    ) -> Self {
        Self {
            storage,
            embedder,
            vectors,
            tenant_id,
            tenant_user_id,
        }
    }

    pub async fn create(
        &self,
        document_id: Option<Uuid>,
        content: String,
    ) -> AppResult<Chunk> {
        let chunk = Chunk::new(
            document_id,
            content,
            self.tenant_id.clone(),
            self.tenant_user_id.clone(),
        );
        let inserted = self.storage.insert_chunk(chunk).await?;
        let chunk = self
            .storage
            .get_chunk(inserted.id, &self.tenant_id, &self.tenant_user_id)
            .await?
            .ok_or_else(|| {
                AppError::ChunkCreationFailed("chunk row missing after insert".to_string())
            })?;

        let vector = self.embedder.embed(&chunk.content).await?;
        self.vectors
            .upsert(VectorPoint {
                id: chunk.id,
                vector,
                tenant_id: self.tenant_id.clone(),
                tenant_user_id: self.tenant_user_id.clone(),
            })
            .await?;
        Ok(chunk)
    }

    pub async fn find_one(&self, id: Uuid) -> AppResult<Chunk> {
        self.storage
            .get_chunk(id, &self.tenant_id, &self.tenant_user_id)
            .await?
            .ok_or_else(|| AppError::ChunkNotFound(id.to_string()))
    }

    pub async fn find_all(&self) -> AppResult<Vec<Chunk>> {
        self.storage
            .list_chunks(&self.tenant_id, &self.tenant_user_id)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let deleted = self
            .storage
            .delete_chunk(id, &self.tenant_id, &self.tenant_user_id)
            .await?;
        if !deleted {
            return Err(AppError::ChunkNotFound(id.to_string()));
        }
        self.vectors.delete(id).await
    }

    /// Embed the query text, search the vector index under this tenant,
    /// and join the ranked hits back to chunk content. Hits without a
    /// relational row under this tenant are dropped.
    pub async fn query(&self, q: &str, limit: usize) -> AppResult<Vec<QueryResult>> {
        let vector = self.embedder.embed(q).await?;
        let hits = self
            .vectors
            .search(&vector, &self.tenant_id, &self.tenant_user_id, limit)
            .await?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(chunk) = self
                .storage
                .get_chunk(hit.id, &self.tenant_id, &self.tenant_user_id)
                .await?
            {
                results.push(QueryResult {
                    chunk_id: chunk.id,
                    document_id: chunk.document_id,
                    content: chunk.content,
                    score: hit.score,
                });
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{FakeEmbedder, InMemoryVectorStore};
    use crate::storage::memory::InMemoryStorage;

    struct Fixture {
        storage: Arc<dyn Storage>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                storage: Arc::new(InMemoryStorage::new()),
                embedder: Arc::new(FakeEmbedder),
                vectors: Arc::new(InMemoryVectorStore::new()),
            }
        }

        fn service(&self, tenant_id: &str, tenant_user_id: &str) -> ChunkService {
            ChunkService::new(
                Arc::clone(&self.storage),
                Arc::clone(&self.embedder),
                Arc::clone(&self.vectors),
                tenant_id.to_string(),
                tenant_user_id.to_string(),
            )
        }
    }

    #[tokio::test]
    async fn query_round_trips_to_the_indexed_chunk() {
        let fixture = Fixture::new();
        let service = fixture.service("t1", "u1");

        let target = service
            .create(None, "the quarterly revenue numbers".to_string())
            .await
            .unwrap();
        service
            .create(None, "unrelated grocery list".to_string())
            .await
            .unwrap();

        let results = service
            .query("the quarterly revenue numbers", 10)
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, target.id);
        assert_eq!(results[0].content, "the quarterly revenue numbers");
    }

    #[tokio::test]
    async fn query_never_returns_foreign_tenant_chunks() {
        let fixture = Fixture::new();
        let owner = fixture.service("t1", "u1");
        let foreign = fixture.service("t2", "u1");

        // identical content, so vector similarity is maximal
        owner
            .create(None, "shared secret phrase".to_string())
            .await
            .unwrap();

        let results = foreign.query("shared secret phrase", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_row_and_vector() {
        let fixture = Fixture::new();
        let service = fixture.service("t1", "u1");
        let chunk = service.create(None, "ephemeral".to_string()).await.unwrap();

        service.delete(chunk.id).await.unwrap();
        assert!(matches!(
            service.find_one(chunk.id).await,
            Err(AppError::ChunkNotFound(_))
        ));
        assert!(service.query("ephemeral", 10).await.unwrap().is_empty());

        let result = service.delete(chunk.id).await;
        assert!(matches!(result, Err(AppError::ChunkNotFound(_))));
    }
}
