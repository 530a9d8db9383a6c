use crate::clients::vector::VectorPoint;
use crate::clients::{Embedder, VectorStore};
use crate::domain::models::{Chunk, Document};
use crate::error::{AppError, AppResult};
use crate::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A document together with its ordered chunks.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithChunks {
    #[serde(flatten)]
    pub document: Document,
    pub chunks: Vec<Chunk>,
}

/// Tenant-scoped document pipeline: newline chunking, embedding, vector
/// indexing, cascade delete.
pub struct DocumentService {
    storage: Arc<dyn Storage>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    tenant_id: String,
    tenant_user_id: String,
}

impl DocumentService {
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

    /// Create a document: persist the parent row, split the content on
    /// newlines, and index every chunk in the vector store under the chunk's
    /// row id.
    pub async fn create(
        &self,
        title: Option<String>,
        content: String,
    ) -> AppResult<DocumentWithChunks> {
        let document = Document::new(
            title,
            content,
            self.tenant_id.clone(),
            self.tenant_user_id.clone(),
        );
        let inserted = self.storage.insert_document(document).await?;
        let document = self
            .storage
            .get_document(inserted.id, &self.tenant_id, &self.tenant_user_id)
            .await?
            .ok_or_else(|| {
                AppError::DocumentCreationFailed("document row missing after insert".to_string())
            })?;

        let mut chunks = Vec::new();
        for line in document.content.split('\n') {
            let chunk = Chunk::new(
                Some(document.id),
                line.to_string(),
                self.tenant_id.clone(),
                self.tenant_user_id.clone(),
            );
            let chunk = self.storage.insert_chunk(chunk).await?;

            let vector = self.embedder.embed(&chunk.content).await?;
            self.vectors
                .upsert(VectorPoint {
                    id: chunk.id,
                    vector,
                    tenant_id: self.tenant_id.clone(),
                    tenant_user_id: self.tenant_user_id.clone(),
                })
                .await?;
            chunks.push(chunk);
        }

        info!(
            "Created document {} with {} chunks",
            document.id,
            chunks.len()
        );
        Ok(DocumentWithChunks { document, chunks })
    }

    pub async fn find_one(&self, id: Uuid) -> AppResult<DocumentWithChunks> {
        let document = self
            .storage
            .get_document(id, &self.tenant_id, &self.tenant_user_id)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound(id.to_string()))?;
        let chunks = self
            .storage
            .list_chunks_by_document(id, &self.tenant_id, &self.tenant_user_id)
            .await?;
        Ok(DocumentWithChunks { document, chunks })
    }

    pub async fn find_all(&self) -> AppResult<Vec<DocumentWithChunks>> {
        let documents = self
            .storage
            .list_documents(&self.tenant_id, &self.tenant_user_id)
            .await?;

        let mut result = Vec::with_capacity(documents.len());
        for document in documents {
            let chunks = self
                .storage
                .list_chunks_by_document(document.id, &self.tenant_id, &self.tenant_user_id)
                .await?;
            result.push(DocumentWithChunks { document, chunks });
        }
        Ok(result)
    }

    /// Delete the document, its chunk rows, and their vector points.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let chunks = self
            .storage
            .list_chunks_by_document(id, &self.tenant_id, &self.tenant_user_id)
            .await?;

        let deleted = self
            .storage
            .delete_document(id, &self.tenant_id, &self.tenant_user_id)
            .await?;
        if !deleted {
            return Err(AppError::DocumentNotFound(id.to_string()));
        }

        for chunk in chunks {
            self.vectors.delete(chunk.id).await?;
        }
        Ok(())
    }
}
