pub mod memory;

use crate::domain::models::{Chunk, Connection, Document};
use crate::error::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage trait for persistence operations.
///
/// Every read, update, and delete is filtered by the owning
/// `(tenant_id, tenant_user_id)` pair; a row owned by anyone else is
/// indistinguishable from an absent row.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Transport-level liveness check.
    async fn health(&self) -> AppResult<()>;

    // Connections
    async fn insert_connection(&self, connection: Connection) -> AppResult<Connection>;
    async fn get_connection(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Option<Connection>>;
    async fn list_connections(
        &self,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Vec<Connection>>;
    async fn update_connection(&self, connection: Connection) -> AppResult<Connection>;
    async fn delete_connection(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<bool>;

    // Documents
    async fn insert_document(&self, document: Document) -> AppResult<Document>;
    async fn get_document(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Option<Document>>;
    async fn list_documents(
        &self,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Vec<Document>>;
    /// Deletes the document and cascades to its chunks.
    async fn delete_document(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<bool>;

    // Chunks
    async fn insert_chunk(&self, chunk: Chunk) -> AppResult<Chunk>;
    async fn get_chunk(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Option<Chunk>>;
    async fn list_chunks(&self, tenant_id: &str, tenant_user_id: &str) -> AppResult<Vec<Chunk>>;
    async fn list_chunks_by_document(
        &self,
        document_id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Vec<Chunk>>;
    async fn delete_chunk(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<bool>;
}
