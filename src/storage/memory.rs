use crate::domain::models::{Chunk, Connection, Document};
use crate::error::{AppError, AppResult};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory storage implementation for development and tests.
pub struct InMemoryStorage {
    connections: RwLock<HashMap<Uuid, Connection>>,
    documents: RwLock<HashMap<Uuid, Document>>,
    chunks: RwLock<HashMap<Uuid, Chunk>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            documents: RwLock::new(HashMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn health(&self) -> AppResult<()> {
        self.connections
            .read()
            .map_err(|_| AppError::DatabaseConnectionFailed("Lock poisoned".to_string()))?;
        Ok(())
    }

    // Connections
    async fn insert_connection(&self, connection: Connection) -> AppResult<Connection> {
        let mut connections = self.connections.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn get_connection(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Option<Connection>> {
        let connections = self.connections.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(connections.get(&id)
            .filter(|c| c.tenant_id == tenant_id && c.tenant_user_id == tenant_user_id)
            .cloned())
    }

    async fn list_connections(
        &self,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Vec<Connection>> {
        let connections = self.connections.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let mut matching: Vec<Connection> = connections.values()
            .filter(|c| c.tenant_id == tenant_id && c.tenant_user_id == tenant_user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);
        Ok(matching)
    }

    async fn update_connection(&self, connection: Connection) -> AppResult<Connection> {
        let mut connections = self.connections.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let mut connection = connection;
        connection.updated_at = Utc::now();
        connections.insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn delete_connection(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<bool> {
        let mut connections = self.connections.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let owned = connections.get(&id)
            .map(|c| c.tenant_id == tenant_id && c.tenant_user_id == tenant_user_id)
            .unwrap_or(false);
        if owned {
            connections.remove(&id);
        }
        Ok(owned)
    }

    // Documents
    async fn insert_document(&self, document: Document) -> AppResult<Document> {
        let mut documents = self.documents.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Option<Document>> {
        let documents = self.documents.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(documents.get(&id)
            .filter(|d| d.tenant_id == tenant_id && d.tenant_user_id == tenant_user_id)
            .cloned())
    }

    async fn list_documents(
        &self,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Vec<Document>> {
        let documents = self.documents.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let mut matching: Vec<Document> = documents.values()
            .filter(|d| d.tenant_id == tenant_id && d.tenant_user_id == tenant_user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|d| d.created_at);
        Ok(matching)
    }

    async fn delete_document(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<bool> {
        let mut documents = self.documents.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let owned = documents.get(&id)
            .map(|d| d.tenant_id == tenant_id && d.tenant_user_id == tenant_user_id)
            .unwrap_or(false);
        if !owned {
            return Ok(false);
        }
        documents.remove(&id);

        // cascade to owned chunks
        let mut chunks = self.chunks.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        chunks.retain(|_, c| c.document_id != Some(id));
        Ok(true)
    }

    // Chunks
    async fn insert_chunk(&self, chunk: Chunk) -> AppResult<Chunk> {
        let mut chunks = self.chunks.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        chunks.insert(chunk.id, chunk.clone());
        Ok(chunk)
    }

    async fn get_chunk(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Option<Chunk>> {
        let chunks = self.chunks.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(chunks.get(&id)
            .filter(|c| c.tenant_id == tenant_id && c.tenant_user_id == tenant_user_id)
            .cloned())
    }

    async fn list_chunks(&self, tenant_id: &str, tenant_user_id: &str) -> AppResult<Vec<Chunk>> {
        let chunks = self.chunks.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let mut matching: Vec<Chunk> = chunks.values()
            .filter(|c| c.tenant_id == tenant_id && c.tenant_user_id == tenant_user_id)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);
        Ok(matching)
    }

    async fn list_chunks_by_document(
        &self,
        document_id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<Vec<Chunk>> {
        let chunks = self.chunks.read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let mut matching: Vec<Chunk> = chunks.values()
            .filter(|c| {
                c.document_id == Some(document_id)
                    && c.tenant_id == tenant_id
                    && c.tenant_user_id == tenant_user_id
            })
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.created_at);
        Ok(matching)
    }

    async fn delete_chunk(
        &self,
        id: Uuid,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> AppResult<bool> {
        let mut chunks = self.chunks.write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        let owned = chunks.get(&id)
            .map(|c| c.tenant_id == tenant_id && c.tenant_user_id == tenant_user_id)
            .unwrap_or(false);
        if owned {
            chunks.remove(&id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tenant_filter_hides_foreign_rows() {
        let storage = InMemoryStorage::new();
        let connection = Connection::new(
            "mock_oauth2".to_string(),
            "t1".to_string(),
            "u1".to_string(),
        );
        let id = connection.id;
        storage.insert_connection(connection).await.unwrap();

        assert!(storage.get_connection(id, "t1", "u1").await.unwrap().is_some());
        assert!(storage.get_connection(id, "t2", "u1").await.unwrap().is_none());
        assert!(storage.get_connection(id, "t1", "u2").await.unwrap().is_none());

        // foreign delete does not remove the row
        assert!(!storage.delete_connection(id, "t2", "u1").await.unwrap());
        assert!(storage.get_connection(id, "t1", "u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_document_cascades_chunks() {
        let storage = InMemoryStorage::new();
        let document = Document::new(
            None,
            "a\nb".to_string(),
            "t1".to_string(),
            "u1".to_string(),
        );
        let doc_id = document.id;
        storage.insert_document(document).await.unwrap();
        for content in ["a", "b"] {
            storage
                .insert_chunk(Chunk::new(
                    Some(doc_id),
                    content.to_string(),
                    "t1".to_string(),
                    "u1".to_string(),
                ))
                .await
                .unwrap();
        }

        assert!(storage.delete_document(doc_id, "t1", "u1").await.unwrap());
        assert!(storage.list_chunks("t1", "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunks_listed_in_creation_order() {
        let storage = InMemoryStorage::new();
        let doc_id = Uuid::new_v4();
        for content in ["first", "second", "third"] {
            storage
                .insert_chunk(Chunk::new(
                    Some(doc_id),
                    content.to_string(),
                    "t1".to_string(),
                    "u1".to_string(),
                ))
                .await
                .unwrap();
        }

        let contents: Vec<String> = storage
            .list_chunks_by_document(doc_id, "t1", "u1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }
}
