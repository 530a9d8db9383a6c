use crate::clients::http_client;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Dimensionality of every embedding produced by this service.
pub const EMBEDDING_DIM: usize = 1024;

/// Text to fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}

/// Client for the OpenAI embeddings API.
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String) -> Self {
        Self {
            client: http_client(),
            api_key,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    /// Calls: POST https://api.openai.com/v1/embeddings
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        debug!("Requesting embedding for {} chars", text.len());

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "input": text,
                "model": "text-embedding-3-large",
                "dimensions": EMBEDDING_DIM,
            }))
            .send()
            .await
            .map_err(|e| AppError::IntegrationError(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IntegrationError(format!(
                "embedding provider returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::IntegrationError(format!("embedding response: {}", e)))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::IntegrationError("embedding response was empty".to_string()))
    }
}

/// Deterministic embedder for tests and keyless development. Buckets
/// character codes so distinct texts map to distinct directions.
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut vector = vec![0.0f32; EMBEDDING_DIM];
        for (position, ch) in text.chars().enumerate() {
            let bucket = (ch as usize + position) % EMBEDDING_DIM;
            vector[bucket] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_embedder_is_deterministic_and_sized() {
        let a = FakeEmbedder.embed("hello world").await.unwrap();
        let b = FakeEmbedder.embed("hello world").await.unwrap();
        let c = FakeEmbedder.embed("something else").await.unwrap();

        assert_eq!(a.len(), EMBEDDING_DIM);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
