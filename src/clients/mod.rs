pub mod embedding;
pub mod vector;

pub use embedding::{Embedder, FakeEmbedder, OpenAiEmbedder};
pub use vector::{InMemoryVectorStore, QdrantVectorStore, VectorStore};

use std::time::Duration;

/// Shared outbound HTTP client with a sane default timeout.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}
