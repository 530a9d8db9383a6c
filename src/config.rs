use crate::error::{AppError, AppResult};
use std::collections::BTreeMap;
use std::env;

/// Per-integration configuration blocks keyed by integration identifier.
///
/// Each block is validated against the integration's config model when the
/// registry is built; a block may carry an explicit `slug` to register a
/// second named instance of the same integration type.
pub type IntegrationSettings = BTreeMap<String, Vec<serde_json::Value>>;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3014)
    pub port: u16,
    /// Secret used to sign and verify tenant access tokens
    pub secret: String,
    /// API keys allowed to mint tenant tokens
    pub api_keys: Vec<String>,
    /// Database URL (optional, for future Postgres support)
    pub database_url: Option<String>,
    /// Vector store URL
    pub qdrant_url: String,
    /// Vector store collection name
    pub qdrant_collection_name: String,
    /// Embedding provider API key (optional - fake embeddings when unset)
    pub openai_api_key: Option<String>,
    /// Path to the JSON integrations settings file (optional)
    pub integrations_config_path: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3014),
            secret: env::var("SECRET").unwrap_or_else(|_| "dev-secret".to_string()),
            api_keys: env::var("API_KEYS")
                .map(|keys| {
                    keys.split(',')
                        .map(|k| k.trim().to_string())
                        .filter(|k| !k.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            database_url: env::var("DATABASE_URL").ok(),
            qdrant_url: env::var("QDRANT_URL")
                .unwrap_or_else(|_| "http://localhost:6333".to_string()),
            qdrant_collection_name: env::var("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|_| "chunks".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            integrations_config_path: env::var("INTEGRATIONS_CONFIG_PATH").ok(),
        }
    }

    /// Load the integrations settings file, if one is configured.
    pub fn load_integration_settings(&self) -> AppResult<Option<IntegrationSettings>> {
        let Some(path) = &self.integrations_config_path else {
            return Ok(None);
        };
        let raw = std::fs::read_to_string(path)?;
        let settings: IntegrationSettings = serde_json::from_str(&raw)
            .map_err(|e| AppError::Validation(format!("invalid integrations config: {}", e)))?;
        Ok(Some(settings))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
