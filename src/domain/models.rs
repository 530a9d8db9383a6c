use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Pending => write!(f, "PENDING"),
            ConnectionStatus::Connected => write!(f, "CONNECTED"),
            ConnectionStatus::Disconnected => write!(f, "DISCONNECTED"),
        }
    }
}

/// A tenant's configured instance of an integration.
///
/// `integration` is a slug reference resolved through the registry at use
/// time, not a typed foreign key. `config` is opaque JSON whose shape is
/// defined by the integration's connection model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub integration: String,
    pub config: serde_json::Value,
    pub status: ConnectionStatus,
    pub tenant_id: String,
    pub tenant_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(integration: String, tenant_id: String, tenant_user_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            integration,
            config: serde_json::json!({}),
            status: ConnectionStatus::Pending,
            tenant_id,
            tenant_user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored document. Owns an ordered sequence of chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub tenant_id: String,
    pub tenant_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        title: Option<String>,
        content: String,
        tenant_id: String,
        tenant_user_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            tenant_id,
            tenant_user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A contiguous slice of a document's text, independently embedded and
/// indexed in the vector store under its own id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
    pub tenant_id: String,
    pub tenant_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(
        document_id: Option<Uuid>,
        content: String,
        tenant_id: String,
        tenant_user_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            tenant_id,
            tenant_user_id,
            created_at: Utc::now(),
        }
    }
}

/// Claims carried by a tenant access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub tenant_id: String,
    pub tenant_user_id: String,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
}
