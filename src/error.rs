use actix_web::{HttpResponse, ResponseError};
use std::fmt;

/// Application error types.
#[derive(Debug)]
pub enum AppError {
    /// Referenced integration slug does not resolve in the registry
    IntegrationNotFound(String),
    /// Duplicate slug registration without a disambiguating slug
    IntegrationAlreadyExists(String),
    /// An integration definition fails its class-level contract checks
    IntegrationInvalid(String),
    /// Upstream integration provider failure (OAuth2 exchange, document pull)
    IntegrationError(String),
    /// Connection config fails schema validation
    ConnectionInvalid(String),
    /// Connection row absent or owned by a different tenant
    ConnectionNotFound(String),
    /// Connection persistence failed
    ConnectionCreationFailed(String),
    /// Document row absent or owned by a different tenant
    DocumentNotFound(String),
    /// Document persistence failed
    DocumentCreationFailed(String),
    /// Chunk row absent or owned by a different tenant
    ChunkNotFound(String),
    /// Chunk persistence failed
    ChunkCreationFailed(String),
    /// API key missing or not configured
    ApiKeyInvalid(String),
    /// Token signature valid but expired
    TokenExpired(String),
    /// Token malformed or signature invalid
    TokenInvalid(String),
    /// Missing or unusable authorization
    Unauthorized(String),
    /// Request payload validation error
    Validation(String),
    /// Relational store unreachable
    DatabaseConnectionFailed(String),
    /// Vector store unreachable
    VectorStoreUnavailable(String),
    /// Unexpected internal error
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::IntegrationNotFound(msg) => write!(f, "Integration Not Found: {}", msg),
            AppError::IntegrationAlreadyExists(msg) => write!(f, "Integration Already Exists: {}", msg),
            AppError::IntegrationInvalid(msg) => write!(f, "Integration Invalid: {}", msg),
            AppError::IntegrationError(msg) => write!(f, "Integration Error: {}", msg),
            AppError::ConnectionInvalid(msg) => write!(f, "Connection Invalid: {}", msg),
            AppError::ConnectionNotFound(msg) => write!(f, "Connection Not Found: {}", msg),
            AppError::ConnectionCreationFailed(msg) => write!(f, "Connection Creation Failed: {}", msg),
            AppError::DocumentNotFound(msg) => write!(f, "Document Not Found: {}", msg),
            AppError::DocumentCreationFailed(msg) => write!(f, "Document Creation Failed: {}", msg),
            AppError::ChunkNotFound(msg) => write!(f, "Chunk Not Found: {}", msg),
            AppError::ChunkCreationFailed(msg) => write!(f, "Chunk Creation Failed: {}", msg),
            AppError::ApiKeyInvalid(msg) => write!(f, "API Key Invalid: {}", msg),
            AppError::TokenExpired(msg) => write!(f, "Token Expired: {}", msg),
            AppError::TokenInvalid(msg) => write!(f, "Token Invalid: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            AppError::DatabaseConnectionFailed(msg) => write!(f, "Database Connection Failed: {}", msg),
            AppError::VectorStoreUnavailable(msg) => write!(f, "Vector Store Unavailable: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl AppError {
    /// Stable machine-readable error kind, used in response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::IntegrationNotFound(_) => "integration_not_found",
            AppError::IntegrationAlreadyExists(_) => "integration_already_exists",
            AppError::IntegrationInvalid(_) => "integration_invalid",
            AppError::IntegrationError(_) => "integration_error",
            AppError::ConnectionInvalid(_) => "connection_invalid",
            AppError::ConnectionNotFound(_) => "connection_not_found",
            AppError::ConnectionCreationFailed(_) => "connection_creation_failed",
            AppError::DocumentNotFound(_) => "document_not_found",
            AppError::DocumentCreationFailed(_) => "document_creation_failed",
            AppError::ChunkNotFound(_) => "chunk_not_found",
            AppError::ChunkCreationFailed(_) => "chunk_creation_failed",
            AppError::ApiKeyInvalid(_) => "api_key_invalid",
            AppError::TokenExpired(_) => "token_expired",
            AppError::TokenInvalid(_) => "token_invalid",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Validation(_) => "validation_error",
            AppError::DatabaseConnectionFailed(_) => "database_connection_failed",
            AppError::VectorStoreUnavailable(_) => "vector_store_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let status = match self {
            AppError::IntegrationNotFound(_)
            | AppError::ConnectionNotFound(_)
            | AppError::DocumentNotFound(_)
            | AppError::ChunkNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IntegrationAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::ConnectionInvalid(_) | AppError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::ApiKeyInvalid(_)
            | AppError::TokenExpired(_)
            | AppError::TokenInvalid(_)
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::IntegrationError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseConnectionFailed(_) | AppError::VectorStoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::IntegrationInvalid(_)
            | AppError::ConnectionCreationFailed(_)
            | AppError::DocumentCreationFailed(_)
            | AppError::ChunkCreationFailed(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string()
        }))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::IntegrationError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
