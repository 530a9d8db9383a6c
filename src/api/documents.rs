use crate::domain::chunks::ChunkService;
use crate::domain::documents::{DocumentService, DocumentWithChunks};
use crate::domain::models::TokenClaims;
use crate::error::AppResult;
use crate::middleware::extract_token_claims;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryRequest {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub id: Uuid,
    pub document_id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub chunks: Vec<ChunkResponse>,
    pub created_at: String,
}

impl From<DocumentWithChunks> for DocumentResponse {
    fn from(item: DocumentWithChunks) -> Self {
        Self {
            id: item.document.id,
            title: item.document.title,
            content: item.document.content,
            chunks: item
                .chunks
                .into_iter()
                .map(|c| ChunkResponse {
                    id: c.id,
                    document_id: c.document_id,
                    content: c.content,
                })
                .collect(),
            created_at: item.document.created_at.to_rfc3339(),
        }
    }
}

fn service(app_state: &crate::AppState, claims: &TokenClaims) -> DocumentService {
    DocumentService::new(
        Arc::clone(&app_state.storage),
        Arc::clone(&app_state.embedder),
        Arc::clone(&app_state.vectors),
        claims.tenant_id.clone(),
        claims.tenant_user_id.clone(),
    )
}

/// Create a document, chunking and indexing its content.
/// POST /api/v1/documents
pub async fn create_document(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    body: web::Json<CreateDocumentRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;
    let body = body.into_inner();

    let created = service(&app_state, &claims)
        .create(body.title, body.content)
        .await?;
    Ok(HttpResponse::Created().json(DocumentResponse::from(created)))
}

/// List the tenant's documents.
/// GET /api/v1/documents
pub async fn list_documents(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let documents = service(&app_state, &claims).find_all().await?;
    let items: Vec<DocumentResponse> = documents.into_iter().map(DocumentResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// Get a document with its chunks.
/// GET /api/v1/documents/{id}
pub async fn get_document(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let document = service(&app_state, &claims).find_one(*path).await?;
    Ok(HttpResponse::Ok().json(DocumentResponse::from(document)))
}

/// Delete a document and its chunks.
/// DELETE /api/v1/documents/{id}
pub async fn delete_document(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    service(&app_state, &claims).delete(*path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

/// Semantic query over the tenant's chunks.
/// POST /api/v1/documents/query
pub async fn query_documents(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    body: web::Json<QueryRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;
    let body = body.into_inner();

    let chunks = ChunkService::new(
        Arc::clone(&app_state.storage),
        Arc::clone(&app_state.embedder),
        Arc::clone(&app_state.vectors),
        claims.tenant_id.clone(),
        claims.tenant_user_id.clone(),
    );
    let results = chunks.query(&body.q, body.limit).await?;
    Ok(HttpResponse::Ok().json(results))
}
