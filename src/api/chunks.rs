use crate::domain::chunks::ChunkService;
use crate::domain::models::{Chunk, TokenClaims};
use crate::error::AppResult;
use crate::middleware::extract_token_claims;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChunkRequest {
    pub content: String,
    #[serde(default)]
    pub document_id: Option<Uuid>,
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
    pub created_at: String,
}

impl From<Chunk> for ChunkResponse {
    fn from(chunk: Chunk) -> Self {
        Self {
            id: chunk.id,
            document_id: chunk.document_id,
            content: chunk.content,
            created_at: chunk.created_at.to_rfc3339(),
        }
    }
}

fn service(app_state: &crate::AppState, claims: &TokenClaims) -> ChunkService {
    ChunkService::new(
        Arc::clone(&app_state.storage),
        Arc::clone(&app_state.embedder),
        Arc::clone(&app_state.vectors),
        claims.tenant_id.clone(),
        claims.tenant_user_id.clone(),
    )
}

/// Create and index a chunk.
/// POST /api/v1/chunks
pub async fn create_chunk(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    body: web::Json<CreateChunkRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;
    let body = body.into_inner();

    let chunk = service(&app_state, &claims)
        .create(body.document_id, body.content)
        .await?;
    Ok(HttpResponse::Created().json(ChunkResponse::from(chunk)))
}

/// List the tenant's chunks.
/// GET /api/v1/chunks
pub async fn list_chunks(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let chunks = service(&app_state, &claims).find_all().await?;
    let items: Vec<ChunkResponse> = chunks.into_iter().map(ChunkResponse::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// Get a chunk.
/// GET /api/v1/chunks/{id}
pub async fn get_chunk(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let chunk = service(&app_state, &claims).find_one(*path).await?;
    Ok(HttpResponse::Ok().json(ChunkResponse::from(chunk)))
}

/// Delete a chunk and its vector point.
/// DELETE /api/v1/chunks/{id}
pub async fn delete_chunk(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    service(&app_state, &claims).delete(*path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

/// Semantic query over the tenant's chunks.
/// POST /api/v1/chunks/query
pub async fn query_chunks(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    body: web::Json<QueryRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;
    let body = body.into_inner();

    let results = service(&app_state, &claims).query(&body.q, body.limit).await?;
    Ok(HttpResponse::Ok().json(results))
}
