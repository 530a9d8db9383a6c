use crate::domain::connections::ConnectionService;
use crate::domain::documents::DocumentService;
use crate::domain::models::{Connection, ConnectionStatus, TokenClaims};
use crate::domain::sync::SyncOrchestrator;
use crate::error::AppResult;
use crate::middleware::extract_token_claims;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConnectionRequest {
    pub integration: String,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConnectionRequest {
    pub config: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetStatusRequest {
    pub status: ConnectionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteOAuth2Request {
    pub code: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeUrlQuery {
    pub redirect_uri: String,
}

/// Connection payload returned to clients. Tenant identifiers never leave
/// the service.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub id: Uuid,
    pub integration: String,
    pub config: serde_json::Value,
    pub status: ConnectionStatus,
    pub created_at: String,
}

impl From<Connection> for ConnectionResponse {
    fn from(connection: Connection) -> Self {
        Self {
            id: connection.id,
            integration: connection.integration,
            config: connection.config,
            status: connection.status,
            created_at: connection.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorizeUrlResponse {
    pub url: String,
}

fn service(app_state: &crate::AppState, claims: &TokenClaims) -> ConnectionService {
    ConnectionService::new(
        Arc::clone(&app_state.storage),
        Arc::clone(&app_state.registry),
        app_state.http.clone(),
        claims.tenant_id.clone(),
        claims.tenant_user_id.clone(),
    )
}

/// Create a connection.
/// POST /api/v1/connections
pub async fn create_connection(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    body: web::Json<CreateConnectionRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;
    let body = body.into_inner();

    let connection = service(&app_state, &claims)
        .create(&body.integration, body.config)
        .await?;

    Ok(HttpResponse::Created().json(ConnectionResponse::from(connection)))
}

/// List the tenant's connections.
/// GET /api/v1/connections
pub async fn list_connections(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let connections = service(&app_state, &claims).find_all().await?;
    let items: Vec<ConnectionResponse> = connections
        .into_iter()
        .map(ConnectionResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

/// Get a connection.
/// GET /api/v1/connections/{id}
pub async fn get_connection(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let connection = service(&app_state, &claims).find_one(*path).await?;
    Ok(HttpResponse::Ok().json(ConnectionResponse::from(connection)))
}

/// Replace a connection's config.
/// PUT /api/v1/connections/{id}
pub async fn update_connection(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateConnectionRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let connection = service(&app_state, &claims)
        .update(*path, body.into_inner().config)
        .await?;
    Ok(HttpResponse::Ok().json(ConnectionResponse::from(connection)))
}

/// Delete a connection.
/// DELETE /api/v1/connections/{id}
pub async fn delete_connection(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    service(&app_state, &claims).delete(*path).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

/// Provider authorization URL for a pending OAuth2 connection.
/// GET /api/v1/connections/{id}/authorize-url?redirect_uri=...
pub async fn get_authorize_url(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
    query: web::Query<AuthorizeUrlQuery>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let url = service(&app_state, &claims)
        .authorize_url(*path, &query.redirect_uri)
        .await?;
    Ok(HttpResponse::Ok().json(AuthorizeUrlResponse { url }))
}

/// Complete the OAuth2 flow with the provider's authorization code.
/// POST /api/v1/connections/{id}/callback
pub async fn complete_oauth2(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CompleteOAuth2Request>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;
    let body = body.into_inner();

    let connection = service(&app_state, &claims)
        .complete_oauth2(*path, &body.code, &body.redirect_uri)
        .await?;
    Ok(HttpResponse::Ok().json(ConnectionResponse::from(connection)))
}

/// Explicitly transition a connection's status.
/// PUT /api/v1/connections/{id}/status
pub async fn set_status(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SetStatusRequest>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let connection = service(&app_state, &claims)
        .set_status(*path, body.status)
        .await?;
    Ok(HttpResponse::Ok().json(ConnectionResponse::from(connection)))
}

/// Pull all documents visible to a connection into the document store.
/// POST /api/v1/connections/{id}/sync
pub async fn sync_connection(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let claims = extract_token_claims(&req, &app_state.config.secret)?;

    let connection = service(&app_state, &claims).find_one(*path).await?;
    let documents = DocumentService::new(
        Arc::clone(&app_state.storage),
        Arc::clone(&app_state.embedder),
        Arc::clone(&app_state.vectors),
        claims.tenant_id.clone(),
        claims.tenant_user_id.clone(),
    );
    let orchestrator =
        SyncOrchestrator::new(Arc::clone(&app_state.registry), app_state.http.clone());

    let report = orchestrator.sync_connection(&connection, &documents).await?;
    Ok(HttpResponse::Ok().json(report))
}
