use crate::error::AppResult;
use crate::middleware::extract_token_claims;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct IntegrationResponse {
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
}

/// List registered integrations.
/// GET /api/v1/integrations
pub async fn list_integrations(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
) -> AppResult<HttpResponse> {
    extract_token_claims(&req, &app_state.config.secret)?;

    let items: Vec<IntegrationResponse> = app_state
        .registry
        .get_all()
        .into_iter()
        .map(|(slug, integration)| IntegrationResponse {
            slug,
            name: integration.name().to_string(),
            logo_url: integration.logo_url().map(String::from),
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

/// Get a single integration by slug.
/// GET /api/v1/integrations/{slug}
pub async fn get_integration(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    extract_token_claims(&req, &app_state.config.secret)?;

    let slug = path.into_inner();
    let integration = app_state.registry.get(&slug)?;

    Ok(HttpResponse::Ok().json(IntegrationResponse {
        slug,
        name: integration.name().to_string(),
        logo_url: integration.logo_url().map(String::from),
    }))
}
