use crate::error::AppResult;
use actix_web::{web, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct StatusResponse {
    service: String,
    version: String,
    status: String,
    uptime_seconds: u64,
}

/// Health check endpoint.
/// GET /api/v1/health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Relational store health.
/// GET /api/v1/health/db
pub async fn health_db(app_state: web::Data<crate::AppState>) -> AppResult<HttpResponse> {
    app_state.storage.health().await?;
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// Vector store health.
/// GET /api/v1/health/vector-db
pub async fn health_vector_db(app_state: web::Data<crate::AppState>) -> AppResult<HttpResponse> {
    app_state.vectors.health().await?;
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// Status endpoint with detailed information.
/// GET /api/v1/status
pub async fn status(app_state: web::Data<crate::AppState>) -> HttpResponse {
    let uptime = app_state.started_at.elapsed().as_secs();

    HttpResponse::Ok().json(StatusResponse {
        service: "memory-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        uptime_seconds: uptime,
    })
}
