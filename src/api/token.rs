use crate::domain::models::TokenClaims;
use crate::error::AppResult;
use crate::middleware::{require_api_key, sign_claims};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTokenRequest {
    pub tenant_id: String,
    pub tenant_user_id: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Mint a tenant access token.
/// POST /api/v1/token
pub async fn create_token(
    req: HttpRequest,
    app_state: web::Data<crate::AppState>,
    body: web::Json<CreateTokenRequest>,
) -> AppResult<HttpResponse> {
    require_api_key(&req, &app_state.config.api_keys)?;

    let claims = TokenClaims {
        tenant_id: body.tenant_id.clone(),
        tenant_user_id: body.tenant_user_id.clone(),
        iat: None,
        exp: None,
    };
    let token = sign_claims(&claims, &app_state.config.secret)?;

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
