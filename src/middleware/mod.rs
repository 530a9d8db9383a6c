use crate::domain::models::TokenClaims;
use crate::error::{AppError, AppResult};
use actix_web::HttpRequest;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Token lifetime from issuance.
const TOKEN_TTL_DAYS: i64 = 1;

/// Sign tenant claims into an access token. `iat`/`exp` are stamped here;
/// whatever the caller supplied for them is ignored.
pub fn sign_claims(claims: &TokenClaims, secret: &str) -> AppResult<String> {
    let now = Utc::now();
    let stamped = TokenClaims {
        tenant_id: claims.tenant_id.clone(),
        tenant_user_id: claims.tenant_user_id.clone(),
        iat: Some(now.timestamp()),
        exp: Some((now + Duration::days(TOKEN_TTL_DAYS)).timestamp()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &stamped,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
}

/// Verify a token and return its claims. Expiry is distinguished from
/// every other failure: an expired token can be re-issued by the client,
/// a bad signature cannot.
pub fn verify_token(token: &str, secret: &str) -> AppResult<TokenClaims> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::TokenExpired("token has expired".to_string())
        }
        _ => AppError::TokenInvalid(e.to_string()),
    })
}

/// Extract and verify the bearer token from an HTTP request.
pub fn extract_token_claims(req: &HttpRequest, secret: &str) -> AppResult<TokenClaims> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed Authorization header".to_string()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".to_string()))?;

    verify_token(token, secret)
}

/// Check the request's API key against the configured set.
pub fn require_api_key(req: &HttpRequest, api_keys: &[String]) -> AppResult<()> {
    let key = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::ApiKeyInvalid("missing X-API-Key header".to_string()))?;

    if api_keys.iter().any(|k| k == key) {
        Ok(())
    } else {
        Err(AppError::ApiKeyInvalid("invalid API key".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> TokenClaims {
        TokenClaims {
            tenant_id: "t1".to_string(),
            tenant_user_id: "u1".to_string(),
            iat: None,
            exp: None,
        }
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let token = sign_claims(&claims(), "secret").unwrap();
        let verified = verify_token(&token, "secret").unwrap();

        assert_eq!(verified.tenant_id, "t1");
        assert_eq!(verified.tenant_user_id, "u1");
        assert!(verified.exp.unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = sign_claims(&claims(), "secret").unwrap();
        let result = verify_token(&token, "other-secret");
        assert!(matches!(result, Err(AppError::TokenInvalid(_))));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let result = verify_token("not-a-jwt", "secret");
        assert!(matches!(result, Err(AppError::TokenInvalid(_))));
    }

    #[test]
    fn expired_token_is_distinguished() {
        // stamp an exp well past the default validation leeway
        let now = Utc::now();
        let stale = TokenClaims {
            tenant_id: "t1".to_string(),
            tenant_user_id: "u1".to_string(),
            iat: Some((now - Duration::hours(2)).timestamp()),
            exp: Some((now - Duration::hours(1)).timestamp()),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &stale,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let result = verify_token(&token, "secret");
        assert!(matches!(result, Err(AppError::TokenExpired(_))));
    }
}
