pub mod mock_oauth2;
pub mod notion;
pub mod registry;

use crate::domain::models::Connection;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of a document pull from a third-party source.
///
/// A single malformed upstream record never fails the pull; it is recorded
/// in `skipped` with a reason so callers can count and log what was dropped.
#[derive(Debug, Clone, Default)]
pub struct DocumentPull {
    pub documents: Vec<String>,
    pub skipped: Vec<String>,
}

/// Token record returned by an OAuth2 code exchange or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Instance-level settings needed to activate an OAuth2 integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuth2InstanceConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Per-tenant credential payload stored in an OAuth2 connection's config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OAuth2ConnectionConfig {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// A pluggable third-party document source definition.
///
/// Definitions are immutable, built at process start, and looked up through
/// the registry by slug. Config and connection schemas are closed: unknown
/// fields are rejected, not ignored.
#[async_trait]
pub trait Integration: Send + Sync {
    /// Display name.
    fn name(&self) -> &'static str;

    /// Slug used when no explicit slug is given at registration.
    fn default_slug(&self) -> &'static str;

    /// Display logo, if any.
    fn logo_url(&self) -> Option<&'static str> {
        None
    }

    /// Class-level contract check. Registration refuses definitions that
    /// fail this: name and default slug must be non-empty, and OAuth2
    /// integrations must declare all three endpoints.
    fn validate_class_attrs(&self) -> bool {
        let base = !self.name().is_empty() && !self.default_slug().is_empty();
        match self.oauth2() {
            Some(oauth2) => {
                base && !oauth2.oauth2_api_root().is_empty()
                    && !oauth2.authorization_endpoint().is_empty()
                    && !oauth2.token_endpoint().is_empty()
            }
            None => base,
        }
    }

    /// Validate an instance-level config block against this integration's
    /// config model.
    fn validate_config(&self, config: &serde_json::Value) -> AppResult<()>;

    /// Attempt to interpret `config` as this integration's connection model.
    /// Returns false on any schema violation instead of propagating it.
    fn validate_connection(&self, config: &serde_json::Value) -> bool;

    /// Pull all documents visible to the given connection. Eager: the full
    /// set is materialized before returning.
    async fn get_all_documents(
        &self,
        http: &reqwest::Client,
        connection: &Connection,
    ) -> AppResult<DocumentPull>;

    /// OAuth2 capability, for integrations that authorize via OAuth2.
    fn oauth2(&self) -> Option<&dyn OAuth2Capable> {
        None
    }
}

/// OAuth2 flow capability, composable with [`Integration`].
///
/// The authorization-URL composition and code-exchange transport live here
/// as default methods; integrations override only the hooks that differ per
/// provider (fixed extra query params, or the whole exchange for mocks).
#[async_trait]
pub trait OAuth2Capable: Send + Sync {
    fn oauth2_api_root(&self) -> &'static str;
    fn authorization_endpoint(&self) -> &'static str;
    fn token_endpoint(&self) -> &'static str;

    /// Fixed query parameters this provider requires on every authorization
    /// request, merged into the composed URL ahead of caller extras.
    fn extra_auth_params(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Compose the authorization-request URL.
    fn auth_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        extra_query_params: &[(String, String)],
    ) -> AppResult<String> {
        let base = format!("{}{}", self.oauth2_api_root(), self.authorization_endpoint());
        let mut params: Vec<(String, String)> = vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), client_id.to_string()),
            ("redirect_uri".to_string(), redirect_uri.to_string()),
        ];
        params.extend(self.extra_auth_params());
        params.extend(extra_query_params.iter().cloned());

        let url = reqwest::Url::parse_with_params(&base, &params)
            .map_err(|e| AppError::IntegrationInvalid(format!("bad authorization URL: {}", e)))?;
        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access token.
    async fn exchange_code(
        &self,
        http: &reqwest::Client,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: &str,
    ) -> AppResult<OAuth2Token> {
        let url = format!("{}{}", self.oauth2_api_root(), self.token_endpoint());
        let auth = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", client_id, client_secret));

        let response = http
            .post(&url)
            .header("Accept", "application/json")
            .header("Authorization", format!("Basic {}", auth))
            .json(&serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await
            .map_err(|e| AppError::IntegrationError(format!("token request failed: {}", e)))?;

        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let data: serde_json::Value =
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            return Err(AppError::IntegrationError(format!(
                "failed to get access token: {}",
                upstream_error_detail(&data, &raw)
            )));
        }

        parse_token_response(&data)
    }

    /// Refresh an expired access token. Provider refresh contracts vary, so
    /// there is no generic transport: integrations that support refresh
    /// must override this.
    async fn refresh_access_token(
        &self,
        _http: &reqwest::Client,
        _client_id: &str,
        _client_secret: &str,
        _token: &OAuth2Token,
    ) -> AppResult<OAuth2Token> {
        Err(AppError::IntegrationError(
            "token refresh is not implemented for this integration".to_string(),
        ))
    }
}

/// Upstream error detail, preferring `error_description`, then `error`,
/// then the raw response body.
fn upstream_error_detail(data: &serde_json::Value, raw: &str) -> String {
    data.get("error_description")
        .and_then(serde_json::Value::as_str)
        .or_else(|| data.get("error").and_then(serde_json::Value::as_str))
        .unwrap_or(raw)
        .to_string()
}

/// Parse a successful token-endpoint response into an [`OAuth2Token`].
/// `expires_at` is computed from `expires_in` only when the provider sent it.
fn parse_token_response(data: &serde_json::Value) -> AppResult<OAuth2Token> {
    let access_token = data
        .get("access_token")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| {
            AppError::IntegrationError("token response missing access_token".to_string())
        })?
        .to_string();

    let expires_at = data
        .get("expires_in")
        .and_then(serde_json::Value::as_i64)
        .map(|seconds| Utc::now() + Duration::seconds(seconds));

    Ok(OAuth2Token {
        access_token,
        refresh_token: data
            .get("refresh_token")
            .and_then(serde_json::Value::as_str)
            .map(String::from),
        scope: data
            .get("scope")
            .and_then(serde_json::Value::as_str)
            .map(String::from),
        expires_at,
    })
}

/// Compile-time factory table mapping configuration identifiers to
/// integration definitions.
pub fn resolve(identifier: &str) -> Option<Arc<dyn Integration>> {
    match identifier {
        "notion" => Some(Arc::new(notion::Notion)),
        "mock_oauth2" => Some(Arc::new(mock_oauth2::MockOAuth2)),
        _ => None,
    }
}
