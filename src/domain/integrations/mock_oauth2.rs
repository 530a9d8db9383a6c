use crate::domain::integrations::{
    DocumentPull, Integration, OAuth2Capable, OAuth2ConnectionConfig, OAuth2InstanceConfig,
    OAuth2Token,
};
use crate::domain::models::Connection;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;

/// Mock OAuth2 integration. Exchanges nothing over the network; used by
/// tests and local development configurations.
pub struct MockOAuth2;

#[async_trait]
impl Integration for MockOAuth2 {
    fn name(&self) -> &'static str {
        "Mock OAuth2"
    }

    fn default_slug(&self) -> &'static str {
        "mock_oauth2"
    }

    fn logo_url(&self) -> Option<&'static str> {
        Some("https://placekitten.com/g/400/400")
    }

    fn validate_config(&self, config: &serde_json::Value) -> AppResult<()> {
        serde_json::from_value::<OAuth2InstanceConfig>(config.clone())
            .map(|_| ())
            .map_err(|e| AppError::ConnectionInvalid(format!("mock_oauth2 config: {}", e)))
    }

    fn validate_connection(&self, config: &serde_json::Value) -> bool {
        serde_json::from_value::<OAuth2ConnectionConfig>(config.clone()).is_ok()
    }

    async fn get_all_documents(
        &self,
        _http: &reqwest::Client,
        _connection: &Connection,
    ) -> AppResult<DocumentPull> {
        Ok(DocumentPull {
            documents: vec![
                "Document 1".to_string(),
                "Document 2".to_string(),
                "Document 3".to_string(),
            ],
            skipped: Vec::new(),
        })
    }

    fn oauth2(&self) -> Option<&dyn OAuth2Capable> {
        Some(self)
    }
}

#[async_trait]
impl OAuth2Capable for MockOAuth2 {
    fn oauth2_api_root(&self) -> &'static str {
        "https://mock-integration.com"
    }

    fn authorization_endpoint(&self) -> &'static str {
        "/authorize"
    }

    fn token_endpoint(&self) -> &'static str {
        "/token"
    }

    async fn exchange_code(
        &self,
        _http: &reqwest::Client,
        _client_id: &str,
        _client_secret: &str,
        _code: &str,
        _redirect_uri: &str,
    ) -> AppResult<OAuth2Token> {
        Ok(OAuth2Token {
            access_token: "mock-access-token".to_string(),
            refresh_token: Some("mock-refresh-token".to_string()),
            scope: None,
            expires_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_model_is_closed() {
        let integration = MockOAuth2;

        assert!(integration.validate_connection(&serde_json::json!({
            "access_token": "abc",
            "refresh_token": "def",
        })));
        assert!(integration.validate_connection(&serde_json::json!({
            "access_token": "abc",
        })));
        // unknown field
        assert!(!integration.validate_connection(&serde_json::json!({
            "access_token": "abc",
            "shoe_size": 42,
        })));
        // missing required field
        assert!(!integration.validate_connection(&serde_json::json!({
            "refresh_token": "def",
        })));
        // wrong type
        assert!(!integration.validate_connection(&serde_json::json!({
            "access_token": 123,
        })));
    }

    #[test]
    fn config_model_requires_client_credentials() {
        let integration = MockOAuth2;

        assert!(integration
            .validate_config(&serde_json::json!({
                "client_id": "abc",
                "client_secret": "def",
            }))
            .is_ok());
        assert!(integration
            .validate_config(&serde_json::json!({"client_id": "abc"}))
            .is_err());
        assert!(integration
            .validate_config(&serde_json::json!({
                "client_id": "abc",
                "client_secret": "def",
                "extra": true,
            }))
            .is_err());
    }

    #[tokio::test]
    async fn exchange_returns_canned_token() {
        let token = MockOAuth2
            .exchange_code(&reqwest::Client::new(), "cid", "secret", "code", "https://cb")
            .await
            .unwrap();
        assert_eq!(token.access_token, "mock-access-token");
        assert_eq!(token.refresh_token.as_deref(), Some("mock-refresh-token"));
    }
}
