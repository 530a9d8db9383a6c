use crate::domain::integrations::registry::IntegrationRegistry;
use crate::domain::integrations::{OAuth2Capable, OAuth2ConnectionConfig, OAuth2InstanceConfig};
use crate::domain::models::{Connection, ConnectionStatus};
use crate::error::{AppError, AppResult};
use crate::storage::Storage;
use std::sync::Arc;
use uuid::Uuid;

/// Tenant-scoped connection lifecycle manager.
///
/// Resolves integrations through the registry and validates connection
/// config against the integration's connection model. Registry and
/// validation failures propagate with their own kind; they are never
/// reinterpreted here.
pub struct ConnectionService {
    storage: Arc<dyn Storage>,
    registry: Arc<IntegrationRegistry>,
    http: reqwest::Client,
    tenant_id: String,
    tenant_user_id: String,
}

impl ConnectionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<IntegrationRegistry>,
        http: reqwest::Client,
        tenant_id: String,
        tenant_user_id: String,
    ) -> Self {
        Self {
            storage,
            registry,
            http,
            tenant_id,
            tenant_user_id,
        }
    }

    /// Create a connection to an integration.
    ///
    /// OAuth2 integrations get their row before any credentials exist: the
    /// config stays empty and the status PENDING until the authorization
    /// callback completes the flow. Non-OAuth2 config is validated up front.
    pub async fn create(
        &self,
        integration_slug: &str,
        config: Option<serde_json::Value>,
    ) -> AppResult<Connection> {
        let integration = self.registry.get(integration_slug)?;

        let mut connection = Connection::new(
            integration_slug.to_string(),
            self.tenant_id.clone(),
            self.tenant_user_id.clone(),
        );

        if integration.oauth2().is_some() {
            // credentials arrive later through the authorization-code callback
        } else if let Some(config) = config {
            if !integration.validate_connection(&config) {
                return Err(AppError::ConnectionInvalid(format!(
                    "config does not match the '{}' connection model",
                    integration_slug
                )));
            }
            connection.config = config;
        }

        let inserted = self.storage.insert_connection(connection).await?;
        self.storage
            .get_connection(inserted.id, &self.tenant_id, &self.tenant_user_id)
            .await?
            .ok_or_else(|| {
                AppError::ConnectionCreationFailed(
                    "connection row missing after insert".to_string(),
                )
            })
    }

    pub async fn find_one(&self, id: Uuid) -> AppResult<Connection> {
        self.storage
            .get_connection(id, &self.tenant_id, &self.tenant_user_id)
            .await?
            .ok_or_else(|| AppError::ConnectionNotFound(id.to_string()))
    }

    pub async fn find_all(&self) -> AppResult<Vec<Connection>> {
        self.storage
            .list_connections(&self.tenant_id, &self.tenant_user_id)
            .await
    }

    /// Replace the connection's config, revalidated against the connection
    /// model of its stored integration slug. Status is untouched.
    pub async fn update(&self, id: Uuid, new_config: serde_json::Value) -> AppResult<Connection> {
        let mut connection = self.find_one(id).await?;

        let integration = self.registry.get(&connection.integration)?;
        if !integration.validate_connection(&new_config) {
            return Err(AppError::ConnectionInvalid(format!(
                "config does not match the '{}' connection model",
                connection.integration
            )));
        }

        connection.config = new_config;
        self.storage.update_connection(connection).await
    }

    /// Explicit status transition.
    pub async fn set_status(&self, id: Uuid, status: ConnectionStatus) -> AppResult<Connection> {
        let mut connection = self.find_one(id).await?;
        connection.status = status;
        self.storage.update_connection(connection).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let deleted = self
            .storage
            .delete_connection(id, &self.tenant_id, &self.tenant_user_id)
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(AppError::ConnectionNotFound(id.to_string()))
        }
    }

    /// Provider authorization URL for a connection awaiting OAuth2 consent.
    pub async fn authorize_url(&self, id: Uuid, redirect_uri: &str) -> AppResult<String> {
        let connection = self.find_one(id).await?;
        let integration = self.registry.get(&connection.integration)?;
        let oauth2 = require_oauth2(integration.as_ref(), &connection.integration)?;
        let credentials = self.instance_credentials(&connection.integration)?;

        oauth2.auth_url(&credentials.client_id, redirect_uri, &[])
    }

    /// Complete the OAuth2 flow: exchange the authorization code, store the
    /// resulting credentials as the connection config, and transition
    /// PENDING -> CONNECTED.
    pub async fn complete_oauth2(
        &self,
        id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> AppResult<Connection> {
        let mut connection = self.find_one(id).await?;
        let integration = self.registry.get(&connection.integration)?;
        let oauth2 = require_oauth2(integration.as_ref(), &connection.integration)?;
        let credentials = self.instance_credentials(&connection.integration)?;

        let token = oauth2
            .exchange_code(
                &self.http,
                &credentials.client_id,
                &credentials.client_secret,
                code,
                redirect_uri,
            )
            .await?;

        // persist only the connection-model fields of the token record
        connection.config = serde_json::to_value(OAuth2ConnectionConfig {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
        })?;
        connection.status = ConnectionStatus::Connected;
        self.storage.update_connection(connection).await
    }

    fn instance_credentials(&self, slug: &str) -> AppResult<OAuth2InstanceConfig> {
        let config = self.registry.instance_config(slug)?.ok_or_else(|| {
            AppError::IntegrationInvalid(format!(
                "integration '{}' has no configured client credentials",
                slug
            ))
        })?;
        serde_json::from_value(config).map_err(|e| {
            AppError::IntegrationInvalid(format!("integration '{}' credentials: {}", slug, e))
        })
    }
}

fn require_oauth2<'a>(
    integration: &'a (dyn crate::domain::integrations::Integration),
    slug: &str,
) -> AppResult<&'a dyn OAuth2Capable> {
    integration.oauth2().ok_or_else(|| {
        AppError::ConnectionInvalid(format!("'{}' is not an OAuth2 integration", slug))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::integrations::{DocumentPull, Integration};
    use crate::domain::models::Connection as ConnectionRow;
    use crate::storage::memory::InMemoryStorage;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    /// Non-OAuth2 integration with an api_key connection model.
    struct ApiKeySource;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct ApiKeyConnection {
        #[allow(dead_code)]
        api_key: String,
    }

    #[async_trait]
    impl Integration for ApiKeySource {
        fn name(&self) -> &'static str {
            "API Key Source"
        }

        fn default_slug(&self) -> &'static str {
            "api_key_source"
        }

        fn validate_config(&self, _config: &serde_json::Value) -> AppResult<()> {
            Ok(())
        }

        fn validate_connection(&self, config: &serde_json::Value) -> bool {
            serde_json::from_value::<ApiKeyConnection>(config.clone()).is_ok()
        }

        async fn get_all_documents(
            &self,
            _http: &reqwest::Client,
            _connection: &ConnectionRow,
        ) -> AppResult<DocumentPull> {
            Ok(DocumentPull::default())
        }
    }

    fn registry_with_mock() -> Arc<IntegrationRegistry> {
        let mut settings = BTreeMap::new();
        settings.insert(
            "mock_oauth2".to_string(),
            vec![serde_json::json!({"client_id": "cid", "client_secret": "sec"})],
        );
        Arc::new(IntegrationRegistry::from_settings(&settings).unwrap())
    }

    fn service(
        storage: Arc<dyn Storage>,
        registry: Arc<IntegrationRegistry>,
        tenant_id: &str,
        tenant_user_id: &str,
    ) -> ConnectionService {
        ConnectionService::new(
            storage,
            registry,
            reqwest::Client::new(),
            tenant_id.to_string(),
            tenant_user_id.to_string(),
        )
    }

    #[tokio::test]
    async fn oauth2_create_is_pending_with_empty_config() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");

        let connection = service.create("mock_oauth2", None).await.unwrap();
        assert_eq!(connection.status, ConnectionStatus::Pending);
        assert_eq!(connection.config, serde_json::json!({}));
        assert_eq!(connection.integration, "mock_oauth2");
    }

    #[tokio::test]
    async fn create_unknown_integration_fails() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");

        let result = service.create("nonexistent", None).await;
        assert!(matches!(result, Err(AppError::IntegrationNotFound(_))));
    }

    #[tokio::test]
    async fn non_oauth2_create_validates_config() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let registry = Arc::new(IntegrationRegistry::new());
        registry.add(Arc::new(ApiKeySource), None).unwrap();
        let service = service(Arc::clone(&storage), registry, "t1", "u1");

        let result = service
            .create(
                "api_key_source",
                Some(serde_json::json!({"wrong_field": "x"})),
            )
            .await;
        assert!(matches!(result, Err(AppError::ConnectionInvalid(_))));
        // nothing persisted on rejection
        assert!(storage.list_connections("t1", "u1").await.unwrap().is_empty());

        let connection = service
            .create("api_key_source", Some(serde_json::json!({"api_key": "k"})))
            .await
            .unwrap();
        assert_eq!(connection.config, serde_json::json!({"api_key": "k"}));
    }

    #[tokio::test]
    async fn tenant_isolation_reads_as_not_found() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let registry = registry_with_mock();

        let owner = service(Arc::clone(&storage), Arc::clone(&registry), "t1", "u1");
        let connection = owner.create("mock_oauth2", None).await.unwrap();

        // same user id under a different tenant
        let foreign_tenant = service(Arc::clone(&storage), Arc::clone(&registry), "t2", "u1");
        assert!(matches!(
            foreign_tenant.find_one(connection.id).await,
            Err(AppError::ConnectionNotFound(_))
        ));
        assert!(matches!(
            foreign_tenant
                .update(connection.id, serde_json::json!({"access_token": "x"}))
                .await,
            Err(AppError::ConnectionNotFound(_))
        ));
        assert!(matches!(
            foreign_tenant.delete(connection.id).await,
            Err(AppError::ConnectionNotFound(_))
        ));

        // same tenant, different user
        let foreign_user = service(Arc::clone(&storage), Arc::clone(&registry), "t1", "u2");
        assert!(matches!(
            foreign_user.find_one(connection.id).await,
            Err(AppError::ConnectionNotFound(_))
        ));

        // the owner still sees it
        let found = owner.find_one(connection.id).await.unwrap();
        assert_eq!(found.id, connection.id);
    }

    #[tokio::test]
    async fn find_all_is_tenant_scoped() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let registry = registry_with_mock();

        let owner = service(Arc::clone(&storage), Arc::clone(&registry), "t1", "u1");
        owner.create("mock_oauth2", None).await.unwrap();
        owner.create("mock_oauth2", None).await.unwrap();

        let foreign = service(Arc::clone(&storage), Arc::clone(&registry), "t2", "u1");
        foreign.create("mock_oauth2", None).await.unwrap();

        assert_eq!(owner.find_all().await.unwrap().len(), 2);
        assert_eq!(foreign.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_revalidates_against_connection_model() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");
        let connection = service.create("mock_oauth2", None).await.unwrap();

        let result = service
            .update(connection.id, serde_json::json!({"missing_access_token": "x"}))
            .await;
        assert!(matches!(result, Err(AppError::ConnectionInvalid(_))));

        let updated = service
            .update(
                connection.id,
                serde_json::json!({"access_token": "xyz", "refresh_token": "uvw"}),
            )
            .await
            .unwrap();
        assert_eq!(
            updated.config,
            serde_json::json!({"access_token": "xyz", "refresh_token": "uvw"})
        );
        // config replacement never transitions status
        assert_eq!(updated.status, ConnectionStatus::Pending);
    }

    #[tokio::test]
    async fn delete_then_delete_again_is_not_found() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");
        let connection = service.create("mock_oauth2", None).await.unwrap();

        service.delete(connection.id).await.unwrap();
        assert!(matches!(
            service.delete(connection.id).await,
            Err(AppError::ConnectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn complete_oauth2_stores_token_and_connects() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");
        let connection = service.create("mock_oauth2", None).await.unwrap();

        let completed = service
            .complete_oauth2(connection.id, "auth-code", "https://cb")
            .await
            .unwrap();

        assert_eq!(completed.status, ConnectionStatus::Connected);
        assert_eq!(
            completed.config,
            serde_json::json!({
                "access_token": "mock-access-token",
                "refresh_token": "mock-refresh-token",
            })
        );
    }

    #[tokio::test]
    async fn complete_oauth2_without_instance_credentials_fails() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        // registered directly, so no instance config block is attached
        let registry = Arc::new(IntegrationRegistry::new());
        registry
            .add(
                Arc::new(crate::domain::integrations::mock_oauth2::MockOAuth2),
                None,
            )
            .unwrap();
        let service = service(storage, registry, "t1", "u1");
        let connection = service.create("mock_oauth2", None).await.unwrap();

        let result = service
            .complete_oauth2(connection.id, "auth-code", "https://cb")
            .await;
        assert!(matches!(result, Err(AppError::IntegrationInvalid(_))));
    }

    #[tokio::test]
    async fn authorize_url_uses_instance_credentials() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");
        let connection = service.create("mock_oauth2", None).await.unwrap();

        let url = service
            .authorize_url(connection.id, "https://cb")
            .await
            .unwrap();
        assert!(url.starts_with("https://mock-integration.com/authorize?"));
        assert!(url.contains("client_id=cid"));
    }

    #[tokio::test]
    async fn set_status_transitions_explicitly() {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let service = service(storage, registry_with_mock(), "t1", "u1");
        let connection = service.create("mock_oauth2", None).await.unwrap();

        let updated = service
            .set_status(connection.id, ConnectionStatus::Disconnected)
            .await
            .unwrap();
        assert_eq!(updated.status, ConnectionStatus::Disconnected);
    }
}
