use crate::config::IntegrationSettings;
use crate::domain::integrations::{self, Integration};
use crate::error::{AppError, AppResult};
use std::sync::{Arc, RwLock};

struct RegistryEntry {
    slug: String,
    integration: Arc<dyn Integration>,
    /// Validated instance config block (client credentials) for entries
    /// built from settings. Entries registered directly carry none.
    config: Option<serde_json::Value>,
}

/// Process-wide catalog mapping slugs to integration definitions.
///
/// Insertion-ordered; slugs are unique. Built at startup (from settings or
/// the built-in defaults) and shared read-mostly; each registration call is
/// atomic with respect to the underlying map.
pub struct IntegrationRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Registry with the built-in integration set.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        // with_defaults only registers known-valid builtins
        let _ = registry.upsert(Arc::new(integrations::notion::Notion));
        registry
    }

    /// Strict registration: refuses duplicate slugs and invalid definitions.
    pub fn add(&self, integration: Arc<dyn Integration>, slug: Option<&str>) -> AppResult<()> {
        self.add_with_config(integration, slug, None)
    }

    fn add_with_config(
        &self,
        integration: Arc<dyn Integration>,
        slug: Option<&str>,
        config: Option<serde_json::Value>,
    ) -> AppResult<()> {
        let effective = slug.unwrap_or_else(|| integration.default_slug()).to_string();

        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;

        if entries.iter().any(|e| e.slug == effective) {
            return Err(AppError::IntegrationAlreadyExists(effective));
        }
        if !integration.validate_class_attrs() {
            return Err(AppError::IntegrationInvalid(format!(
                "integration '{}' fails class attribute validation",
                effective
            )));
        }

        entries.push(RegistryEntry {
            slug: effective,
            integration,
            config,
        });
        Ok(())
    }

    /// Permissive upsert: overwrites any existing entry for the default
    /// slug. Still refuses definitions that fail class attribute checks.
    pub fn upsert(&self, integration: Arc<dyn Integration>) -> AppResult<()> {
        if !integration.validate_class_attrs() {
            return Err(AppError::IntegrationInvalid(format!(
                "integration '{}' fails class attribute validation",
                integration.default_slug()
            )));
        }

        let slug = integration.default_slug().to_string();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;

        if let Some(existing) = entries.iter_mut().find(|e| e.slug == slug) {
            existing.integration = integration;
            existing.config = None;
        } else {
            entries.push(RegistryEntry {
                slug,
                integration,
                config: None,
            });
        }
        Ok(())
    }

    pub fn get(&self, slug: &str) -> AppResult<Arc<dyn Integration>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        entries
            .iter()
            .find(|e| e.slug == slug)
            .map(|e| Arc::clone(&e.integration))
            .ok_or_else(|| AppError::IntegrationNotFound(slug.to_string()))
    }

    /// Instance config stored with the entry, if it was built from settings.
    pub fn instance_config(&self, slug: &str) -> AppResult<Option<serde_json::Value>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        entries
            .iter()
            .find(|e| e.slug == slug)
            .map(|e| e.config.clone())
            .ok_or_else(|| AppError::IntegrationNotFound(slug.to_string()))
    }

    /// All registered definitions, in insertion order.
    pub fn get_all(&self) -> Vec<(String, Arc<dyn Integration>)> {
        self.entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.slug.clone(), Arc::clone(&e.integration)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Registered slugs, in insertion order.
    pub fn get_slugs(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.iter().map(|e| e.slug.clone()).collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a registry from configuration.
    ///
    /// Each identifier resolves through the compile-time factory table; each
    /// block is validated against the integration's config model and may
    /// carry an explicit `slug`. A second block for the same identifier must
    /// supply a distinct slug or registration fails on the duplicate.
    pub fn from_settings(settings: &IntegrationSettings) -> AppResult<Self> {
        let registry = Self::new();

        for (identifier, blocks) in settings {
            let integration = integrations::resolve(identifier)
                .ok_or_else(|| AppError::IntegrationNotFound(identifier.clone()))?;

            for block in blocks {
                let Some(object) = block.as_object() else {
                    return Err(AppError::ConnectionInvalid(format!(
                        "config block for '{}' is not an object",
                        identifier
                    )));
                };

                let mut object = object.clone();
                let explicit_slug = match object.remove("slug") {
                    Some(serde_json::Value::String(slug)) => Some(slug),
                    Some(_) => {
                        return Err(AppError::ConnectionInvalid(format!(
                            "slug for '{}' must be a string",
                            identifier
                        )))
                    }
                    None => None,
                };

                // several instances of one integration type can only be told
                // apart by slug, so every block in a multi-block list must
                // name its own
                if blocks.len() > 1 && explicit_slug.is_none() {
                    return Err(AppError::IntegrationAlreadyExists(
                        integration.default_slug().to_string(),
                    ));
                }

                let config = serde_json::Value::Object(object);
                integration.validate_config(&config)?;

                registry.add_with_config(
                    Arc::clone(&integration),
                    explicit_slug.as_deref(),
                    Some(config),
                )?;
            }
        }

        Ok(registry)
    }
}

impl Default for IntegrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::integrations::mock_oauth2::MockOAuth2;
    use crate::domain::integrations::{DocumentPull, Integration};
    use crate::domain::models::Connection;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    fn mock() -> Arc<dyn Integration> {
        Arc::new(MockOAuth2)
    }

    struct NamelessIntegration;

    #[async_trait]
    impl Integration for NamelessIntegration {
        fn name(&self) -> &'static str {
            ""
        }

        fn default_slug(&self) -> &'static str {
            "nameless"
        }

        fn validate_config(&self, _config: &serde_json::Value) -> AppResult<()> {
            Ok(())
        }

        fn validate_connection(&self, _config: &serde_json::Value) -> bool {
            true
        }

        async fn get_all_documents(
            &self,
            _http: &reqwest::Client,
            _connection: &Connection,
        ) -> AppResult<DocumentPull> {
            Ok(DocumentPull::default())
        }
    }

    fn mock_settings(blocks: Vec<serde_json::Value>) -> IntegrationSettings {
        let mut settings = BTreeMap::new();
        settings.insert("mock_oauth2".to_string(), blocks);
        settings
    }

    #[test]
    fn empty_on_init() {
        let registry = IntegrationRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn add_uses_default_slug() {
        let registry = IntegrationRegistry::new();
        registry.add(mock(), None).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("mock_oauth2").is_ok());
        assert_eq!(registry.get_slugs(), vec!["mock_oauth2"]);
    }

    #[test]
    fn add_with_custom_slug() {
        let registry = IntegrationRegistry::new();
        registry.add(mock(), Some("custom")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.get("custom").is_ok());
        assert!(matches!(
            registry.get("mock_oauth2"),
            Err(AppError::IntegrationNotFound(_))
        ));
    }

    #[test]
    fn add_duplicate_slug_fails() {
        let registry = IntegrationRegistry::new();
        registry.add(mock(), None).unwrap();

        let result = registry.add(mock(), None);
        assert!(matches!(result, Err(AppError::IntegrationAlreadyExists(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn add_invalid_definition_fails() {
        let registry = IntegrationRegistry::new();
        let result = registry.add(Arc::new(NamelessIntegration), None);
        assert!(matches!(result, Err(AppError::IntegrationInvalid(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn get_missing_fails() {
        let registry = IntegrationRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(AppError::IntegrationNotFound(_))
        ));
    }

    #[test]
    fn get_all_preserves_insertion_order() {
        let registry = IntegrationRegistry::new();
        registry.add(mock(), Some("b")).unwrap();
        registry.add(mock(), Some("a")).unwrap();

        let slugs: Vec<String> = registry.get_all().into_iter().map(|(s, _)| s).collect();
        assert_eq!(slugs, vec!["b", "a"]);
        assert!(IntegrationRegistry::new().get_all().is_empty());
    }

    #[test]
    fn upsert_overwrites_without_error() {
        let registry = IntegrationRegistry::new();
        registry.upsert(mock()).unwrap();
        registry.upsert(mock()).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_slugs(), vec!["mock_oauth2"]);
    }

    #[test]
    fn upsert_rejects_invalid_definition() {
        let registry = IntegrationRegistry::new();
        let result = registry.upsert(Arc::new(NamelessIntegration));
        assert!(matches!(result, Err(AppError::IntegrationInvalid(_))));
    }

    #[test]
    fn clear_empties_registry() {
        let registry = IntegrationRegistry::new();
        registry.add(mock(), None).unwrap();
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn from_settings_registers_configured_instance() {
        let settings = mock_settings(vec![serde_json::json!({
            "client_id": "abc",
            "client_secret": "def",
        })]);

        let registry = IntegrationRegistry::from_settings(&settings).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("mock_oauth2").is_ok());
        let config = registry.instance_config("mock_oauth2").unwrap().unwrap();
        assert_eq!(
            config.get("client_id").and_then(serde_json::Value::as_str),
            Some("abc")
        );
    }

    #[test]
    fn from_settings_empty() {
        let registry = IntegrationRegistry::from_settings(&BTreeMap::new()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn from_settings_unknown_identifier_fails() {
        let mut settings = BTreeMap::new();
        settings.insert(
            "unheard_of".to_string(),
            vec![serde_json::json!({"client_id": "a", "client_secret": "b"})],
        );

        let result = IntegrationRegistry::from_settings(&settings);
        assert!(matches!(result, Err(AppError::IntegrationNotFound(_))));
    }

    #[test]
    fn from_settings_invalid_block_fails() {
        let settings = mock_settings(vec![serde_json::json!({"client_id": "abc"})]);
        let result = IntegrationRegistry::from_settings(&settings);
        assert!(matches!(result, Err(AppError::ConnectionInvalid(_))));
    }

    #[test]
    fn from_settings_multiple_blocks_require_distinct_slugs() {
        let settings = mock_settings(vec![
            serde_json::json!({"client_id": "abc", "client_secret": "def"}),
            serde_json::json!({"client_id": "ghi", "client_secret": "jkl"}),
        ]);

        let result = IntegrationRegistry::from_settings(&settings);
        assert!(matches!(result, Err(AppError::IntegrationAlreadyExists(_))));
    }

    #[test]
    fn from_settings_slugless_block_among_several_fails() {
        // only the second block names a slug; the first would land on the
        // ambiguous default
        let settings = mock_settings(vec![
            serde_json::json!({"client_id": "abc", "client_secret": "def"}),
            serde_json::json!({"slug": "mock2", "client_id": "ghi", "client_secret": "jkl"}),
        ]);

        let result = IntegrationRegistry::from_settings(&settings);
        assert!(matches!(result, Err(AppError::IntegrationAlreadyExists(_))));
    }

    #[test]
    fn from_settings_multiple_blocks_with_slugs() {
        let settings = mock_settings(vec![
            serde_json::json!({"slug": "mock1", "client_id": "abc", "client_secret": "def"}),
            serde_json::json!({"slug": "mock2", "client_id": "ghi", "client_secret": "jkl"}),
        ]);

        let registry = IntegrationRegistry::from_settings(&settings).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_slugs(), vec!["mock1", "mock2"]);
        // both slugs resolve to the same underlying definition
        assert_eq!(registry.get("mock1").unwrap().name(), "Mock OAuth2");
        assert_eq!(registry.get("mock2").unwrap().name(), "Mock OAuth2");
        let config = registry.instance_config("mock2").unwrap().unwrap();
        assert_eq!(
            config.get("client_id").and_then(serde_json::Value::as_str),
            Some("ghi")
        );
    }

    #[test]
    fn with_defaults_registers_notion() {
        let registry = IntegrationRegistry::with_defaults();
        assert!(registry.get("notion").is_ok());
    }
}
