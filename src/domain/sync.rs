use crate::domain::documents::DocumentService;
use crate::domain::integrations::registry::IntegrationRegistry;
use crate::domain::models::{Connection, ConnectionStatus};
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of pulling a connection's documents into the store.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub documents_created: usize,
    pub records_skipped: usize,
}

/// Pull orchestrator: resolves a connection's integration, pulls every
/// document it can see, and ingests each blob through the document
/// pipeline.
pub struct SyncOrchestrator {
    registry: Arc<IntegrationRegistry>,
    http: reqwest::Client,
}

impl SyncOrchestrator {
    pub fn new(registry: Arc<IntegrationRegistry>, http: reqwest::Client) -> Self {
        Self { registry, http }
    }

    pub async fn sync_connection(
        &self,
        connection: &Connection,
        documents: &DocumentService,
    ) -> AppResult<SyncReport> {
        if connection.status != ConnectionStatus::Connected {
            return Err(AppError::ConnectionInvalid(format!(
                "connection {} is {}, not CONNECTED",
                connection.id, connection.status
            )));
        }

        let integration = self.registry.get(&connection.integration)?;
        let pull = integration.get_all_documents(&self.http, connection).await?;

        for reason in &pull.skipped {
            warn!("connection {}: skipped record: {}", connection.id, reason);
        }

        let mut created = 0;
        for blob in pull.documents {
            documents.create(None, blob).await?;
            created += 1;
        }

        info!(
            "Synced connection {}: {} documents, {} skipped",
            connection.id,
            created,
            pull.skipped.len()
        );
        Ok(SyncReport {
            documents_created: created,
            records_skipped: pull.skipped.len(),
        })
    }
}
