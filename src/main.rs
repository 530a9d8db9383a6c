mod api;
mod clients;
mod config;
mod domain;
mod error;
mod middleware;
mod storage;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use clients::{Embedder, FakeEmbedder, InMemoryVectorStore, OpenAiEmbedder, QdrantVectorStore, VectorStore};
use config::Config;
use domain::integrations::registry::IntegrationRegistry;
use storage::memory::InMemoryStorage;
use storage::Storage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub registry: Arc<IntegrationRegistry>,
    pub embedder: Arc<dyn Embedder>,
    pub vectors: Arc<dyn VectorStore>,
    pub http: reqwest::Client,
    pub started_at: Instant,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memory_service=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    let port = config.port;

    info!("Starting memory-service on port {}", port);
    info!("Vector store URL: {}", config.qdrant_url);

    // Build the integration registry: from the settings file when one is
    // configured, otherwise the built-in defaults
    let registry = match config.load_integration_settings() {
        Ok(Some(settings)) => match IntegrationRegistry::from_settings(&settings) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                warn!("Failed to build registry from settings: {}", e);
                Arc::new(IntegrationRegistry::with_defaults())
            }
        },
        Ok(None) => Arc::new(IntegrationRegistry::with_defaults()),
        Err(e) => {
            warn!("Failed to load integrations config: {}", e);
            Arc::new(IntegrationRegistry::with_defaults())
        }
    };
    info!("Registered integrations: {:?}", registry.get_slugs());

    // Initialize collaborators
    let embedder: Arc<dyn Embedder> = match &config.openai_api_key {
        Some(api_key) => Arc::new(OpenAiEmbedder::new(api_key.clone())),
        None => {
            warn!("OPENAI_API_KEY not set, using fake embeddings");
            Arc::new(FakeEmbedder)
        }
    };
    let vectors: Arc<dyn VectorStore> = if config.openai_api_key.is_some() {
        Arc::new(QdrantVectorStore::new(
            config.qdrant_url.clone(),
            config.qdrant_collection_name.clone(),
        ))
    } else {
        warn!("Using in-memory vector store");
        Arc::new(InMemoryVectorStore::new())
    };

    if let Err(e) = vectors.ensure_collection().await {
        warn!("Vector collection setup failed: {}", e);
    }

    // Initialize storage
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());

    // Create app state
    let app_state = web::Data::new(AppState {
        config: config.clone(),
        storage: Arc::clone(&storage),
        registry: Arc::clone(&registry),
        embedder: Arc::clone(&embedder),
        vectors: Arc::clone(&vectors),
        http: clients::http_client(),
        started_at: Instant::now(),
    });

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::HeaderName::from_static("x-api-key"),
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(api::configure_routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
