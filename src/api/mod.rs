pub mod chunks;
pub mod connections;
pub mod documents;
pub mod health;
pub mod integrations;
pub mod token;

use actix_web::web;

/// Configure all API routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Health endpoints
    cfg.route("/api/v1/health", web::get().to(health::health_check));
    cfg.route("/api/v1/health/db", web::get().to(health::health_db));
    cfg.route("/api/v1/health/vector-db", web::get().to(health::health_vector_db));
    cfg.route("/api/v1/status", web::get().to(health::status));

    // Token issuance (API-key gated)
    cfg.route("/api/v1/token", web::post().to(token::create_token));

    // Integrations catalog
    cfg.service(
        web::scope("/api/v1/integrations")
            .route("", web::get().to(integrations::list_integrations))
            .route("/{slug}", web::get().to(integrations::get_integration)),
    );

    // Connections
    cfg.service(
        web::scope("/api/v1/connections")
            .route("", web::post().to(connections::create_connection))
            .route("", web::get().to(connections::list_connections))
            .route("/{id}", web::get().to(connections::get_connection))
            .route("/{id}", web::put().to(connections::update_connection))
            .route("/{id}", web::delete().to(connections::delete_connection))
            .route("/{id}/authorize-url", web::get().to(connections::get_authorize_url))
            .route("/{id}/callback", web::post().to(connections::complete_oauth2))
            .route("/{id}/status", web::put().to(connections::set_status))
            .route("/{id}/sync", web::post().to(connections::sync_connection)),
    );

    // Documents
    cfg.service(
        web::scope("/api/v1/documents")
            .route("", web::post().to(documents::create_document))
            .route("", web::get().to(documents::list_documents))
            .route("/query", web::post().to(documents::query_documents))
            .route("/{id}", web::get().to(documents::get_document))
            .route("/{id}", web::delete().to(documents::delete_document)),
    );

    // Chunks
    cfg.service(
        web::scope("/api/v1/chunks")
            .route("", web::post().to(chunks::create_chunk))
            .route("", web::get().to(chunks::list_chunks))
            .route("/query", web::post().to(chunks::query_chunks))
            .route("/{id}", web::get().to(chunks::get_chunk))
            .route("/{id}", web::delete().to(chunks::delete_chunk)),
    );
}
