//! Route configuration for the Scribe API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{
    create_document, create_template, delete_document, delete_template, dismiss_alert,
    export_document, get_alert, get_document, get_template, health_check, list_alerts,
    list_documents, list_pending_alerts, list_templates, preview_alert, preview_template,
    process_alert, receive_webhook, update_document, update_template, upload_template,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(state.config());

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Alert intake and queue
        .route("/webhook", post(receive_webhook))
        .route("/alerts", get(list_alerts))
        .route("/alerts/pending", get(list_pending_alerts))
        .route("/alerts/{id}", get(get_alert).delete(dismiss_alert))
        .route("/alerts/{id}/process", post(process_alert))
        .route("/alerts/{id}/preview", post(preview_alert))
        // Templates
        .route("/templates", get(list_templates).post(create_template))
        .route("/templates/upload", post(upload_template))
        .route(
            "/templates/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/templates/{id}/preview", post(preview_template))
        // Documents
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/{id}",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/documents/{id}/export", get(export_document));

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
