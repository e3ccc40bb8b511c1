//! # Hoard HTTP API Module
//!
//! The local REST API, served with axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /stats` - Record counts
//! - `GET|POST /locations`, `GET|PATCH|DELETE /locations/{id}`
//! - `GET|POST /items`, `GET|PATCH|DELETE /items/{id}`, `GET /items/unassigned`
//! - `GET /children/{id}?kind=` - Direct children
//! - `GET /path/{kind}/{id}` - Ancestor path
//! - `GET /totals/{kind}/{id}` - Child counts, quantity and value totals
//! - `GET /tags`, `POST /tags/rename`, `DELETE /tags/{name}`
//! - `GET /resolve/{label}` - Lookup by printed label
//! - `GET /search?q=` - Search
//! - `GET /export` - Archive download
//! - `POST /import/preview`, `POST /import` - Archive upload (raw body)
//!
//! DELETE on a record is always a cascade.
//!
//! ## Security Configuration
//!
//! - `cors_origins`: allowed origins, `["*"]` for all (default: localhost only)
//! - `api_key`: if set, requires Bearer token authentication
//! - `max_archive_bytes`: request body limit

mod auth;
mod handlers;
mod types;

pub use auth::keys_match;
pub use handlers::DIGEST_HEADER;
pub use types::{
    ApiError, ChildrenQuery, CreateItemRequest, CreateLocationRequest, EntityJson, ErrorResponse,
    HealthResponse, ItemJson, LocationJson, ParentJson, PhotoJson, RenameTagRequest,
    SearchQuery, TotalsResponse, UpdateItemRequest, UpdateLocationRequest,
};

use crate::config::HoardConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use hoard_core::{Catalog, HoardError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the one catalog, behind a reader/writer lock.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RwLock<Catalog>>,
}

impl AppState {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: all origins
/// - empty: localhost only
/// - otherwise: exactly the listed origins (invalid entries are skipped)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure outside a trusted network!");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(value)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION])
}

/// A restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .expose_headers([header::CONTENT_DISPOSITION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit - sized from `max_archive_bytes`
/// 4. Authentication - validates the API key (if configured)
pub fn create_router(state: AppState, config: &HoardConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/stats", get(handlers::stats_handler))
        .route(
            "/locations",
            get(handlers::list_locations_handler).post(handlers::create_location_handler),
        )
        .route(
            "/locations/{id}",
            get(handlers::get_location_handler)
                .patch(handlers::update_location_handler)
                .delete(handlers::delete_location_handler),
        )
        .route(
            "/items",
            get(handlers::list_items_handler).post(handlers::create_item_handler),
        )
        .route("/items/unassigned", get(handlers::unassigned_items_handler))
        .route(
            "/items/{id}",
            get(handlers::get_item_handler)
                .patch(handlers::update_item_handler)
                .delete(handlers::delete_item_handler),
        )
        .route("/children/{id}", get(handlers::children_handler))
        .route("/path/{kind}/{id}", get(handlers::path_handler))
        .route("/totals/{kind}/{id}", get(handlers::totals_handler))
        .route("/tags", get(handlers::tags_handler))
        .route("/tags/rename", post(handlers::rename_tag_handler))
        .route(
            "/tags/{name}",
            axum::routing::delete(handlers::delete_tag_handler),
        )
        .route("/resolve/{label}", get(handlers::resolve_handler))
        .route("/search", get(handlers::search_handler))
        .route("/export", get(handlers::export_handler))
        .route("/import/preview", post(handlers::preview_handler))
        .route("/import", post(handlers::import_handler));

    match config.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            router = router.layer(axum_middleware::from_fn_with_state(
                Arc::<str>::from(key),
                auth::api_key_auth_middleware,
            ));
        }
        None => {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are open to anyone who can reach \
                 the listener. Set api_key or HOARD_API_KEY to enable it."
            );
        }
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins))
                .layer(DefaultBodyLimit::max(config.max_archive_bytes)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind and serve until Ctrl+C.
pub async fn run_server(config: &HoardConfig, catalog: Catalog) -> Result<(), HoardError> {
    let addr = config.bind_address();
    let router = create_router(AppState::new(catalog), config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| HoardError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("Hoard HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| HoardError::Io(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
