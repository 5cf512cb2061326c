// Door State API Library
// Decision: Shared library for the server binary and router tests

// API routes and types (shared for OpenAPI generation)
pub mod api;

// Environment configuration
pub mod config;
pub use config::{ConfigError, ServerConfig};

// Services layer
pub mod services;
pub use services::DoorService;

// Storage backend selection
pub mod storage;

// OpenAPI document
pub mod openapi;
pub use openapi::ApiDoc;

use axum::http::{header, HeaderValue, Method};
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// History backend in use: `postgres` or `memory`
    pub storage: String,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    storage: &'static str,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage.to_string(),
    })
}

/// Build the complete application router
///
/// `/health` and the OpenAPI routes are never prefixed; the door routes are
/// nested under `api_prefix` when it is non-empty.
pub fn build_app(service: Arc<DoorService>, api_prefix: &str, cors_origins: &[String]) -> Router {
    let health_state = HealthState {
        storage: service.backend(),
    };
    let door_state = api::door::AppState::new(service);

    let api_routes = Router::new()
        .merge(api::door::routes(door_state.clone()))
        .merge(api::stats::routes(door_state));

    // Build main router with health (not prefixed) and prefixed API routes
    let mut app = Router::new().route("/health", get(health).with_state(health_state));
    app = app.merge(build_router_with_prefix(api_routes, api_prefix));

    // Add Swagger UI
    let app =
        app.merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let cors_origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    // Add CORS layer only if origins are configured
    let app = if !cors_origins.is_empty() {
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
        )
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http())
}

/// Build router with optional API prefix (extracted for testing)
pub fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(api_prefix, api_routes)
    }
}

