//! entrel API - REST server
//!
//! Exposes the extraction pipeline over HTTP:
//! - `POST /api/v1/extract` for raw text
//! - `POST /api/v1/extract/upload` for PDF, text and Markdown files
//! - health, readiness and metrics probes
//! - OpenAPI documentation under `/swagger-ui`

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use entrel_core::config::ServerConfig;
use handlers::{extract, health};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "entrel API",
        description = "Entity recognition and sentence-level relationship inference"
    ),
    paths(
        health::health_check,
        health::readiness_check,
        health::metrics,
        extract::extract_handler,
        extract::upload_handler,
    ),
    components(schemas(
        error::ApiError,
        health::HealthResponse,
        health::ReadinessResponse,
        health::MetricsResponse,
        health::EndpointSummary,
        state::EndpointMetrics,
        state::LatencyBuckets,
        extract::ExtractRequest,
        extract::ExtractResponse,
        extract::EntityDto,
        extract::RelationshipDto,
        extract::DocumentInfo,
        extract::UploadExtractResponse,
        extract::UploadForm,
    )),
    tags(
        (name = "health", description = "Liveness, readiness and metrics"),
        (name = "extract", description = "Entity and relationship extraction")
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let cors = cors_layer(server);
    let body_limit = server.max_body_size;
    let timeout = Duration::from_secs(server.request_timeout_secs);

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .nest("/api/v1", routes::api_routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::metrics_middleware))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors {
        app = app.layer(cors);
    }

    app.with_state(state)
}

/// CORS layer from server settings; an empty origin list allows any origin
fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    if !server.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.is_empty() {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(layer.allow_origin(origins))
}

/// Router over the default configuration with the local recognizer
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    use entrel_core::AppConfig;
    use entrel_extractor::{ExtractionService, LocalRecognizer};

    let config = AppConfig::default();
    let service = ExtractionService::new(Arc::new(LocalRecognizer::new()), &config.extraction);
    create_router(Arc::new(AppState::with_service(config, service)))
}
