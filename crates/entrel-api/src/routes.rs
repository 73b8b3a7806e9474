//! API route definitions

use crate::handlers::extract;
use crate::state::AppState;
use axum::{routing::post, Router};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/extract", post(extract::extract_handler))
        .route("/extract/upload", post(extract::upload_handler))
}
