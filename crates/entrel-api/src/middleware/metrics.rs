//! Metrics tracking middleware
//!
//! Tracks request latency, counts, and status codes per route

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
///
/// Installed as a route layer so only matched routes are recorded, keyed by
/// their route template.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = endpoint_key(
        request.extensions().get::<MatchedPath>().map(MatchedPath::as_str),
        request.uri().path(),
    );

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}

/// Metrics key for a request, preferring the route template
fn endpoint_key(matched: Option<&str>, path: &str) -> String {
    let key = matched.unwrap_or(path);
    match key.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_key() {
        assert_eq!(
            endpoint_key(Some("/api/v1/extract"), "/api/v1/extract"),
            "/api/v1/extract"
        );
        assert_eq!(endpoint_key(None, "/health/"), "/health");
        assert_eq!(endpoint_key(None, "/"), "/");
    }
}
