//! API Integration Tests
//!
//! All tests run against the local rule-based recognizer.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use entrel_api::create_router_for_testing;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "entrel-test-boundary";

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Helper to build a multipart upload with a file and optional text fields
fn create_upload_request(file_name: &str, content: &[u8], fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/v1/extract/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["backend"], "local");
}

#[tokio::test]
async fn test_readiness_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/ready", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ready"], true);
    assert_eq!(json["backend"], "local");
}

#[tokio::test]
async fn test_metrics_counts_requests() {
    let app = create_router_for_testing();

    let response = app
        .clone()
        .oneshot(create_json_request("GET", "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(create_json_request("GET", "/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["total_requests"], 1);
    assert_eq!(json["endpoints"]["/health"]["requests"], 1);
    assert_eq!(json["endpoints"]["/health"]["status_counts"]["200"], 1);
}

#[tokio::test]
async fn test_openapi_spec() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request("GET", "/api-docs/openapi.json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/api/v1/extract"].is_object());
    assert!(json["paths"]["/api/v1/extract/upload"].is_object());
}

// =============================================================================
// Extraction Tests
// =============================================================================

#[tokio::test]
async fn test_extract_adjacent_entities() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/extract",
            Some(json!({ "content": "Alice met Bob." })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let entities = json["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["name"], "Alice");
    assert_eq!(entities[0]["type"], "PERSON");
    assert_eq!(entities[0]["start_token"], 0);
    assert_eq!(entities[0]["end_token"], 1);
    assert_eq!(entities[1]["name"], "Bob");

    let relationships = json["relationships"].as_array().unwrap();
    assert_eq!(relationships.len(), 1);
    assert_eq!(relationships[0]["source"], "Alice");
    assert_eq!(relationships[0]["target"], "Bob");
    assert_eq!(relationships[0]["relation"], "related_to");
    assert_eq!(relationships[0]["strength"], 1.0);
}

#[tokio::test]
async fn test_extract_no_cross_sentence_relationships() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/extract",
            Some(json!({ "content": "We saw Alice yesterday. Bob stayed home." })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["entities"].as_array().unwrap().len(), 2);
    assert!(json["relationships"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_extract_entity_type_filter() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/extract",
            Some(json!({
                "content": "Alice met Bob in Paris.",
                "entity_types": ["GPE"]
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let entities = json["entities"].as_array().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["name"], "Paris");
    assert_eq!(entities[0]["type"], "GPE");
    assert!(json["relationships"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_extract_threshold_filter() {
    let app = create_router_for_testing();

    // Alice-Bob and Bob-Paris score 1.0, Alice-Paris 1/3
    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/extract",
            Some(json!({
                "content": "Alice met Bob in Paris.",
                "relationship_threshold": 0.6
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let relationships = json["relationships"].as_array().unwrap();
    assert!(!relationships.is_empty());
    assert!(relationships
        .iter()
        .all(|r| r["strength"].as_f64().unwrap() >= 0.6));
}

#[tokio::test]
async fn test_extract_empty_content() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/extract",
            Some(json!({ "content": "   " })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_extract_invalid_threshold() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_json_request(
            "POST",
            "/api/v1/extract",
            Some(json!({
                "content": "Alice met Bob.",
                "relationship_threshold": 1.5
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Upload Tests
// =============================================================================

#[tokio::test]
async fn test_upload_text_file() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_upload_request(
            "meeting.txt",
            b"Alice met Bob.",
            &[("entity_types", "PERSON"), ("relationship_threshold", "0.5")],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["document"]["file_name"], "meeting.txt");
    assert_eq!(json["document"]["file_type"], "text");
    assert_eq!(json["document"]["word_count"], 3);
    assert_eq!(json["entities"].as_array().unwrap().len(), 2);
    assert_eq!(json["relationships"][0]["strength"], 1.0);
}

#[tokio::test]
async fn test_upload_markdown_title() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_upload_request(
            "notes.md",
            b"# Standup\n\nAlice met Bob.",
            &[],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["document"]["file_type"], "markdown");
    assert_eq!(json["document"]["title"], "Standup");
}

#[tokio::test]
async fn test_upload_unsupported_format() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_upload_request("report.docx", b"PK\x03\x04", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_empty_document() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(create_upload_request("blank.txt", b"  \n ", &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
