//! Entity and relationship extraction handlers

use crate::error::{ApiError, AppError};
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use entrel_core::{EntitySpan, ExtractionResult, RelationshipRecord};
use entrel_extractor::ExtractionOptions;
use entrel_parser::ParsedDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Extraction request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtractRequest {
    /// Text to analyze
    #[schema(example = "Alice met Bob in Paris.")]
    pub content: String,
    /// Keep only these entity types (exact, case-sensitive)
    #[serde(default)]
    pub entity_types: Option<Vec<String>>,
    /// Drop relationships weaker than this value
    #[serde(default)]
    #[schema(minimum = 0.0, maximum = 1.0)]
    pub relationship_threshold: Option<f32>,
}

impl ExtractRequest {
    fn options(&self) -> ExtractionOptions {
        ExtractionOptions {
            entity_types: self.entity_types.clone(),
            relationship_threshold: self.relationship_threshold,
        }
    }
}

/// Recognized entity
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EntityDto {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f32,
    pub start_token: usize,
    pub end_token: usize,
}

impl From<EntitySpan> for EntityDto {
    fn from(span: EntitySpan) -> Self {
        Self {
            name: span.text,
            entity_type: span.label,
            confidence: span.confidence,
            start_token: span.start_token,
            end_token: span.end_token,
        }
    }
}

/// Inferred relationship between two entities in one sentence
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RelationshipDto {
    pub source: String,
    pub target: String,
    #[schema(example = "related_to")]
    pub relation: String,
    pub strength: f32,
}

impl From<RelationshipRecord> for RelationshipDto {
    fn from(record: RelationshipRecord) -> Self {
        Self {
            source: record.source,
            target: record.target,
            relation: record.relation,
            strength: record.strength,
        }
    }
}

/// Extraction response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtractResponse {
    pub entities: Vec<EntityDto>,
    pub relationships: Vec<RelationshipDto>,
}

impl From<ExtractionResult> for ExtractResponse {
    fn from(result: ExtractionResult) -> Self {
        Self {
            entities: result.entities.into_iter().map(Into::into).collect(),
            relationships: result.relationships.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parsed upload summary
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentInfo {
    pub file_name: String,
    #[schema(example = "pdf")]
    pub file_type: String,
    pub title: Option<String>,
    pub page_count: Option<u32>,
    pub word_count: usize,
}

impl From<&ParsedDocument> for DocumentInfo {
    fn from(doc: &ParsedDocument) -> Self {
        Self {
            file_name: doc.file_name.clone(),
            file_type: doc.file_type.to_string(),
            title: doc.metadata.title.clone(),
            page_count: doc.metadata.page_count,
            word_count: doc.word_count(),
        }
    }
}

/// Upload extraction response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadExtractResponse {
    pub document: DocumentInfo,
    pub entities: Vec<EntityDto>,
    pub relationships: Vec<RelationshipDto>,
}

/// Multipart form accepted by the upload endpoint
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// PDF, text or Markdown file
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// Comma-separated entity types
    entity_types: Option<String>,
    relationship_threshold: Option<f32>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Extract entities and relationships from text
#[utoipa::path(
    post,
    path = "/api/v1/extract",
    tag = "extract",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Extraction result", body = ExtractResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Recognition backend failed", body = ApiError),
        (status = 504, description = "Recognition timed out", body = ApiError)
    )
)]
pub async fn extract_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let result = state.extraction.extract(&req.content, &req.options()).await?;

    tracing::info!(
        entities = result.entities.len(),
        relationships = result.relationships.len(),
        "Extraction completed"
    );

    Ok(Json(result.into()))
}

/// Extract entities and relationships from an uploaded document
#[utoipa::path(
    post,
    path = "/api/v1/extract/upload",
    tag = "extract",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Extraction result", body = UploadExtractResponse),
        (status = 400, description = "Invalid upload", body = ApiError),
        (status = 502, description = "Recognition backend failed", body = ApiError),
        (status = 504, description = "Recognition timed out", body = ApiError)
    )
)]
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadExtractResponse>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut options = ExtractionOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::BadRequest("file field has no file name".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some((file_name, bytes.to_vec()));
            }
            "entity_types" => {
                let value = read_text(field).await?;
                options.entity_types = Some(parse_entity_types(&value));
            }
            "relationship_threshold" => {
                let value = read_text(field).await?;
                let threshold = value.trim().parse::<f32>().map_err(|_| {
                    AppError::BadRequest(format!("Invalid relationship_threshold: {value}"))
                })?;
                options.relationship_threshold = Some(threshold);
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing file field".into()))?;

    let parser_state = state.clone();
    let doc = tokio::task::spawn_blocking(move || {
        parser_state.parsers.parse_bytes(&file_name, &bytes)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Parser task failed: {e}")))??;

    tracing::info!(
        file = %doc.file_name,
        file_type = %doc.file_type,
        bytes = doc.byte_len(),
        "Parsed uploaded document"
    );

    let result = state.extraction.extract(&doc.content, &options).await?;
    let response: ExtractResponse = result.into();

    Ok(Json(UploadExtractResponse {
        document: DocumentInfo::from(&doc),
        entities: response.entities,
        relationships: response.relationships,
    }))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {e}")))
}

/// Split a comma-separated type list, dropping blanks
fn parse_entity_types(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_types() {
        assert_eq!(parse_entity_types("PERSON, ORG ,,GPE"), vec!["PERSON", "ORG", "GPE"]);
        assert!(parse_entity_types(" ").is_empty());
    }

    #[test]
    fn test_entity_dto_field_names() {
        let dto = EntityDto::from(EntitySpan::new("Alice", "PERSON", 0, 1));
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["name"], "Alice");
        assert_eq!(json["type"], "PERSON");
        assert_eq!(json["start_token"], 0);
        assert_eq!(json["end_token"], 1);
    }

    #[test]
    fn test_request_defaults() {
        let req: ExtractRequest = serde_json::from_str(r#"{"content": "Alice met Bob."}"#).unwrap();
        let options = req.options();

        assert!(options.entity_types.is_none());
        assert!(options.relationship_threshold.is_none());
    }
}
