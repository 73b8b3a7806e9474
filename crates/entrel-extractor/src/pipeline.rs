//! Extraction pipeline
//!
//! Runs a document through the configured recognizer, narrows the entity
//! list to the requested types, binds entities to sentences and scores
//! co-occurring pairs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::comprehend::ComprehendRecognizer;
use crate::ner::LocalRecognizer;
use crate::relation::{filter_by_strength, score, validate_threshold};
use crate::segment::bind;
use entrel_core::{
    AppConfig, EntityRecognizer, EntitySpan, EntrelError, ExtractionConfig, ExtractionMode,
    ExtractionResult, Result,
};

/// Per-request extraction options
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    /// Allow-list of entity labels; `None` keeps every label
    pub entity_types: Option<Vec<String>>,

    /// Minimum relationship strength; `None` keeps every relationship
    pub relationship_threshold: Option<f32>,
}

impl ExtractionOptions {
    pub fn with_entity_types(mut self, types: Vec<String>) -> Self {
        self.entity_types = Some(types);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.relationship_threshold = Some(threshold);
        self
    }
}

/// Build the recognizer selected by the configuration
pub fn build_recognizer(config: &AppConfig) -> Result<Arc<dyn EntityRecognizer>> {
    match config.extraction.mode {
        ExtractionMode::Local => Ok(Arc::new(LocalRecognizer::new())),
        ExtractionMode::Aws => Ok(Arc::new(ComprehendRecognizer::from_config(&config.aws)?)),
    }
}

/// Keep only entities whose label is in `allowed` (exact, case-sensitive).
/// An empty allow-list keeps everything.
pub fn filter_entity_types(entities: Vec<EntitySpan>, allowed: Option<&[String]>) -> Vec<EntitySpan> {
    match allowed {
        Some(allowed) if !allowed.is_empty() => entities
            .into_iter()
            .filter(|e| allowed.iter().any(|label| *label == e.label))
            .collect(),
        _ => entities,
    }
}

/// Entity and relationship extraction service
#[derive(Clone)]
pub struct ExtractionService {
    recognizer: Arc<dyn EntityRecognizer>,
    timeout: Duration,
    max_content_length: usize,
}

impl ExtractionService {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>, config: &ExtractionConfig) -> Self {
        Self {
            recognizer,
            timeout: Duration::from_secs(config.recognition_timeout_secs),
            max_content_length: config.max_content_length,
        }
    }

    /// Create from config, selecting the recognizer backend
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let recognizer = build_recognizer(config)?;
        Ok(Self::new(recognizer, &config.extraction))
    }

    /// Name of the active recognizer backend
    pub fn backend(&self) -> &str {
        self.recognizer.name()
    }

    /// Extract entities and relationships from one document
    pub async fn extract(&self, content: &str, options: &ExtractionOptions) -> Result<ExtractionResult> {
        if content.trim().is_empty() {
            return Err(EntrelError::ValidationError("content cannot be empty".to_string()));
        }
        if content.len() > self.max_content_length {
            return Err(EntrelError::ValidationError(format!(
                "content length {} exceeds maximum of {} bytes",
                content.len(),
                self.max_content_length
            )));
        }
        if let Some(threshold) = options.relationship_threshold {
            validate_threshold(threshold)?;
        }

        let started = Instant::now();
        let analyzed = tokio::time::timeout(self.timeout, self.recognizer.analyze(content))
            .await
            .map_err(|_| {
                warn!(backend = self.backend(), "Recognition timed out");
                EntrelError::Timeout(self.timeout.as_secs())
            })??;

        debug!(
            backend = self.backend(),
            tokens = analyzed.token_count,
            sentences = analyzed.sentences.len(),
            entities = analyzed.entities.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recognition complete"
        );

        let entities = filter_entity_types(analyzed.entities, options.entity_types.as_deref());
        for entity in &entities {
            trace!(
                text = %entity.text,
                label = %entity.label,
                start = entity.start_token,
                end = entity.end_token,
                "Entity"
            );
        }
        let groups = bind(&analyzed.sentences, &entities)?;

        let mut relationships = score(&groups);
        if let Some(threshold) = options.relationship_threshold {
            relationships = filter_by_strength(relationships, threshold)?;
        }

        info!(
            backend = self.backend(),
            entities = entities.len(),
            relationships = relationships.len(),
            "Extraction complete"
        );

        Ok(ExtractionResult {
            entities,
            relationships,
        })
    }
}
