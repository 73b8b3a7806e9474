//! entrel Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout entrel:
//! - Entity spans, sentences and entity groups produced by a recognizer
//! - Relationship records derived from co-occurring entities
//! - Common error types
//! - The recognizer trait implemented by every extraction backend
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, AwsConfig, ConfigError, ExtractionConfig, ExtractionMode, LoggingConfig,
    ServerConfig,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for entrel operations
#[derive(Error, Debug)]
pub enum EntrelError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Recognition error: {0}")]
    RecognitionError(String),

    #[error("Recognition timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EntrelError>;

// ============================================================================
// Recognizer Output
// ============================================================================

/// Relation label attached to every co-occurrence relationship
pub const RELATED_TO: &str = "related_to";

/// A named-entity mention recognized in a document.
///
/// Token offsets follow the half-open convention: `start_token` is the index
/// of the first token of the mention and `end_token` is one past the last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Surface text of the mention
    pub text: String,

    /// Entity type label (e.g. PERSON, ORG)
    pub label: String,

    /// First token of the mention
    pub start_token: usize,

    /// One past the last token of the mention
    pub end_token: usize,

    /// Recognizer confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl EntitySpan {
    /// Create a new span with full confidence
    pub fn new(
        text: impl Into<String>,
        label: impl Into<String>,
        start_token: usize,
        end_token: usize,
    ) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            start_token,
            end_token,
            confidence: 1.0,
        }
    }

    /// Set confidence score
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Reject spans whose start lies after their end
    pub fn validate(&self) -> Result<()> {
        if self.start_token > self.end_token {
            return Err(EntrelError::ValidationError(format!(
                "entity '{}' starts at token {} after its end {}",
                self.text, self.start_token, self.end_token
            )));
        }
        Ok(())
    }
}

/// A contiguous token range forming one sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub start_token: usize,
    pub end_token: usize,
}

impl Sentence {
    pub fn new(start_token: usize, end_token: usize) -> Self {
        Self {
            start_token,
            end_token,
        }
    }

    /// Whether a span lies entirely inside this sentence
    pub fn contains(&self, span: &EntitySpan) -> bool {
        span.start_token >= self.start_token && span.end_token <= self.end_token
    }

    /// Number of tokens in the sentence
    pub fn len(&self) -> usize {
        self.end_token.saturating_sub(self.start_token)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entities bound to one sentence, in token order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityGroup {
    /// Sentence the entities were bound to
    pub sentence: Sentence,

    /// Entities fully contained in the sentence
    pub entities: Vec<EntitySpan>,
}

impl EntityGroup {
    /// Number of unordered entity pairs in this group
    pub fn pair_count(&self) -> usize {
        let n = self.entities.len();
        n * n.saturating_sub(1) / 2
    }
}

/// A directed, scored link between two entities sharing a sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Text of the earlier entity
    pub source: String,

    /// Text of the later entity
    pub target: String,

    /// Relation label
    pub relation: String,

    /// Proximity score, 1.0 for adjacent mentions
    pub strength: f32,
}

/// Everything a recognizer reports about one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedText {
    /// Sentence boundaries in document order
    pub sentences: Vec<Sentence>,

    /// Entity mentions in recognition order
    pub entities: Vec<EntitySpan>,

    /// Total number of tokens in the document
    pub token_count: usize,
}

/// Result of running extraction over one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<EntitySpan>,
    pub relationships: Vec<RelationshipRecord>,
}

// ============================================================================
// Traits
// ============================================================================

/// An entity recognition backend.
///
/// Given text, produce sentence boundaries and entity spans expressed in
/// token offsets over the same tokenization.
#[async_trait::async_trait]
pub trait EntityRecognizer: Send + Sync {
    /// Analyze a document
    async fn analyze(&self, text: &str) -> Result<AnalyzedText>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
