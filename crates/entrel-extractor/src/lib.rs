//! entrel Extractor - Entity and relationship extraction pipeline
//!
//! Recognizes named entities with a pluggable backend, binds them to
//! sentences and derives proximity-scored `related_to` relationships
//! between entities that share a sentence.

pub mod comprehend;
pub mod ner;
pub mod pipeline;
pub mod relation;
pub mod segment;
pub mod tokenize;

pub use comprehend::ComprehendRecognizer;
pub use ner::{EntityLabel, LocalRecognizer};
pub use pipeline::{build_recognizer, filter_entity_types, ExtractionOptions, ExtractionService};
pub use relation::{filter_by_strength, score};
pub use segment::bind;
pub use tokenize::TokenizedText;
