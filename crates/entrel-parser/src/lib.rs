//! entrel Parser - Document parsing for uploaded files
//!
//! Supports parsing of:
//! - PDF documents
//! - Markdown files
//! - Plain text files
//!
//! Each parser implements the `DocumentParser` trait and produces
//! a `ParsedDocument` whose text is handed to the extraction pipeline.
//! Documents can be read from disk or from an in-memory upload.

pub mod pdf;

pub use pdf::PdfParser;

use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during document parsing
#[derive(Error, Debug)]
pub enum ParserError {
    /// File format is not supported
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// Encoding error
    #[error("Text encoding error: {0}")]
    EncodingError(String),

    /// Document contains no text
    #[error("Document contains no extractable text: {0}")]
    EmptyDocument(String),
}

impl ParserError {
    /// Whether the error was caused by the document rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::IoError { .. })
    }
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// Parsed Document Types
// ============================================================================

/// A parsed document with extracted content
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Original file name or path
    pub file_name: String,

    /// Detected file type
    pub file_type: FileType,

    /// Extracted text content
    pub content: String,

    /// Metadata extracted from the document
    pub metadata: DocumentParseMetadata,
}

impl ParsedDocument {
    /// Create a new parsed document
    pub fn new(file_name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            file_name: file_name.into(),
            file_type,
            content: String::new(),
            metadata: DocumentParseMetadata::default(),
        }
    }

    /// Set content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Length of the extracted text in bytes
    pub fn byte_len(&self) -> usize {
        self.content.len()
    }

    /// Get total word count (approximate)
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Supported file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Markdown,
    PlainText,
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::Markdown => write!(f, "markdown"),
            Self::PlainText => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Metadata extracted during parsing
#[derive(Debug, Clone, Default)]
pub struct DocumentParseMetadata {
    /// Document title
    pub title: Option<String>,

    /// Number of pages
    pub page_count: Option<u32>,
}

// ============================================================================
// Parser Trait
// ============================================================================

/// Trait for document parsers
pub trait DocumentParser: Send + Sync {
    /// Parse a document from in-memory bytes
    fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedDocument>;

    /// Parse a document from a file path
    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        self.parse_bytes(&path.display().to_string(), &bytes)
    }

    /// Get supported file types
    fn supported_types(&self) -> &[FileType];

    /// Check if this parser can handle a file type
    fn can_parse(&self, file_type: FileType) -> bool {
        self.supported_types().contains(&file_type)
    }
}

// ============================================================================
// Parser Registry
// ============================================================================

/// Registry of available parsers
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Registry with the PDF and plain text parsers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PdfParser::new());
        registry.register(PlainTextParser);
        registry
    }

    /// Register a parser
    pub fn register<P: DocumentParser + 'static>(&mut self, parser: P) {
        self.parsers.push(Box::new(parser));
    }

    /// Find a parser for a file type
    pub fn find_parser(&self, file_type: FileType) -> Option<&dyn DocumentParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(file_type))
            .map(|p| p.as_ref())
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let parser = self.parser_for(path)?;
        ensure_not_empty(parser.parse(path)?)
    }

    /// Parse an uploaded file, choosing the parser from its name
    pub fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedDocument> {
        let parser = self.parser_for(Path::new(file_name))?;
        ensure_not_empty(parser.parse_bytes(file_name, bytes)?)
    }

    fn parser_for(&self, path: &Path) -> Result<&dyn DocumentParser> {
        let file_type = FileType::from_path(path);

        if file_type == FileType::Unknown {
            return Err(ParserError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("none")
                    .to_string(),
            ));
        }

        self.find_parser(file_type)
            .ok_or_else(|| ParserError::UnsupportedFormat(file_type.to_string()))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn ensure_not_empty(doc: ParsedDocument) -> Result<ParsedDocument> {
    if doc.content.trim().is_empty() {
        return Err(ParserError::EmptyDocument(doc.file_name));
    }
    Ok(doc)
}

// ============================================================================
// Plain Text Parser
// ============================================================================

/// Plain text and Markdown parser
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedDocument> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let content = std::str::from_utf8(bytes)
            .map_err(|e| ParserError::EncodingError(format!("{file_name}: {e}")))?;

        let file_type = match FileType::from_path(Path::new(file_name)) {
            FileType::Markdown => FileType::Markdown,
            _ => FileType::PlainText,
        };

        let mut doc = ParsedDocument::new(file_name, file_type).with_content(content);
        if file_type == FileType::Markdown {
            doc.metadata.title = content
                .lines()
                .find_map(|line| line.strip_prefix("# "))
                .map(|title| title.trim().to_string());
        }
        Ok(doc)
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::PlainText, FileType::Markdown]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("pdf"), FileType::Pdf);
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("md"), FileType::Markdown);
        assert_eq!(FileType::from_extension("txt"), FileType::PlainText);
        assert_eq!(FileType::from_extension("docx"), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("notes")), FileType::Unknown);
    }

    #[test]
    fn test_parse_text_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Alice met Bob in Paris.").unwrap();

        let doc = ParserRegistry::with_defaults().parse(file.path()).unwrap();
        assert_eq!(doc.file_type, FileType::PlainText);
        assert_eq!(doc.content, "Alice met Bob in Paris.");
        assert_eq!(doc.word_count(), 5);
        assert_eq!(doc.byte_len(), 23);
    }

    #[test]
    fn test_parse_markdown_bytes() {
        let doc = ParserRegistry::with_defaults()
            .parse_bytes("notes.md", "\u{feff}# Meeting\n\nAlice met Bob.".as_bytes())
            .unwrap();

        assert_eq!(doc.file_type, FileType::Markdown);
        assert_eq!(doc.metadata.title.as_deref(), Some("Meeting"));
        // BOM is not part of the content
        assert_eq!(doc.byte_len(), "# Meeting\n\nAlice met Bob.".len());
        assert!(doc.content.starts_with("# Meeting"));
    }

    #[test]
    fn test_unsupported_format() {
        let err = ParserRegistry::with_defaults()
            .parse_bytes("report.docx", b"PK")
            .unwrap_err();
        assert!(matches!(err, ParserError::UnsupportedFormat(ref ext) if ext == "docx"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invalid_utf8() {
        let err = ParserRegistry::with_defaults()
            .parse_bytes("notes.txt", &[0x66, 0xff, 0xfe])
            .unwrap_err();
        assert!(matches!(err, ParserError::EncodingError(_)));
    }

    #[test]
    fn test_empty_document() {
        let err = ParserRegistry::with_defaults()
            .parse_bytes("blank.txt", b"  \n\t")
            .unwrap_err();
        assert!(matches!(err, ParserError::EmptyDocument(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ParserRegistry::with_defaults()
            .parse(Path::new("/nonexistent/input.txt"))
            .unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
        assert!(!err.is_client_error());
    }
}
