//! PDF document parser using pdf-extract
//!
//! Extracts text content from PDF files. Layout line breaks are reflowed
//! into paragraphs so that sentence segmentation is not cut at every
//! printed line.

use crate::{DocumentParseMetadata, DocumentParser, FileType, ParsedDocument, ParserError, Result};

/// PDF document parser
pub struct PdfParser {
    /// Join wrapped lines into paragraphs
    pub reflow: bool,
}

impl PdfParser {
    /// Create a new PDF parser with default settings
    pub fn new() -> Self {
        Self { reflow: true }
    }

    /// Keep the raw line layout
    pub fn with_reflow(mut self, enabled: bool) -> Self {
        self.reflow = enabled;
        self
    }

    /// Extract text from PDF bytes
    fn extract_text(&self, bytes: &[u8]) -> Result<(String, Option<u32>)> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ParserError::PdfError(e.to_string()))?;

        // Rough page count from form feed separators
        let page_count = text.matches('\x0C').count() as u32;
        let page_count = if page_count > 0 {
            Some(page_count + 1)
        } else {
            None
        };

        Ok((text, page_count))
    }
}

impl Default for PdfParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for PdfParser {
    fn parse_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<ParsedDocument> {
        let (text, page_count) = self.extract_text(bytes)?;
        let content = if self.reflow { reflow(&text) } else { text };

        let title = content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .filter(|line| line.len() < 200)
            .map(str::to_string);

        Ok(ParsedDocument {
            file_name: file_name.to_string(),
            file_type: FileType::Pdf,
            content,
            metadata: DocumentParseMetadata { title, page_count },
        })
    }

    fn supported_types(&self) -> &[FileType] {
        &[FileType::Pdf]
    }
}

/// Join wrapped lines into paragraphs separated by blank lines.
///
/// A line ending in a hyphen followed by a lowercase letter is joined
/// without a space ("exam-" + "ple" becomes "example").
pub fn reflow(text: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.split(['\n', '\x0C']) {
        let line = line.trim();

        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(line);
        } else if current.ends_with('-') && line.starts_with(|c: char| c.is_lowercase()) {
            current.pop();
            current.push_str(line);
        } else {
            current.push(' ');
            current.push_str(line);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs.join("\n\n")
}
