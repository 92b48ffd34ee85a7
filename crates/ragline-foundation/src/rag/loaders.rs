//! Text extraction for stored uploads
//!
//! [`DocumentExtractor`] routes a path to the first registered extractor that
//! accepts its extension. Plain text is always registered; PDF is registered
//! when the `pdf` feature is enabled.

use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::{PAGELESS, PageText, TextExtractor};
use std::path::Path;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

fn has_extension(path: &Path, known: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| known.iter().any(|k| k.eq_ignore_ascii_case(ext)))
}

fn read_error(path: &Path, e: std::io::Error) -> RagError {
    match e.kind() {
        std::io::ErrorKind::NotFound => RagError::NotFound(path.display().to_string()),
        _ => RagError::Io(format!("failed to read '{}': {e}", path.display())),
    }
}

/// Collapse every whitespace run into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads UTF-8 text files as a single page-less page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PlainTextExtractor {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, TEXT_EXTENSIONS)
    }

    fn extract(&self, path: &Path) -> RagResult<Vec<PageText>> {
        if !self.supports(path) {
            return Err(RagError::UnsupportedFormat(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;

        let text = normalize_whitespace(&raw);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![PageText {
            text,
            page: PAGELESS,
        }])
    }
}

/// Reads PDF files page by page.
///
/// Pages are numbered from 1 in document order. Pages without any text
/// after whitespace normalisation are dropped.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[cfg(feature = "pdf")]
impl PdfExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "pdf")]
impl TextExtractor for PdfExtractor {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    fn extract(&self, path: &Path) -> RagResult<Vec<PageText>> {
        if !self.supports(path) {
            return Err(RagError::UnsupportedFormat(path.display().to_string()));
        }

        let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
        let document = lopdf::Document::load_mem(&bytes).map_err(|e| {
            RagError::InvalidInput(format!("cannot parse PDF '{}': {e}", path.display()))
        })?;

        let mut pages = Vec::new();
        // get_pages is keyed by 1-based page number
        for number in document.get_pages().into_keys() {
            let raw = document.extract_text(&[number]).map_err(|e| {
                RagError::InvalidInput(format!(
                    "cannot read page {number} of '{}': {e}",
                    path.display()
                ))
            })?;
            let text = normalize_whitespace(&raw);
            if !text.is_empty() {
                pages.push(PageText { text, page: number });
            }
        }
        Ok(pages)
    }
}

/// Dispatches to the first registered extractor that supports a path.
pub struct DocumentExtractor {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl DocumentExtractor {
    /// Plain text, plus PDF when the `pdf` feature is on.
    #[must_use]
    pub fn new() -> Self {
        let extractor = Self {
            extractors: vec![Box::new(PlainTextExtractor::new())],
        };
        #[cfg(feature = "pdf")]
        let extractor = extractor.with(PdfExtractor::new());
        extractor
    }

    /// Register another extractor, consulted after the existing ones.
    #[must_use]
    pub fn with(mut self, extractor: impl TextExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for DocumentExtractor {
    fn supports(&self, path: &Path) -> bool {
        self.extractors.iter().any(|e| e.supports(path))
    }

    fn extract(&self, path: &Path) -> RagResult<Vec<PageText>> {
        self.extractors
            .iter()
            .find(|e| e.supports(path))
            .ok_or_else(|| RagError::UnsupportedFormat(path.display().to_string()))?
            .extract(path)
    }
}
