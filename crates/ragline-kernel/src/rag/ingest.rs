//! Ingestion collaborators: text extraction and semantic segmentation

use crate::error::RagResult;
use crate::rag::types::PageText;
use async_trait::async_trait;
use std::path::Path;

/// Turns a stored document into per-page text.
pub trait TextExtractor: Send + Sync {
    /// Whether this extractor handles the file's format.
    fn supports(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path) -> RagResult<Vec<PageText>>;
}

/// Splits text into semantically coherent chunks.
#[async_trait]
pub trait TextSegmenter: Send + Sync {
    /// Returns trimmed, non-empty chunks in document order.
    async fn segment(&self, text: &str, model_id: &str) -> RagResult<Vec<String>>;
}
