//! Document ingestion: extract, segment, store pending chunks

use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::types::secs;
use ragline_kernel::rag::{ChunkRecord, ChunkStore, PageText, TextExtractor, TextSegmenter};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub extraction_time: f64,
    pub chunking_time: f64,
    pub db_insertion_time: f64,
    pub total_time: f64,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub chunks_count: usize,
    pub pages_processed: usize,
    pub metrics: ProcessMetrics,
}

/// Turns one stored document into pending chunk records.
///
/// Vectors are left as placeholders; [`BackfillEngine`](crate::rag::BackfillEngine)
/// fills them in later.
pub struct Ingestor {
    store: Arc<dyn ChunkStore>,
    extractor: Arc<dyn TextExtractor>,
    segmenter: Arc<dyn TextSegmenter>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        extractor: Arc<dyn TextExtractor>,
        segmenter: Arc<dyn TextSegmenter>,
    ) -> Self {
        Self {
            store,
            extractor,
            segmenter,
        }
    }

    /// Ingest the file at `path`, recording `source` on every chunk.
    pub async fn process(
        &self,
        path: &Path,
        source: &str,
        chunking_model: &str,
    ) -> RagResult<ProcessReport> {
        let started = Instant::now();
        let mut metrics = ProcessMetrics::default();

        let stage = Instant::now();
        let extractor = self.extractor.clone();
        let owned_path = path.to_path_buf();
        let pages: Vec<PageText> =
            tokio::task::spawn_blocking(move || extractor.extract(&owned_path))
                .await
                .map_err(|e| RagError::Io(format!("extraction task failed: {e}")))??;
        metrics.extraction_time = secs(stage.elapsed());

        let stage = Instant::now();
        let dim = self.store.vector_dim();
        let mut records = Vec::new();
        for page in &pages {
            for chunk in self.segmenter.segment(&page.text, chunking_model).await? {
                records.push(ChunkRecord::pending(
                    Uuid::new_v4().to_string(),
                    chunk,
                    source,
                    page.page,
                    dim,
                ));
            }
        }
        metrics.chunking_time = secs(stage.elapsed());

        let stage = Instant::now();
        let chunks_count = records.len();
        if !records.is_empty() {
            self.store.insert(records).await?;
        }
        metrics.db_insertion_time = secs(stage.elapsed());
        metrics.total_time = secs(started.elapsed());

        info!(
            source,
            pages = pages.len(),
            chunks = chunks_count,
            total_time = metrics.total_time,
            "document processed"
        );
        Ok(ProcessReport {
            chunks_count,
            pages_processed: pages.len(),
            metrics,
        })
    }
}
