//! Lazy embedding backfill
//!
//! Ingestion stores chunks with a placeholder vector. [`BackfillEngine`] finds
//! the pending ones, embeds their text and writes each vector back with a
//! single point update. Runs on one engine are serialised, so overlapping
//! requests never embed the same record twice.

use futures::future::join_all;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::types::secs;
use ragline_kernel::rag::{
    BackfillFailure, BackfillMetrics, BackfillReport, ChunkRecord, ChunkStore, EmbeddingProvider,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Fills in vectors for pending chunk records.
pub struct BackfillEngine {
    store: Arc<dyn ChunkStore>,
    provider: Arc<dyn EmbeddingProvider>,
    run_lock: Mutex<()>,
}

impl BackfillEngine {
    pub fn new(store: Arc<dyn ChunkStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            run_lock: Mutex::new(()),
        }
    }

    /// Embed every pending record, `batch_size` requests in flight at a time.
    ///
    /// A provider error for one record leaves it pending and is reported in
    /// [`BackfillReport::failed`]; the run continues. A vector of the wrong
    /// width aborts the run, since every later record would fail the same way.
    /// Overlapping calls on one engine run one after the other.
    pub async fn backfill(&self, model_id: &str, batch_size: usize) -> RagResult<BackfillReport> {
        if batch_size == 0 {
            return Err(RagError::Configuration(
                "backfill batch_size must be at least 1".to_string(),
            ));
        }

        let _run = self.run_lock.lock().await;
        let started = Instant::now();
        let pending: Vec<ChunkRecord> = self
            .store
            .scan_all()
            .await?
            .into_iter()
            .filter(ChunkRecord::is_pending)
            .collect();

        if pending.is_empty() {
            debug!("no pending chunks, backfill skipped");
            return Ok(BackfillReport {
                metrics: BackfillMetrics {
                    total_time: secs(started.elapsed()),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        info!(
            pending = pending.len(),
            batch_size,
            provider = self.provider.name(),
            model = model_id,
            "starting embedding backfill"
        );

        let mut report = BackfillReport::default();
        for batch in pending.chunks(batch_size) {
            let embed_started = Instant::now();
            let vectors = join_all(
                batch
                    .iter()
                    .map(|record| self.provider.embed(&record.text, model_id)),
            )
            .await;
            report.metrics.embedding_time += secs(embed_started.elapsed());

            let update_started = Instant::now();
            for (record, embedded) in batch.iter().zip(vectors) {
                let vector = match embedded {
                    Ok(vector) => vector,
                    Err(e) => {
                        warn!(chunk_id = %record.id, error = %e, "embedding failed, chunk left pending");
                        report.failed.push(BackfillFailure {
                            id: record.id.clone(),
                            cause: e.to_string(),
                        });
                        continue;
                    }
                };

                self.store.check_dim(&vector)?;
                if self.store.update_vector(&record.id, vector).await? {
                    report.succeeded.push(record.id.clone());
                } else {
                    debug!(chunk_id = %record.id, "chunk gone or already embedded, vector discarded");
                    report.skipped.push(record.id.clone());
                }
            }
            report.metrics.db_update_time += secs(update_started.elapsed());
        }

        report.metrics.total_time = secs(started.elapsed());
        info!(
            updated = report.updated_count(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            total_time = report.metrics.total_time,
            "embedding backfill finished"
        );
        Ok(report)
    }
}
