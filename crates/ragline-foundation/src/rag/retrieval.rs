//! Retrieval orchestrator
//!
//! One call runs four stages in order: embed the query, fetch a fixed pool of
//! nearest neighbours, rerank the pool with a cross-encoder, then release the
//! cross-encoder. Each stage is timed separately and any stage failure aborts
//! the call with [`RagError::RetrievalFailed`].

use crate::rag::reranker::ScopedReranker;
use ragline_kernel::error::{RagError, RagResult, RetrievalStage};
use ragline_kernel::rag::types::secs;
use ragline_kernel::rag::{
    CANDIDATE_POOL_SIZE, Candidate, ChunkStore, EmbeddingProvider, RetrievalMetrics,
    RetrievalResult,
};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Parameters of one retrieval call.
#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub query: String,
    pub embedding_model: String,
    pub reranker_model: String,
    pub top_k: usize,
    /// Checked before each stage starts; a running stage is never interrupted.
    pub deadline: Option<Instant>,
}

impl RetrieveRequest {
    pub fn new(
        query: impl Into<String>,
        embedding_model: impl Into<String>,
        reranker_model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            query: query.into(),
            embedding_model: embedding_model.into(),
            reranker_model: reranker_model.into(),
            top_k,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    fn check_deadline(&self, stage: RetrievalStage) -> RagResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(RagError::DeadlineExceeded { stage })
            }
            _ => Ok(()),
        }
    }
}

/// Composes query embedding, vector search and reranking.
pub struct RetrievalOrchestrator {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Arc<ScopedReranker>,
}

impl RetrievalOrchestrator {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Arc<ScopedReranker>,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
        }
    }

    pub fn reranker(&self) -> &ScopedReranker {
        &self.reranker
    }

    /// Return the `top_k` most relevant chunks, best first, with stage timings.
    ///
    /// An empty store is not an error: it yields no results and all-zero
    /// metrics without contacting any model.
    pub async fn retrieve(
        &self,
        request: &RetrieveRequest,
    ) -> RagResult<(Vec<RetrievalResult>, RetrievalMetrics)> {
        if request.top_k == 0 {
            return Err(RagError::Configuration("top_k must be at least 1".to_string()));
        }

        let started = Instant::now();
        let mut metrics = RetrievalMetrics::default();

        let stored = self
            .store
            .count()
            .await
            .map_err(|e| RagError::retrieval_failed(RetrievalStage::VectorSearch, e))?;
        if stored == 0 {
            info!("chunk table is empty, nothing to retrieve");
            return Ok((Vec::new(), RetrievalMetrics::default()));
        }

        // 1. query embedding
        request.check_deadline(RetrievalStage::Embedding)?;
        let stage = Instant::now();
        let query_vector = self
            .embedder
            .embed(&request.query, &request.embedding_model)
            .await
            .map_err(|e| RagError::retrieval_failed(RetrievalStage::Embedding, e))?;
        metrics.embedding_time = secs(stage.elapsed());
        debug!(elapsed = metrics.embedding_time, "query embedded");

        // 2. candidate pool
        request.check_deadline(RetrievalStage::VectorSearch)?;
        let stage = Instant::now();
        let candidates = self
            .store
            .search(&query_vector, CANDIDATE_POOL_SIZE)
            .await
            .map_err(|e| RagError::retrieval_failed(RetrievalStage::VectorSearch, e))?;
        metrics.vector_search_time = secs(stage.elapsed());
        debug!(
            candidates = candidates.len(),
            elapsed = metrics.vector_search_time,
            "vector search done"
        );

        if candidates.is_empty() {
            metrics.total_time = secs(started.elapsed());
            info!("no embedded chunks matched, reranking skipped");
            return Ok((Vec::new(), metrics));
        }

        // 3. rerank
        request.check_deadline(RetrievalStage::Reranking)?;
        let stage = Instant::now();
        let lease = self
            .reranker
            .acquire(&request.reranker_model)
            .await
            .map_err(|e| RagError::retrieval_failed(RetrievalStage::Reranking, e))?;
        let passages: Vec<&str> = candidates.iter().map(|c| c.record.text.as_str()).collect();
        let scored = lease.score_batch(&request.query, &passages).await;
        metrics.reranking_time = secs(stage.elapsed());

        // 4. release, on both the success and the failure path
        let stage = Instant::now();
        let timing = lease.release().await;
        metrics.cleanup_time = secs(stage.elapsed());
        metrics.reranker_load_time = secs(timing.load_time);

        let scores =
            scored.map_err(|e| RagError::retrieval_failed(RetrievalStage::Reranking, e))?;
        debug!(
            pairs = scores.len(),
            reranking_time = metrics.reranking_time,
            cleanup_time = metrics.cleanup_time,
            "reranking done"
        );

        let results = rank(candidates, scores, request.top_k);
        metrics.total_time = secs(started.elapsed());
        info!(
            results = results.len(),
            total_time = metrics.total_time,
            "retrieval finished"
        );
        Ok((results, metrics))
    }
}

/// Order candidates by score, highest first, and keep `top_k`.
///
/// Ties keep vector-search order. NaN scores rank last.
fn rank(candidates: Vec<Candidate>, scores: Vec<f32>, top_k: usize) -> Vec<RetrievalResult> {
    let mut scored: Vec<(Candidate, f32)> = candidates.into_iter().zip(scores).collect();
    scored.sort_by(|(_, a), (_, b)| match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
    scored.truncate(top_k);
    scored
        .into_iter()
        .map(|(candidate, score)| RetrievalResult {
            text: candidate.record.text,
            source: candidate.record.source,
            page: candidate.record.page,
            score,
        })
        .collect()
}
