//! Cross-encoder reranker contracts
//!
//! A [`RerankerBackend`] loads heavyweight models; the returned
//! [`RerankerModel`] scores `(query, passage)` pairs until it is unloaded.
//! Lifecycle management (scoping a model to one retrieval call) lives in
//! ragline-foundation.

use crate::error::RagResult;
use async_trait::async_trait;

/// Factory for loaded cross-encoder models.
#[async_trait]
pub trait RerankerBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Load the model and return a handle that owns its resources.
    async fn load(&self, model_id: &str) -> RagResult<Box<dyn RerankerModel>>;
}

/// A loaded cross-encoder.
#[async_trait]
pub trait RerankerModel: Send + Sync {
    fn model_id(&self) -> &str;

    /// Relevance of `passage` to `query`; higher is more relevant.
    async fn score(&self, query: &str, passage: &str) -> RagResult<f32>;

    /// Score several passages against one query.
    ///
    /// Scores are independent per pair; the default scores one pair at a time.
    async fn score_batch(&self, query: &str, passages: &[&str]) -> RagResult<Vec<f32>> {
        let mut scores = Vec::with_capacity(passages.len());
        for passage in passages {
            scores.push(self.score(query, passage).await?);
        }
        Ok(scores)
    }

    /// Release weights and accelerator memory. Called once, before drop.
    async fn unload(&mut self) -> RagResult<()> {
        Ok(())
    }
}
