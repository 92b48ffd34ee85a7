//! Embedding provider contract

use crate::error::RagResult;
use async_trait::async_trait;

/// Stateless `text -> fixed-dimension vector` function.
///
/// The output width must match the chunk store's column width; a mismatch
/// is a configuration error surfaced by the store.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name used in error messages and logs.
    fn name(&self) -> &str;

    async fn embed(&self, text: &str, model_id: &str) -> RagResult<Vec<f32>>;
}
