//! ChunkStore trait definition
//!
//! The persistent table of chunk records. Concrete stores (in-memory,
//! SQLite) live in ragline-foundation.

use crate::error::RagResult;
use crate::rag::types::{Candidate, ChunkRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Native distance metric of a store. Every variant is "smaller = closer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Euclidean (L2) distance
    #[default]
    L2,
    /// `1 - cosine_similarity`
    Cosine,
    /// Negated dot product
    Dot,
}

/// Abstract interface for the shared chunk table.
///
/// All methods take `&self`: a store is shared across concurrent retrieval
/// and backfill calls. Implementations must make `update_vector` atomic per
/// record, so a reader sees either the old or the new vector of a record,
/// never a mix.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_kernel::rag::{ChunkRecord, ChunkStore};
///
/// store.insert(vec![ChunkRecord::pending("id-1", "text", "a.txt", 1, dim)]).await?;
/// store.update_vector("id-1", embedding).await?;
/// let candidates = store.search(&query_vector, 25).await?;
/// ```
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Fixed width of the vector column.
    fn vector_dim(&self) -> usize;

    fn metric(&self) -> DistanceMetric;

    /// Append records. Every vector must be exactly `vector_dim()` wide.
    async fn insert(&self, records: Vec<ChunkRecord>) -> RagResult<()>;

    /// Every record in insertion order.
    async fn scan_all(&self) -> RagResult<Vec<ChunkRecord>>;

    /// Write a pending record's vector and mark it embedded.
    ///
    /// Returns `Ok(false)` without touching anything when no pending record
    /// has this id: the id is unknown or the record is already embedded.
    async fn update_vector(&self, id: &str, vector: Vec<f32>) -> RagResult<bool>;

    /// Up to `limit` embedded records, ordered by ascending distance to
    /// `vector`; ties keep insertion order. An empty or absent table yields
    /// an empty list, never an error.
    async fn search(&self, vector: &[f32], limit: usize) -> RagResult<Vec<Candidate>>;

    async fn count(&self) -> RagResult<usize>;

    /// Drop every record (full-corpus reset).
    async fn reset(&self) -> RagResult<()>;

    /// Check a vector against the column width.
    fn check_dim(&self, vector: &[f32]) -> RagResult<()> {
        let expected = self.vector_dim();
        if vector.len() != expected {
            return Err(crate::error::RagError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}
