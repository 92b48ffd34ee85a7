//! Chunk records and the derived values produced from them
//!
//! A [`ChunkRecord`] is created once at ingestion with a sentinel vector,
//! has its vector replaced exactly once by the backfill engine, and is only
//! destroyed by a full-corpus reset.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page number used for sources without pages (plain text).
pub const PAGELESS: u32 = 0;

/// Number of nearest neighbours fetched before reranking, independent of `top_k`.
pub const CANDIDATE_POOL_SIZE: usize = 25;

/// Placeholder vector written at ingestion time.
pub fn sentinel_vector(dim: usize) -> Vec<f32> {
    vec![0.0; dim]
}

/// The unit of storage and retrieval.
///
/// Pending state is tracked by the explicit `embedded` flag rather than by
/// comparing `vector` against the all-zero sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Globally unique identifier assigned at ingestion
    pub id: String,
    /// Raw chunk content
    pub text: String,
    /// Originating document (file name or URI)
    pub source: String,
    /// 1-based page number, or [`PAGELESS`]
    pub page: u32,
    /// Fixed-width embedding; the sentinel until backfilled
    pub vector: Vec<f32>,
    /// Whether `vector` holds a real embedding
    #[serde(default)]
    pub embedded: bool,
}

impl ChunkRecord {
    /// Create a pending record carrying the sentinel vector.
    pub fn pending(
        id: impl Into<String>,
        text: impl Into<String>,
        source: impl Into<String>,
        page: u32,
        dim: usize,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: source.into(),
            page,
            vector: sentinel_vector(dim),
            embedded: false,
        }
    }

    /// Replace the placeholder with a real embedding.
    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = vector;
        self.embedded = true;
        self
    }

    pub fn is_pending(&self) -> bool {
        !self.embedded
    }

    pub fn is_ready(&self) -> bool {
        self.embedded
    }
}

/// A record returned by nearest-neighbour search together with its distance.
///
/// Smaller distance means closer, whatever the store's metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: ChunkRecord,
    pub distance: f32,
}

/// One ranked chunk handed to the generation step. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Cross-encoder relevance score (higher is more relevant)
    pub score: f32,
}

/// Per-stage wall-clock timings of one retrieval call, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub embedding_time: f64,
    pub vector_search_time: f64,
    pub reranking_time: f64,
    /// Portion of `reranking_time` spent loading the cross-encoder
    pub reranker_load_time: f64,
    pub cleanup_time: f64,
    pub total_time: f64,
}

impl RetrievalMetrics {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Timings of one backfill run, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillMetrics {
    pub embedding_time: f64,
    pub db_update_time: f64,
    pub total_time: f64,
}

/// A record the backfill engine could not embed this time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillFailure {
    pub id: String,
    pub cause: String,
}

/// Structured partial-failure outcome of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Ids whose vectors were written
    pub succeeded: Vec<String>,
    /// Ids left pending, with the provider error that kept them there
    pub failed: Vec<BackfillFailure>,
    /// Ids embedded but not written: the record was gone or already embedded
    #[serde(default)]
    pub skipped: Vec<String>,
    pub metrics: BackfillMetrics,
}

impl BackfillReport {
    pub fn updated_count(&self) -> usize {
        self.succeeded.len()
    }

    /// True when there was nothing pending to embed.
    pub fn is_noop(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Text of one page as produced by a [`TextExtractor`](crate::rag::TextExtractor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    pub page: u32,
}

/// Convert a duration into the float seconds used by every metrics struct.
pub fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}
