//! RAG (Retrieval-Augmented Generation) implementations
//!
//! Provides concrete implementations of the chunk store, reranker and
//! generation contracts defined in ragline-kernel, along with the backfill
//! engine, the retrieval orchestrator and the ingestion pipeline.

pub mod backfill;
pub mod cross_encoder;
pub mod distance;
pub mod generation;
pub mod ingest;
pub mod loaders;
pub mod memory_store;
pub mod reranker;
pub mod retrieval;
pub mod segmenter;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod workspace;

pub use backfill::BackfillEngine;
pub use cross_encoder::{CrossEncoderConfig, HttpCrossEncoder};
pub use distance::compute_distance;
pub use generation::{ChatGenerator, TokenMeter};
pub use ingest::{Ingestor, ProcessMetrics, ProcessReport};
pub use loaders::{DocumentExtractor, PlainTextExtractor};
#[cfg(feature = "pdf")]
pub use loaders::PdfExtractor;
pub use memory_store::InMemoryChunkStore;
pub use reranker::{LeaseTiming, RerankerLease, RerankerPolicy, ScopedReranker};
pub use retrieval::{RetrievalOrchestrator, RetrieveRequest};
pub use segmenter::LlmSegmenter;
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteChunkStore;
pub use workspace::Workspace;

// Re-export kernel types for convenience
pub use ragline_kernel::rag::{
    BackfillReport, Candidate, ChunkRecord, ChunkStore, DistanceMetric, EmbeddingProvider,
    RerankerBackend, RerankerModel, RetrievalMetrics, RetrievalResult,
};
