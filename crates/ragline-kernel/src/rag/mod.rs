//! RAG (Retrieval-Augmented Generation) traits and types
//!
//! Defines the core abstractions for the chunk table, embedding, reranking,
//! ingestion and generation. Concrete implementations live in
//! ragline-foundation.

pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod reranker;
pub mod store;
pub mod types;

pub use embedding::EmbeddingProvider;
pub use generation::{
    GenerationEvent, GenerationMetrics, GenerationOutput, GenerationRequest, GenerationStream,
    Generator,
};
pub use ingest::{TextExtractor, TextSegmenter};
pub use reranker::{RerankerBackend, RerankerModel};
pub use store::{ChunkStore, DistanceMetric};
pub use types::{
    BackfillFailure, BackfillMetrics, BackfillReport, CANDIDATE_POOL_SIZE, Candidate, ChunkRecord,
    PAGELESS, PageText, RetrievalMetrics, RetrievalResult,
};
