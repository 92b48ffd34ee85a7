//! Ragline Kernel
//!
//! Contracts and data types for the retrieval-and-rerank core:
//!
//! - [`rag::ChunkStore`]: the persistent chunk table
//! - [`rag::EmbeddingProvider`]: `text -> vector`
//! - [`rag::RerankerBackend`] / [`rag::RerankerModel`]: cross-encoder scoring
//! - [`rag::TextExtractor`] / [`rag::TextSegmenter`]: ingestion collaborators
//! - [`rag::Generator`] and [`llm::ChatBackend`]: answer generation
//!
//! Implementations live in `ragline-foundation`.

// error module
pub mod error;

// chat completion contract
pub mod llm;

// retrieval contracts and types
pub mod rag;

// configuration loader
#[cfg(feature = "config")]
pub mod config;

pub use error::{RagError, RagResult, RetrievalStage};
