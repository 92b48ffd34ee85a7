//! Ragline Foundation
//!
//! Concrete implementations of the ragline-kernel contracts: chunk stores,
//! the embedding backfill engine, the scoped reranker, the retrieval
//! orchestrator, ingestion and generation, plus the Ollama and cross-encoder
//! HTTP clients.

// llm module - Ollama client
pub mod llm;

// rag module - stores, backfill, rerank, retrieval, ingestion
pub mod rag;

pub use ragline_kernel::{RagError, RagResult, RetrievalStage};
