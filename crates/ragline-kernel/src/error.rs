//! Error taxonomy shared by every ragline crate
//!
//! Retrieval never degrades silently: every failure carries the stage that
//! failed and the underlying cause.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type used across the kernel contracts.
pub type RagResult<T> = Result<T, RagError>;

/// Pipeline stage of a single retrieval call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStage {
    Embedding,
    VectorSearch,
    Reranking,
    Cleanup,
}

impl RetrievalStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::VectorSearch => "vector_search",
            Self::Reranking => "reranking",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for RetrievalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ragline error type
#[derive(Debug, Error)]
pub enum RagError {
    /// Missing source file, table or record
    #[error("Not found: {0}")]
    NotFound(String),

    /// Embedding, reranker or chat backend failure. Retryable by the caller.
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// Invalid configuration (bad `top_k`, zero batch size, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Vector width does not match the store's fixed column width
    #[error("Configuration error: vector dimension mismatch (expected {expected}, got {actual})")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A retrieval stage failed; the whole call is aborted
    #[error("Retrieval failed at stage '{stage}': {source}")]
    RetrievalFailed {
        stage: RetrievalStage,
        #[source]
        source: Box<RagError>,
    },

    /// The caller's deadline passed before the named stage could start
    #[error("Deadline exceeded before stage '{stage}'")]
    DeadlineExceeded { stage: RetrievalStage },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl RagError {
    pub fn provider(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    pub fn retrieval_failed(stage: RetrievalStage, source: RagError) -> Self {
        Self::RetrievalFailed {
            stage,
            source: Box::new(source),
        }
    }

    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Stage the error is attributed to, if any.
    pub fn stage(&self) -> Option<RetrievalStage> {
        match self {
            Self::RetrievalFailed { stage, .. } | Self::DeadlineExceeded { stage } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::DimensionMismatch { .. } => true,
            Self::RetrievalFailed { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Only backend failures are worth retrying; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { .. } => true,
            Self::RetrievalFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            RagError::NotFound(err.to_string())
        } else {
            RagError::Io(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}
