//! Generation adapter contract
//!
//! Consumes retrieved context plus the query and produces an answer, either
//! in one piece or as a stream of increments with running token metrics.

use crate::error::RagResult;
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Query plus the retrieved context it should be answered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub query: String,
    pub context: String,
    pub model: String,
}

impl GenerationRequest {
    pub fn new(
        query: impl Into<String>,
        context: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            context: context.into(),
            model: model.into(),
        }
    }

    /// User prompt sent to the chat model.
    pub fn prompt(&self) -> String {
        format!(
            "Answer based on the context below.\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
            self.context, self.query
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    /// Seconds from request to final token
    pub generation_time: f64,
    pub token_count: u64,
    pub tokens_per_sec: f64,
}

impl GenerationMetrics {
    pub fn new(generation_time: f64, token_count: u64) -> Self {
        Self {
            generation_time,
            token_count,
            tokens_per_sec: throughput(token_count, generation_time),
        }
    }
}

/// Tokens per second, or zero when no time has elapsed.
pub fn throughput(token_count: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        token_count as f64 / elapsed_secs
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub answer: String,
    pub metrics: GenerationMetrics,
}

/// One event of a streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationEvent {
    /// An increment with the running token count and throughput.
    Delta {
        content: String,
        token_count: u64,
        tokens_per_sec: f64,
        done: bool,
    },
    /// Final record, emitted exactly once at the end of the stream.
    Summary {
        done: bool,
        metrics: GenerationMetrics,
    },
}

impl GenerationEvent {
    pub fn is_summary(&self) -> bool {
        matches!(self, Self::Summary { .. })
    }
}

pub type GenerationStream = Pin<Box<dyn Stream<Item = RagResult<GenerationEvent>> + Send>>;

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> RagResult<GenerationOutput>;

    async fn stream(&self, request: GenerationRequest) -> RagResult<GenerationStream>;
}
