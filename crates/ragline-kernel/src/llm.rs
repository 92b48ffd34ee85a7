//! Chat completion contract used by the segmenter and the generation adapter

use crate::error::RagResult;
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A complete (non-streaming) chat answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
    /// Tokens generated, when the provider reports it
    pub eval_count: Option<u32>,
}

/// One increment of a streamed chat answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDelta {
    pub content: String,
    pub done: bool,
}

pub type ChatDeltaStream = Pin<Box<dyn Stream<Item = RagResult<ChatDelta>> + Send>>;

/// External chat-completion service.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> RagResult<ChatResponse>;

    /// Stream the answer as it is produced.
    ///
    /// Default implementation falls back to `chat()` and yields the result as a single delta.
    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> RagResult<ChatDeltaStream> {
        let response = self.chat(model, messages).await?;
        let stream = futures::stream::once(async move {
            Ok(ChatDelta {
                content: response.content,
                done: true,
            })
        });
        Ok(Box::pin(stream))
    }
}
