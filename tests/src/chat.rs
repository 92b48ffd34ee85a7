use async_trait::async_trait;
use futures::stream;
use ragline_foundation::llm::{ModelCatalog, ModelInfo};
use ragline_gateway::ModelLister;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::llm::{
    ChatBackend, ChatDelta, ChatDeltaStream, ChatMessage, ChatResponse, ChatRole,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A chat backend that replays a scripted answer.
///
/// Without a scripted reply it echoes the last user message back, which
/// makes segmentation a no-op split on any `¶` already in the text.
#[derive(Clone, Default)]
pub struct ScriptedChatBackend {
    reply: Arc<RwLock<Option<String>>>,
    deltas: Arc<RwLock<Vec<String>>>,
    eval_count: Arc<RwLock<Option<u32>>>,
    failing: Arc<RwLock<bool>>,
    /// Every message list sent to the backend
    pub call_history: Arc<RwLock<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_reply(&self, reply: &str, eval_count: Option<u32>) {
        *self.reply.write().await = Some(reply.to_string());
        *self.eval_count.write().await = eval_count;
    }

    /// Increments yielded by `chat_stream`; the last one carries `done`.
    pub async fn set_deltas(&self, deltas: &[&str]) {
        *self.deltas.write().await = deltas.iter().map(|d| d.to_string()).collect();
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    pub async fn history(&self) -> Vec<Vec<ChatMessage>> {
        self.call_history.read().await.clone()
    }

    async fn answer(&self, messages: &[ChatMessage]) -> RagResult<String> {
        self.call_history.write().await.push(messages.to_vec());
        if *self.failing.read().await {
            return Err(RagError::provider("scripted-chat", "backend offline"));
        }
        if let Some(reply) = self.reply.read().await.clone() {
            return Ok(reply);
        }
        Ok(messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatBackend for ScriptedChatBackend {
    fn name(&self) -> &str {
        "scripted-chat"
    }

    async fn chat(&self, _model: &str, messages: Vec<ChatMessage>) -> RagResult<ChatResponse> {
        let content = self.answer(&messages).await?;
        Ok(ChatResponse {
            content,
            eval_count: *self.eval_count.read().await,
        })
    }

    async fn chat_stream(
        &self,
        _model: &str,
        messages: Vec<ChatMessage>,
    ) -> RagResult<ChatDeltaStream> {
        let answer = self.answer(&messages).await?;
        let mut deltas = self.deltas.read().await.clone();
        if deltas.is_empty() {
            deltas.push(answer);
        }
        let last = deltas.len() - 1;
        let items: Vec<RagResult<ChatDelta>> = deltas
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                Ok(ChatDelta {
                    content,
                    done: i == last,
                })
            })
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

/// A fixed model listing.
#[derive(Clone, Default)]
pub struct FakeModelLister {
    pub models: Vec<ModelInfo>,
}

impl FakeModelLister {
    pub fn with_models(ids: &[&str]) -> Self {
        Self {
            models: ids
                .iter()
                .map(|id| ModelInfo {
                    name: id.to_string(),
                    model: id.to_string(),
                    details: Default::default(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ModelLister for FakeModelLister {
    async fn catalog(&self) -> RagResult<ModelCatalog> {
        Ok(ModelCatalog::partition(self.models.clone()))
    }
}
