//! Ollama HTTP client
//!
//! Covers the native endpoints ragline needs: `/api/embeddings` for chunk and
//! query vectors, `/api/chat` for segmentation and answers (whole or NDJSON
//! streamed), and `/api/tags` for the model listing.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::llm::{ChatBackend, ChatDelta, ChatDeltaStream, ChatMessage, ChatResponse};
use ragline_kernel::rag::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "ollama";

/// Ollama client configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root (default: http://localhost:11434)
    pub base_url: String,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// One entry of `GET /api/tags`. Fields ragline does not use are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ModelInfo {
    /// Model tag, preferring `model` over `name`.
    pub fn id(&self) -> &str {
        if self.model.is_empty() {
            &self.name
        } else {
            &self.model
        }
    }

    pub fn is_embedding(&self) -> bool {
        self.id().to_lowercase().contains("embedding")
    }
}

/// Installed models split by purpose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub models: Vec<ModelInfo>,
    pub embedding_models: Vec<ModelInfo>,
    pub generation_models: Vec<ModelInfo>,
}

impl ModelCatalog {
    /// Models whose tag mentions "embedding" are embedding models; the rest generate.
    pub fn partition(models: Vec<ModelInfo>) -> Self {
        let (embedding_models, generation_models): (Vec<_>, Vec<_>) =
            models.iter().cloned().partition(ModelInfo::is_embedding);
        Self {
            models,
            embedding_models,
            generation_models,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatMessageBody {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatChunk {
    message: Option<ChatMessageBody>,
    #[serde(default)]
    done: bool,
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

fn map_error(err: reqwest::Error) -> RagError {
    RagError::provider(PROVIDER, err)
}

fn parse_chunk(line: &[u8]) -> RagResult<ChatDelta> {
    let chunk: ChatChunk = serde_json::from_slice(line)?;
    Ok(ChatDelta {
        content: chunk.message.map(|m| m.content).unwrap_or_default(),
        done: chunk.done,
    })
}

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> RagResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(map_error)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> RagResult<reqwest::Response> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(map_error)?;
        ensure_success(path, resp).await
    }

    /// Installed models, as reported by `GET /api/tags`.
    pub async fn list_models(&self) -> RagResult<Vec<ModelInfo>> {
        let resp = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(map_error)?;
        let tags: TagsResponse = ensure_success("/api/tags", resp)
            .await?
            .json()
            .await
            .map_err(map_error)?;
        Ok(tags.models)
    }

    pub async fn catalog(&self) -> RagResult<ModelCatalog> {
        Ok(ModelCatalog::partition(self.list_models().await?))
    }
}

async fn ensure_success(path: &str, resp: reqwest::Response) -> RagResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RagError::provider(
        PROVIDER,
        format!("{path} returned {status}: {body}"),
    ))
}

#[async_trait]
impl EmbeddingProvider for OllamaClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str, model_id: &str) -> RagResult<Vec<f32>> {
        let resp: EmbeddingsResponse = self
            .post(
                "/api/embeddings",
                &EmbeddingsRequest {
                    model: model_id,
                    prompt: text,
                },
            )
            .await?
            .json()
            .await
            .map_err(map_error)?;
        Ok(resp.embedding)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> RagResult<ChatResponse> {
        let chunk: ChatChunk = self
            .post(
                "/api/chat",
                &ChatRequest {
                    model,
                    messages: &messages,
                    stream: false,
                },
            )
            .await?
            .json()
            .await
            .map_err(map_error)?;

        debug!(model, eval_count = ?chunk.eval_count, "chat completed");
        Ok(ChatResponse {
            content: chunk.message.map(|m| m.content).unwrap_or_default(),
            eval_count: chunk.eval_count,
        })
    }

    async fn chat_stream(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> RagResult<ChatDeltaStream> {
        let resp = self
            .post(
                "/api/chat",
                &ChatRequest {
                    model,
                    messages: &messages,
                    stream: true,
                },
            )
            .await?;

        // One JSON object per line; network chunks may split or join lines.
        let state = (resp.bytes_stream(), Vec::<u8>::new(), false);
        let deltas = stream::unfold(state, |(mut bytes, mut buf, finished)| async move {
            if finished {
                return None;
            }
            loop {
                if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    let delta = parse_chunk(&line);
                    let failed = delta.is_err();
                    return Some((delta, (bytes, buf, failed)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                    Some(Err(e)) => return Some((Err(map_error(e)), (bytes, buf, true))),
                    None => {
                        if buf.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        let delta = parse_chunk(&buf);
                        return Some((delta, (bytes, Vec::new(), true)));
                    }
                }
            }
        });
        Ok(Box::pin(deltas))
    }
}
