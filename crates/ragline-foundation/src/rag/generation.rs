//! Answer generation over a chat backend
//!
//! [`ChatGenerator`] sends the retrieved context and the question to a chat
//! model. Streaming answers go through [`TokenMeter`], which keeps a running
//! token count and rate and closes the stream with a summary event.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use ragline_kernel::error::RagResult;
use ragline_kernel::llm::{ChatBackend, ChatDelta, ChatDeltaStream, ChatMessage};
use ragline_kernel::rag::generation::{SYSTEM_PROMPT, throughput};
use ragline_kernel::rag::types::secs;
use ragline_kernel::rag::{
    GenerationEvent, GenerationMetrics, GenerationOutput, GenerationRequest, GenerationStream,
    Generator,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Running token statistics for one streamed answer.
///
/// Every increment counts as one token.
#[derive(Debug, Clone, Copy)]
pub struct TokenMeter {
    started: Instant,
    token_count: u64,
}

impl TokenMeter {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            token_count: 0,
        }
    }

    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    /// Count one increment and turn it into an event.
    pub fn record(&mut self, delta: ChatDelta) -> GenerationEvent {
        self.token_count += 1;
        GenerationEvent::Delta {
            content: delta.content,
            token_count: self.token_count,
            tokens_per_sec: throughput(self.token_count, secs(self.started.elapsed())),
            done: delta.done,
        }
    }

    pub fn summary(&self) -> GenerationEvent {
        GenerationEvent::Summary {
            done: true,
            metrics: GenerationMetrics::new(secs(self.started.elapsed()), self.token_count),
        }
    }

    /// Meter a raw delta stream. The summary is emitted once the input ends;
    /// an error ends the stream without one.
    pub fn meter(deltas: ChatDeltaStream) -> GenerationStream {
        let state = (deltas, Some(Self::start()));
        Box::pin(stream::unfold(state, |(mut deltas, meter)| async move {
            let mut meter = meter?;
            match deltas.next().await {
                Some(Ok(delta)) => {
                    let event = meter.record(delta);
                    Some((Ok(event), (deltas, Some(meter))))
                }
                Some(Err(e)) => Some((Err(e), (deltas, None))),
                None => Some((Ok(meter.summary()), (deltas, None))),
            }
        }))
    }
}

/// [`Generator`] that prompts a chat model with the retrieved context.
pub struct ChatGenerator {
    chat: Arc<dyn ChatBackend>,
}

impl ChatGenerator {
    pub fn new(chat: Arc<dyn ChatBackend>) -> Self {
        Self { chat }
    }

    fn messages(request: &GenerationRequest) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(request.prompt()),
        ]
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn generate(&self, request: &GenerationRequest) -> RagResult<GenerationOutput> {
        let started = Instant::now();
        let response = self
            .chat
            .chat(&request.model, Self::messages(request))
            .await?;
        let generation_time = secs(started.elapsed());

        let token_count = response
            .eval_count
            .map(u64::from)
            .unwrap_or_else(|| response.content.split_whitespace().count() as u64);
        debug!(model = %request.model, token_count, generation_time, "answer generated");

        Ok(GenerationOutput {
            answer: response.content,
            metrics: GenerationMetrics::new(generation_time, token_count),
        })
    }

    async fn stream(&self, request: GenerationRequest) -> RagResult<GenerationStream> {
        let deltas = self
            .chat
            .chat_stream(&request.model, Self::messages(&request))
            .await?;
        Ok(TokenMeter::meter(deltas))
    }
}
