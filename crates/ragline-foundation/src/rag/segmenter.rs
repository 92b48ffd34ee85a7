//! LLM-driven semantic segmentation
//!
//! The text is cut into fixed-size windows; a chat model re-emits each window
//! with [`BOUNDARY_MARKER`] inserted where the topic shifts. The marked text
//! is then split on the marker.

use async_trait::async_trait;
use ragline_kernel::error::RagResult;
use ragline_kernel::llm::{ChatBackend, ChatMessage};
use ragline_kernel::rag::TextSegmenter;
use std::sync::Arc;
use tracing::{debug, warn};

pub const BOUNDARY_MARKER: char = '¶';

/// Default window size in characters.
pub const DEFAULT_WINDOW_CHARS: usize = 2000;

const SEGMENTER_PROMPT: &str = "You are a semantic parser. Repeat the user's text exactly, \
inserting the character '¶' wherever the topic or meaning shifts significantly. \
Do not rewrite, summarize or add words, and do not add any preamble or closing remarks. \
Output only the original text with '¶' inserted.";

/// Split `text` into windows of at most `size` characters, on char boundaries.
pub fn char_windows(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in text.char_indices() {
        if count == size {
            windows.push(&text[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        windows.push(&text[start..]);
    }
    windows
}

/// Split marked text into trimmed, non-empty chunks.
pub fn split_marked(marked: &str) -> Vec<String> {
    marked
        .split(BOUNDARY_MARKER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// [`TextSegmenter`] backed by a chat model.
pub struct LlmSegmenter {
    chat: Arc<dyn ChatBackend>,
    window_chars: usize,
}

impl LlmSegmenter {
    pub fn new(chat: Arc<dyn ChatBackend>) -> Self {
        Self {
            chat,
            window_chars: DEFAULT_WINDOW_CHARS,
        }
    }

    pub fn with_window_chars(mut self, window_chars: usize) -> Self {
        self.window_chars = window_chars.max(1);
        self
    }
}

#[async_trait]
impl TextSegmenter for LlmSegmenter {
    async fn segment(&self, text: &str, model_id: &str) -> RagResult<Vec<String>> {
        let windows = char_windows(text, self.window_chars);
        let mut marked = String::with_capacity(text.len() + windows.len());

        for (index, window) in windows.iter().enumerate() {
            let messages = vec![
                ChatMessage::system(SEGMENTER_PROMPT),
                ChatMessage::user(*window),
            ];
            match self.chat.chat(model_id, messages).await {
                Ok(response) => marked.push_str(&response.content),
                Err(e) => {
                    warn!(
                        window = index,
                        model = model_id,
                        error = %e,
                        "segmentation failed, keeping window unmarked"
                    );
                    marked.push_str(window);
                }
            }
        }

        let chunks = split_marked(&marked);
        debug!(windows = windows.len(), chunks = chunks.len(), "text segmented");
        Ok(chunks)
    }
}
