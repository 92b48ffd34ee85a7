use async_trait::async_trait;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::EmbeddingProvider;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A deterministic embedding provider.
///
/// Texts registered with [`set_vector`](Self::set_vector) embed to that
/// vector; anything else embeds to `[len, 1.0, 1.0, ...]`. Every call is
/// recorded so tests can assert exactly which texts were embedded.
#[derive(Clone)]
pub struct FakeEmbeddingProvider {
    dim: usize,
    vectors: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    /// Every text passed to `embed`, in call order
    pub call_history: Arc<RwLock<Vec<String>>>,
}

impl FakeEmbeddingProvider {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Arc::new(RwLock::new(HashMap::new())),
            failing: Arc::new(RwLock::new(HashSet::new())),
            delay: Arc::new(RwLock::new(None)),
            call_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_vector(&self, text: &str, vector: Vec<f32>) {
        self.vectors.write().await.insert(text.to_string(), vector);
    }

    /// Make `embed` fail with a provider error for this exact text.
    pub async fn fail_on(&self, text: &str) {
        self.failing.write().await.insert(text.to_string());
    }

    pub async fn recover(&self, text: &str) {
        self.failing.write().await.remove(text);
    }

    /// Sleep this long inside every `embed` call, after recording it.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn history(&self) -> Vec<String> {
        self.call_history.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_history.read().await.len()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    fn name(&self) -> &str {
        "fake-embedding"
    }

    async fn embed(&self, text: &str, _model_id: &str) -> RagResult<Vec<f32>> {
        self.call_history.write().await.push(text.to_string());
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.read().await.contains(text) {
            return Err(RagError::provider("fake-embedding", format!("refused '{text}'")));
        }
        if let Some(vector) = self.vectors.read().await.get(text) {
            return Ok(vector.clone());
        }
        let mut vector = vec![1.0; self.dim];
        if let Some(first) = vector.first_mut() {
            *first = text.len() as f32;
        }
        Ok(vector)
    }
}
