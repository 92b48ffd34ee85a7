//! Shared application state for the HTTP service

use async_trait::async_trait;
use ragline_foundation::llm::{ModelCatalog, OllamaClient, OllamaConfig};
use ragline_foundation::rag::{
    BackfillEngine, ChatGenerator, CrossEncoderConfig, HttpCrossEncoder, Ingestor, LlmSegmenter,
    DocumentExtractor, RetrievalOrchestrator, ScopedReranker, SqliteChunkStore, Workspace,
};
use ragline_kernel::RagResult;
use ragline_kernel::config::RaglineConfig;
use ragline_kernel::rag::{ChunkStore, Generator};
use std::sync::Arc;
use tracing::info;

/// Source of the installed-model listing behind `GET /models`.
#[async_trait]
pub trait ModelLister: Send + Sync {
    async fn catalog(&self) -> RagResult<ModelCatalog>;
}

#[async_trait]
impl ModelLister for OllamaClient {
    async fn catalog(&self) -> RagResult<ModelCatalog> {
        OllamaClient::catalog(self).await
    }
}

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RaglineConfig>,
    pub store: Arc<dyn ChunkStore>,
    pub workspace: Arc<Workspace>,
    pub ingestor: Arc<Ingestor>,
    pub backfill: Arc<BackfillEngine>,
    pub retrieval: Arc<RetrievalOrchestrator>,
    pub generator: Arc<dyn Generator>,
    pub models: Arc<dyn ModelLister>,
}

impl AppState {
    /// Wire the SQLite store, Ollama and the cross-encoder server from `config`.
    pub async fn from_config(config: RaglineConfig) -> RagResult<Self> {
        let storage = &config.storage;
        let workspace = Arc::new(Workspace::open(&storage.data_dir).await?);
        let store: Arc<dyn ChunkStore> = Arc::new(
            SqliteChunkStore::open(
                storage.database_path(),
                &storage.table_name,
                storage.vector_dim,
                storage.metric,
            )
            .await?,
        );

        let ollama = Arc::new(OllamaClient::new(
            OllamaConfig::new()
                .with_base_url(&config.ollama.base_url)
                .with_timeout(config.ollama.timeout_secs),
        )?);
        let cross_encoder = Arc::new(HttpCrossEncoder::new(
            CrossEncoderConfig::default()
                .with_base_url(&config.reranker.base_url)
                .with_timeout(config.reranker.timeout_secs),
        )?);
        let reranker = Arc::new(ScopedReranker::new(cross_encoder, config.reranker.policy));

        let segmenter = LlmSegmenter::new(ollama.clone())
            .with_window_chars(config.chunking.window_chars);
        let ingestor = Ingestor::new(
            store.clone(),
            Arc::new(DocumentExtractor::new()),
            Arc::new(segmenter),
        );

        info!(
            database = %storage.database_path().display(),
            vector_dim = storage.vector_dim,
            ollama = %config.ollama.base_url,
            reranker = %config.reranker.base_url,
            policy = ?config.reranker.policy,
            "application state ready"
        );

        Ok(Self {
            backfill: Arc::new(BackfillEngine::new(store.clone(), ollama.clone())),
            retrieval: Arc::new(RetrievalOrchestrator::new(
                store.clone(),
                ollama.clone(),
                reranker,
            )),
            generator: Arc::new(ChatGenerator::new(ollama.clone())),
            ingestor: Arc::new(ingestor),
            models: ollama,
            config: Arc::new(config),
            store,
            workspace,
        })
    }
}
