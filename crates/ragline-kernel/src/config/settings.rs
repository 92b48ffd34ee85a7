//! Typed settings for a ragline deployment

use crate::error::{RagError, RagResult};
use crate::rag::DistanceMetric;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration. Every field has a default so an empty file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaglineConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub ollama: OllamaSettings,
    pub reranker: RerankerSettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub backfill: BackfillSettings,
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub table_name: String,
    /// Width of the vector column; must match the embedding model's output
    pub vector_dim: usize,
    pub metric: DistanceMetric,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            table_name: "docs".to_string(),
            vector_dim: 2560,
            metric: DistanceMetric::L2,
        }
    }
}

impl StorageSettings {
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.sqlite3", self.table_name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

/// How long a loaded cross-encoder stays resident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerPolicy {
    /// Load at the start of the reranking stage, unload before the call returns
    #[default]
    PerCall,
    /// Keep one model resident behind a mutex, shared by serialized calls
    Pooled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub policy: RerankerPolicy,
    pub default_model: String,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 60,
            policy: RerankerPolicy::PerCall,
            default_model: "BAAI/bge-reranker-v2-m3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub default_model: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            default_model: "qwen3-embedding:4b".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub default_model: String,
    /// Characters sent to the segmenting model per request
    pub window_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            default_model: "llama3.1:8b".to_string(),
            window_chars: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillSettings {
    /// Maximum embedding requests in flight at once
    pub batch_size: usize,
}

impl Default for BackfillSettings {
    fn default() -> Self {
        Self { batch_size: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_top_k: usize,
    /// Per-call budget; stages that would start after it expires are skipped
    pub deadline_ms: Option<u64>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            deadline_ms: None,
        }
    }
}

impl RaglineConfig {
    /// Load from an optional file plus `RAGLINE_*` environment overrides.
    pub fn load(path: Option<&str>) -> RagResult<Self> {
        let config: Self = super::load_with_env(path, "RAGLINE")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RagResult<()> {
        if self.storage.vector_dim == 0 {
            return Err(RagError::Configuration(
                "storage.vector_dim must be greater than 0".to_string(),
            ));
        }
        if self.storage.table_name.trim().is_empty() {
            return Err(RagError::Configuration(
                "storage.table_name is required".to_string(),
            ));
        }
        if self.backfill.batch_size == 0 {
            return Err(RagError::Configuration(
                "backfill.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.retrieval.default_top_k == 0 {
            return Err(RagError::Configuration(
                "retrieval.default_top_k must be greater than 0".to_string(),
            ));
        }
        if self.chunking.window_chars == 0 {
            return Err(RagError::Configuration(
                "chunking.window_chars must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
