//! LLM backends
//!
//! Concrete clients for the chat and embedding contracts in ragline-kernel.

pub mod ollama;

pub use ollama::{ModelCatalog, ModelInfo, OllamaClient, OllamaConfig};
