//! HTTP cross-encoder backend
//!
//! Talks to a reranking server exposing `GET /info` and `POST /rerank` in the
//! shape of text-embeddings-inference. The server keeps the weights; `load`
//! only verifies that the requested model is the one being served.

use async_trait::async_trait;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::{RerankerBackend, RerankerModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "cross-encoder";

#[derive(Debug, Clone)]
pub struct CrossEncoderConfig {
    /// Server root, e.g. `http://localhost:8080`
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CrossEncoderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 60,
        }
    }
}

impl CrossEncoderConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    model_id: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [&'a str],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RankedText {
    index: usize,
    score: f32,
}

fn map_error(err: reqwest::Error) -> RagError {
    RagError::provider(PROVIDER, err)
}

pub struct HttpCrossEncoder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCrossEncoder {
    pub fn new(config: CrossEncoderConfig) -> RagResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(map_error)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RerankerBackend for HttpCrossEncoder {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn load(&self, model_id: &str) -> RagResult<Box<dyn RerankerModel>> {
        let resp = self
            .client
            .get(format!("{}/info", self.base_url))
            .send()
            .await
            .map_err(map_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RagError::provider(
                PROVIDER,
                format!("GET /info returned {status}"),
            ));
        }
        let info: InfoResponse = resp.json().await.map_err(map_error)?;
        if info.model_id != model_id {
            return Err(RagError::NotFound(format!(
                "reranker model '{model_id}' (server has '{}')",
                info.model_id
            )));
        }

        Ok(Box::new(RemoteCrossEncoder {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model_id: info.model_id,
        }))
    }
}

struct RemoteCrossEncoder {
    client: reqwest::Client,
    base_url: String,
    model_id: String,
}

#[async_trait]
impl RerankerModel for RemoteCrossEncoder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn score(&self, query: &str, passage: &str) -> RagResult<f32> {
        let scores = self.score_batch(query, &[passage]).await?;
        scores
            .into_iter()
            .next()
            .ok_or_else(|| RagError::provider(PROVIDER, "empty rerank response"))
    }

    async fn score_batch(&self, query: &str, passages: &[&str]) -> RagResult<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .json(&RerankRequest {
                query,
                texts: passages,
                raw_scores: false,
            })
            .send()
            .await
            .map_err(map_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(map_error)?;
        if !status.is_success() {
            return Err(RagError::provider(
                PROVIDER,
                format!("POST /rerank returned {status}: {text}"),
            ));
        }
        let ranked: Vec<RankedText> = serde_json::from_str(&text)?;

        // The server sorts by score; put scores back in passage order.
        let mut scores = vec![None; passages.len()];
        for item in ranked {
            let slot = scores.get_mut(item.index).ok_or_else(|| {
                RagError::provider(PROVIDER, format!("score for unknown index {}", item.index))
            })?;
            *slot = Some(item.score);
        }
        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| {
                score.ok_or_else(|| RagError::provider(PROVIDER, format!("no score for passage {i}")))
            })
            .collect()
    }
}
