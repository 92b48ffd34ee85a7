//! In-memory chunk store implementation
//!
//! Brute-force store backed by a `Vec` plus an id index. Suitable for
//! development, testing, and small corpora.

use crate::rag::distance::{compute_distance, nearest};
use async_trait::async_trait;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::{Candidate, ChunkRecord, ChunkStore, DistanceMetric};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Table {
    records: Vec<ChunkRecord>,
    index: HashMap<String, usize>,
}

/// In-memory chunk table using brute-force distance search.
///
/// # Example
///
/// ```rust,ignore
/// use ragline_foundation::rag::InMemoryChunkStore;
///
/// let store = InMemoryChunkStore::new(768);
/// store.insert(vec![ChunkRecord::pending("c-1", "Hello", "a.txt", 1, 768)]).await?;
/// ```
pub struct InMemoryChunkStore {
    table: RwLock<Table>,
    dim: usize,
    metric: DistanceMetric,
}

impl InMemoryChunkStore {
    /// Create an empty store with L2 distance.
    pub fn new(dim: usize) -> Self {
        Self::with_metric(dim, DistanceMetric::L2)
    }

    pub fn with_metric(dim: usize, metric: DistanceMetric) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            dim,
            metric,
        }
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    fn vector_dim(&self) -> usize {
        self.dim
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn insert(&self, records: Vec<ChunkRecord>) -> RagResult<()> {
        for record in &records {
            self.check_dim(&record.vector)?;
        }

        let mut table = self.table.write().await;
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if table.index.contains_key(&record.id) || !seen.insert(record.id.as_str()) {
                return Err(RagError::InvalidInput(format!(
                    "chunk id '{}' already exists",
                    record.id
                )));
            }
        }
        for record in records {
            let position = table.records.len();
            table.index.insert(record.id.clone(), position);
            table.records.push(record);
        }
        Ok(())
    }

    async fn scan_all(&self) -> RagResult<Vec<ChunkRecord>> {
        Ok(self.table.read().await.records.clone())
    }

    async fn update_vector(&self, id: &str, vector: Vec<f32>) -> RagResult<bool> {
        self.check_dim(&vector)?;

        let mut table = self.table.write().await;
        let Some(&position) = table.index.get(id) else {
            debug!(chunk_id = %id, "update_vector matched no record");
            return Ok(false);
        };
        let record = &mut table.records[position];
        if record.embedded {
            debug!(chunk_id = %id, "chunk already embedded, vector kept");
            return Ok(false);
        }
        record.vector = vector;
        record.embedded = true;
        Ok(true)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> RagResult<Vec<Candidate>> {
        let table = self.table.read().await;
        if table.records.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        self.check_dim(vector)?;

        let candidates = table
            .records
            .iter()
            .filter(|record| record.is_ready())
            .map(|record| Candidate {
                distance: compute_distance(&record.vector, vector, self.metric),
                record: record.clone(),
            })
            .collect();

        Ok(nearest(candidates, limit))
    }

    async fn count(&self) -> RagResult<usize> {
        Ok(self.table.read().await.records.len())
    }

    async fn reset(&self) -> RagResult<()> {
        let mut table = self.table.write().await;
        table.records.clear();
        table.index.clear();
        Ok(())
    }
}
