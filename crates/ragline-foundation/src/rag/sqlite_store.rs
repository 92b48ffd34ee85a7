//! SQLite-backed chunk store
//!
//! One table per corpus, keyed by chunk id, with a fixed-width vector column
//! stored as a little-endian `f32` blob. Nearest-neighbour search is a
//! brute-force scan over embedded rows.

use crate::rag::distance::{compute_distance, nearest};
use async_trait::async_trait;
use ragline_kernel::error::{RagError, RagResult};
use ragline_kernel::rag::{Candidate, ChunkRecord, ChunkStore, DistanceMetric};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::path::Path;
use tracing::{debug, info};

const META_TABLE: &str = "ragline_meta";

/// Persistent chunk table in a SQLite database.
pub struct SqliteChunkStore {
    pool: SqlitePool,
    table: String,
    dim: usize,
    metric: DistanceMetric,
}

fn map_sqlx(err: sqlx::Error) -> RagError {
    RagError::storage(err)
}

/// The chunk table was dropped underneath the query, e.g. by a concurrent reset.
fn is_missing_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.message().starts_with("no such table"))
}

fn validate_table_name(name: &str) -> RagResult<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if !valid || name == META_TABLE {
        return Err(RagError::Configuration(format!(
            "invalid table name '{name}': use letters, digits and '_'"
        )));
    }
    Ok(())
}

pub(crate) fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn decode_vector(bytes: &[u8]) -> RagResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(RagError::storage(format!(
            "corrupt vector blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl SqliteChunkStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(
        path: impl AsRef<Path>,
        table: &str,
        dim: usize,
        metric: DistanceMetric,
    ) -> RagResult<Self> {
        validate_table_name(table)?;
        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(map_sqlx)?;

        Self::from_pool(pool, table, dim, metric).await
    }

    /// Single-connection in-memory database; contents vanish with the store.
    pub async fn in_memory(table: &str, dim: usize, metric: DistanceMetric) -> RagResult<Self> {
        validate_table_name(table)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(map_sqlx)?;

        Self::from_pool(pool, table, dim, metric).await
    }

    pub async fn from_pool(
        pool: SqlitePool,
        table: &str,
        dim: usize,
        metric: DistanceMetric,
    ) -> RagResult<Self> {
        validate_table_name(table)?;
        let store = Self {
            pool,
            table: table.to_string(),
            dim,
            metric,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the chunk table and record its vector width.
    ///
    /// Reopening a table with a different width is a configuration error.
    pub async fn run_migrations(&self) -> RagResult<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {META_TABLE} (
                table_name TEXT PRIMARY KEY,
                vector_dim INTEGER NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let stored: Option<i64> = sqlx::query(&format!(
            "SELECT vector_dim FROM {META_TABLE} WHERE table_name = ?"
        ))
        .bind(&self.table)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .map(|row| row.try_get("vector_dim"))
        .transpose()
        .map_err(map_sqlx)?;

        match stored {
            Some(stored) if stored as usize != self.dim => {
                return Err(RagError::DimensionMismatch {
                    expected: stored as usize,
                    actual: self.dim,
                });
            }
            Some(_) => {}
            None => {
                sqlx::query(&format!(
                    "INSERT INTO {META_TABLE} (table_name, vector_dim) VALUES (?, ?)"
                ))
                .bind(&self.table)
                .bind(self.dim as i64)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx)?;
            }
        }

        self.create_table().await
    }

    async fn create_table(&self) -> RagResult<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER NOT NULL,
                embedded INTEGER NOT NULL DEFAULT 0,
                vector BLOB NOT NULL
            )",
            self.table
        ))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    fn row_to_record(row: &SqliteRow) -> RagResult<ChunkRecord> {
        let page: i64 = row.try_get("page").map_err(map_sqlx)?;
        let blob: Vec<u8> = row.try_get("vector").map_err(map_sqlx)?;
        Ok(ChunkRecord {
            id: row.try_get("id").map_err(map_sqlx)?,
            text: row.try_get("text").map_err(map_sqlx)?,
            source: row.try_get("source").map_err(map_sqlx)?,
            page: u32::try_from(page)
                .map_err(|_| RagError::storage(format!("page {page} out of range")))?,
            vector: decode_vector(&blob)?,
            embedded: row.try_get("embedded").map_err(map_sqlx)?,
        })
    }

    async fn select(&self, only_embedded: bool) -> RagResult<Vec<ChunkRecord>> {
        let filter = if only_embedded { "WHERE embedded = 1" } else { "" };
        let rows = match sqlx::query(&format!(
            "SELECT id, text, source, page, embedded, vector FROM {} {filter} ORDER BY seq",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
            Err(e) => return Err(map_sqlx(e)),
        };

        rows.iter().map(Self::row_to_record).collect()
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
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
        if records.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO {} (id, text, source, page, embedded, vector) VALUES (?, ?, ?, ?, ?, ?)",
            self.table
        );
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for record in &records {
            sqlx::query(&sql)
                .bind(&record.id)
                .bind(&record.text)
                .bind(&record.source)
                .bind(i64::from(record.page))
                .bind(record.embedded)
                .bind(encode_vector(&record.vector))
                .execute(&mut *tx)
                .await
                .map_err(|e| match e.as_database_error() {
                    Some(db) if db.is_unique_violation() => RagError::InvalidInput(format!(
                        "chunk id '{}' already exists",
                        record.id
                    )),
                    _ => map_sqlx(e),
                })?;
        }
        tx.commit().await.map_err(map_sqlx)?;

        debug!(table = %self.table, count = records.len(), "inserted chunk records");
        Ok(())
    }

    async fn scan_all(&self) -> RagResult<Vec<ChunkRecord>> {
        self.select(false).await
    }

    async fn update_vector(&self, id: &str, vector: Vec<f32>) -> RagResult<bool> {
        self.check_dim(&vector)?;

        // Single statement, so readers observe either the old or the new vector.
        // Only pending rows match: a vector is written at most once.
        let result = sqlx::query(&format!(
            "UPDATE {} SET vector = ?, embedded = 1 WHERE id = ? AND embedded = 0",
            self.table
        ))
        .bind(encode_vector(&vector))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let matched = result.rows_affected() > 0;
        if !matched {
            debug!(chunk_id = %id, "update_vector matched no pending record");
        }
        Ok(matched)
    }

    async fn search(&self, vector: &[f32], limit: usize) -> RagResult<Vec<Candidate>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let records = self.select(true).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dim(vector)?;

        let candidates = records
            .into_iter()
            .map(|record| Candidate {
                distance: compute_distance(&record.vector, vector, self.metric),
                record,
            })
            .collect();
        Ok(nearest(candidates, limit))
    }

    async fn count(&self) -> RagResult<usize> {
        let row = match sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
        {
            Ok(row) => row,
            Err(e) if is_missing_table(&e) => return Ok(0),
            Err(e) => return Err(map_sqlx(e)),
        };
        let n: i64 = row.try_get("n").map_err(map_sqlx)?;
        Ok(n as usize)
    }

    async fn reset(&self) -> RagResult<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", self.table))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        self.create_table().await?;
        info!(table = %self.table, "chunk table reset");
        Ok(())
    }
}
