//! PostgreSQL + pgvector store
//!
//! Schema (created when `vector_db.initialize_schema` is set):
//!
//! ```sql
//! CREATE TABLE <table> (
//!     id uuid PRIMARY KEY,
//!     content text NOT NULL,
//!     metadata jsonb NOT NULL DEFAULT '{}',
//!     embedding vector(<dimensions>)
//! );
//! CREATE INDEX ON <table> USING hnsw (embedding vector_cosine_ops);
//! ```

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, ChunkMetadata, RetrievedChunk, SearchFilter};

use super::VectorStoreProvider;

/// pgvector-backed chunk store using cosine distance (`<=>`)
pub struct PgVectorStore {
    pool: PgPool,
    table: String,
    dimensions: usize,
}

impl PgVectorStore {
    /// Connect, optionally create the schema, and verify the column width
    pub async fn connect(config: &VectorDbConfig, dimensions: usize) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| Error::vector_db(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let store = Self::from_pool(pool, &config.table, dimensions)?;
        if config.initialize_schema {
            store.initialize_schema().await?;
        }
        store.verify_dimensions().await?;

        tracing::info!(table = %store.table, dimensions, "pgvector store ready");
        Ok(store)
    }

    /// Wrap an existing pool without touching the database
    pub fn from_pool(pool: PgPool, table: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            pool,
            table: sanitize_table_name(table)?,
            dimensions,
        })
    }

    /// Create the extension, table and HNSW index if missing
    pub async fn initialize_schema(&self) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id uuid PRIMARY KEY, \
                content text NOT NULL, \
                metadata jsonb NOT NULL DEFAULT '{{}}'::jsonb, \
                embedding vector({dims})\
            )",
            table = self.table,
            dims = self.dimensions
        );
        sqlx::query(&create_table).execute(&self.pool).await?;

        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_embedding_idx \
             ON {table} USING hnsw (embedding vector_cosine_ops)",
            table = self.table
        );
        sqlx::query(&create_index).execute(&self.pool).await?;

        tracing::debug!(table = %self.table, "pgvector schema initialized");
        Ok(())
    }

    /// Fail when the `embedding` column width differs from the configured one
    pub async fn verify_dimensions(&self) -> Result<()> {
        let row = sqlx::query(
            "SELECT a.atttypmod AS width FROM pg_attribute a \
             WHERE a.attrelid = to_regclass($1) AND a.attname = 'embedding' AND NOT a.attisdropped",
        )
        .bind(&self.table)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(Error::Config(format!(
                "Table '{}' with an embedding column does not exist; \
                 enable vector_db.initialize_schema or create it",
                self.table
            )));
        };

        let width: i32 = row.try_get("width")?;
        if width < 0 {
            tracing::warn!(table = %self.table, "embedding column has no fixed width");
            return Ok(());
        }
        if width as usize != self.dimensions {
            return Err(Error::Config(format!(
                "Column {}.embedding is vector({}) but embeddings.dimensions is {}",
                self.table, width, self.dimensions
            )));
        }
        Ok(())
    }

    fn check_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            Error::check_dimensions(self.dimensions, chunk.embedding.len())?;
        }
        Ok(())
    }

    /// Upsert chunks inside an open transaction
    async fn insert_chunks(&self, tx: &mut Transaction<'_, Postgres>, chunks: &[Chunk]) -> Result<()> {
        let insert = format!(
            "INSERT INTO {} (id, content, metadata, embedding) \
             VALUES ($1::uuid, $2, $3::jsonb, $4::vector) \
             ON CONFLICT (id) DO UPDATE SET \
                content = EXCLUDED.content, \
                metadata = EXCLUDED.metadata, \
                embedding = EXCLUDED.embedding",
            self.table
        );

        for chunk in chunks {
            sqlx::query(&insert)
                .bind(chunk.id.to_string())
                .bind(&chunk.content)
                .bind(serde_json::to_string(&chunk.metadata)?)
                .bind(vector_literal(&chunk.embedding))
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    fn row_to_result(row: &PgRow) -> Result<RetrievedChunk> {
        let id: String = row.try_get("id")?;
        let content: String = row.try_get("content")?;
        let metadata: String = row.try_get("metadata")?;
        let score: f64 = row.try_get("score")?;

        let id = Uuid::parse_str(&id)
            .map_err(|e| Error::vector_db(format!("Invalid chunk id {}: {}", id, e)))?;
        let metadata: ChunkMetadata = serde_json::from_str(&metadata)
            .map_err(|e| Error::vector_db(format!("Invalid metadata for chunk {}: {}", id, e)))?;

        Ok(RetrievedChunk {
            chunk: Chunk {
                id,
                content,
                embedding: Vec::new(),
                metadata,
            },
            score: score as f32,
        })
    }
}

/// pgvector literal, e.g. `[0.1,0.2,0.3]`
fn vector_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}

/// Keep `[A-Za-z0-9_]`, replacing anything else with `_`
fn sanitize_table_name(name: &str) -> Result<String> {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match sanitized.chars().next() {
        None => Err(Error::Config("vector_db.table must not be empty".to_string())),
        Some(c) if c.is_ascii_digit() => Ok(format!("t_{}", sanitized)),
        Some(_) => Ok(sanitized),
    }
}

#[async_trait]
impl VectorStoreProvider for PgVectorStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.check_chunks(chunks)?;

        let mut tx = self.pool.begin().await?;
        self.insert_chunks(&mut tx, chunks).await?;
        tx.commit().await?;

        tracing::debug!(table = %self.table, count = chunks.len(), "Inserted chunks");
        Ok(())
    }

    async fn replace_source(&self, source: &str, chunks: &[Chunk]) -> Result<()> {
        self.check_chunks(chunks)?;

        let delete = format!("DELETE FROM {} WHERE metadata->>'source' = $1", self.table);
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(&delete)
            .bind(source)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        self.insert_chunks(&mut tx, chunks).await?;
        tx.commit().await?;

        tracing::debug!(
            table = %self.table,
            source,
            removed,
            inserted = chunks.len(),
            "Replaced source chunks"
        );
        Ok(())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        top_k: usize,
        threshold: f32,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedChunk>> {
        Error::check_dimensions(self.dimensions, embedding.len())?;

        let search = format!(
            "SELECT id::text AS id, content, metadata::text AS metadata, \
                    1 - (embedding <=> $1::vector) AS score \
             FROM {} \
             WHERE 1 - (embedding <=> $1::vector) >= $2 \
               AND ($3::text[] IS NULL OR metadata->>'source' = ANY($3)) \
               AND ($4::text[] IS NULL OR metadata->>'fileType' = ANY($4)) \
             ORDER BY embedding <=> $1::vector \
             LIMIT $5",
            self.table
        );

        let rows = sqlx::query(&search)
            .bind(vector_literal(embedding))
            .bind(threshold as f64)
            .bind(filter.sources.clone())
            .bind(filter.file_type_names())
            .bind(i64::try_from(top_k).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_result).collect()
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let delete = format!("DELETE FROM {} WHERE metadata->>'source' = $1", self.table);
        let result = sqlx::query(&delete).bind(source).execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    async fn source_hash(&self, source: &str) -> Result<Option<String>> {
        let select = format!(
            "SELECT metadata->>'contentHash' AS hash FROM {} WHERE metadata->>'source' = $1 LIMIT 1",
            self.table
        );
        let row = sqlx::query(&select)
            .bind(source)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<String>, _>("hash")?),
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<usize> {
        let select = format!("SELECT COUNT(*) AS n FROM {}", self.table);
        let row = sqlx::query(&select).fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as usize)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(sqlx::query("SELECT 1").execute(&self.pool).await.is_ok())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "pgvector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize_table_name("vector_store").unwrap(), "vector_store");
        assert_eq!(
            sanitize_table_name("docs; DROP TABLE x").unwrap(),
            "docs__DROP_TABLE_x"
        );
        assert_eq!(sanitize_table_name("2024_docs").unwrap(), "t_2024_docs");
        assert!(sanitize_table_name("").is_err());
    }

    #[test]
    fn test_vector_literal() {
        assert_eq!(vector_literal(&[0.5, -1.0, 2.25]), "[0.5,-1,2.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
