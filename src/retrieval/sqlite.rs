//! SQLite-backed corpus store.
//!
//! Holds the indexed `legal_docs` relation with little-endian packed
//! f32 embedding blobs. The retrieval path only reads; ingestion goes
//! through `insert_section`/`insert_batch`, which enforce the
//! fixed-dimension invariant recorded in `corpus_meta`.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{DocumentSection, SectionStore};
use super::RetrievalError;

pub struct SqliteSectionStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteSectionStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, RetrievalError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(store_err)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RetrievalError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS legal_docs (
                doc_id INTEGER PRIMARY KEY,
                section TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS corpus_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    /// Dimension the corpus was ingested with, if any section exists.
    pub async fn embedding_dimension(&self) -> Result<Option<usize>, RetrievalError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM corpus_meta WHERE key = 'embedding_dimension'")
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;

        Ok(value.and_then(|v| v.parse::<usize>().ok()))
    }

    /// Ingest one section. The first insert pins the corpus dimension;
    /// later inserts with a different vector length are rejected.
    pub async fn insert_section(&self, section: &DocumentSection) -> Result<(), RetrievalError> {
        self.check_dimension(section.embedding.len()).await?;

        let blob = serialize_embedding(&section.embedding);
        sqlx::query(
            "INSERT OR REPLACE INTO legal_docs (doc_id, section, content, embedding)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(section.doc_id)
        .bind(&section.section)
        .bind(&section.content)
        .bind(&blob)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    pub async fn insert_batch(&self, sections: &[DocumentSection]) -> Result<(), RetrievalError> {
        if sections.is_empty() {
            return Ok(());
        }

        for section in sections {
            self.check_dimension(section.embedding.len()).await?;
        }

        let mut tx = self.pool.begin().await.map_err(store_err)?;
        for section in sections {
            let blob = serialize_embedding(&section.embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO legal_docs (doc_id, section, content, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(section.doc_id)
            .bind(&section.section)
            .bind(&section.content)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }
        tx.commit().await.map_err(store_err)?;

        Ok(())
    }

    async fn check_dimension(&self, len: usize) -> Result<(), RetrievalError> {
        if len == 0 {
            return Err(RetrievalError::InvalidSection(
                "refusing to ingest empty embedding".to_string(),
            ));
        }

        match self.embedding_dimension().await? {
            Some(dim) if dim != len => Err(RetrievalError::InvalidSection(format!(
                "embedding dimension mismatch: corpus has {dim}, got {len}"
            ))),
            Some(_) => Ok(()),
            None => {
                sqlx::query(
                    "INSERT OR REPLACE INTO corpus_meta (key, value)
                     VALUES ('embedding_dimension', ?1)",
                )
                .bind(len.to_string())
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SectionStore for SqliteSectionStore {
    async fn fetch_all(&self) -> Result<Vec<DocumentSection>, RetrievalError> {
        let rows = sqlx::query("SELECT doc_id, section, content, embedding FROM legal_docs")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                DocumentSection {
                    doc_id: row.get("doc_id"),
                    section: row.get("section"),
                    content: row.get("content"),
                    embedding: deserialize_embedding(&blob),
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM legal_docs")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(count as usize)
    }
}

fn store_err(err: sqlx::Error) -> RetrievalError {
    RetrievalError::StoreUnavailable(err.to_string())
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
