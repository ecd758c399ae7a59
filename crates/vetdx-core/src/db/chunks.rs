//! Chunk storage operations

use super::Database;
use crate::error::{Result, VetDxError};
use chrono::Utc;
use rusqlite::params;
use std::collections::HashMap;

/// A unit of ingested text, owned by the index
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub content: String,
    pub source: String,
    pub page: Option<u32>,
    pub file_hash: String,
    pub metadata: HashMap<String, String>,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>, file_hash: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            page: None,
            file_hash: file_hash.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Database {
    /// Insert a chunk together with its embedding, atomically
    pub fn insert_chunk(
        &self,
        chunk: &DocumentChunk,
        model: &str,
        embedding: &[f32],
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let metadata_json = serde_json::to_string(&chunk.metadata)?;
        let embedding_bytes = super::vectors::embedding_to_bytes(embedding);

        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            self.conn.execute(
                "INSERT INTO chunks (content, source, page, file_hash, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    chunk.content,
                    chunk.source,
                    chunk.page,
                    chunk.file_hash,
                    metadata_json,
                    now
                ],
            )?;
            let chunk_id = self.conn.last_insert_rowid();
            self.conn.execute(
                "INSERT INTO chunk_embeddings (chunk_id, model, embedding) VALUES (?1, ?2, ?3)",
                params![chunk_id, model, embedding_bytes],
            )?;
            Ok(chunk_id)
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Total number of indexed chunks
    pub fn count_chunks(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Fetch a chunk by id
    pub fn get_chunk(&self, chunk_id: i64) -> Result<DocumentChunk> {
        let result = self.conn.query_row(
            "SELECT content, source, page, file_hash, metadata FROM chunks WHERE id = ?1",
            params![chunk_id],
            |row| {
                let metadata_json: String = row.get(4)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<u32>>(2)?,
                    row.get::<_, String>(3)?,
                    metadata_json,
                ))
            },
        );

        match result {
            Ok((content, source, page, file_hash, metadata_json)) => {
                let metadata: HashMap<String, String> =
                    serde_json::from_str(&metadata_json).unwrap_or_default();
                Ok(DocumentChunk {
                    content,
                    source,
                    page,
                    file_hash,
                    metadata,
                })
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(VetDxError::DocumentNotFound(
                format!("chunk {}", chunk_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every chunk and embedding from the store
    pub fn clear(&self) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| {
            self.conn.execute("DELETE FROM chunk_embeddings", [])?;
            self.conn.execute("DELETE FROM chunks", [])?;
            Ok(())
        })();

        if result.is_ok() {
            self.conn.execute("COMMIT", [])?;
        } else {
            let _ = self.conn.execute("ROLLBACK", []);
        }
        result
    }

    /// Partial deletion is unsupported: chunks leave the store only via
    /// [`Database::clear`]
    pub fn delete_by_source(&self, source: &str) -> Result<usize> {
        Err(VetDxError::NotImplemented(format!(
            "delete by source ({})",
            source
        )))
    }
}
