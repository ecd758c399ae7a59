//! Document ingestion
//!
//! Loads files from a directory into the vector index: content-hash
//! deduplication, overlapping chunking, embedding, and a JSON side-file
//! recording what has already been ingested so re-runs are incremental.

use super::chunker::{split_text, CHUNK_OVERLAP_CHARS, CHUNK_SIZE_CHARS};
use super::loader::{load_document, SUPPORTED_EXTENSIONS};
use crate::db::{hash_bytes, hash_content, Database, DocumentChunk};
use crate::error::{Result, VetDxError};
use crate::llm::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the ingestion cache stored next to the index
pub const INGESTION_CACHE_FILE: &str = "ingested_files.json";

/// Persisted record of one ingested source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub hash: String,
    pub chunks: usize,
    pub name: String,
}

/// Per-file failure captured during a directory batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFailure {
    pub file: String,
    pub error: String,
}

/// Outcome of a directory ingestion batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    pub files_processed: usize,
    pub chunks_added: usize,
    pub errors: Vec<IngestFailure>,
}

/// Writer side of the document store.
///
/// Runs administratively, never concurrently with case processing.
pub struct Ingestor<'a> {
    db: &'a Database,
    embedder: &'a dyn Embedder,
    cache_path: PathBuf,
    records: HashMap<String, IngestionRecord>,
}

impl<'a> Ingestor<'a> {
    /// Create an ingestor whose cache side-file lives in `cache_dir`
    pub fn new(db: &'a Database, embedder: &'a dyn Embedder, cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let cache_path = cache_dir.join(INGESTION_CACHE_FILE);
        let records = load_records(&cache_path)?;
        Ok(Self {
            db,
            embedder,
            cache_path,
            records,
        })
    }

    /// Ingest a single file. Returns the number of chunks added; zero when
    /// the file's content hash matches the recorded one and `force` is off.
    pub async fn ingest_file(&mut self, path: &Path, force: bool) -> Result<usize> {
        if !path.exists() {
            return Err(VetDxError::InvalidInput(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path)?;
        let file_hash = hash_bytes(&bytes);
        let absolute = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        let cache_key = absolute.to_string_lossy().to_string();

        if !force {
            if let Some(record) = self.records.get(&cache_key) {
                if record.hash == file_hash {
                    tracing::debug!("Already ingested, skipping: {}", path.display());
                    return Ok(0);
                }
            }
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| cache_key.clone());
        let file_type = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let pages = load_document(path)?;

        let mut chunks = Vec::new();
        for page in &pages {
            for piece in split_text(&page.text, CHUNK_SIZE_CHARS, CHUNK_OVERLAP_CHARS) {
                let mut chunk = DocumentChunk::new(piece.text, name.clone(), file_hash.clone())
                    .with_metadata("full_path", cache_key.clone())
                    .with_metadata("file_type", file_type.clone());
                if let Some(page_no) = page.page {
                    chunk = chunk.with_page(page_no);
                }
                chunks.push(chunk);
            }
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.db
                .insert_chunk(chunk, self.embedder.model_name(), embedding)?;
        }

        self.records.insert(
            cache_key,
            IngestionRecord {
                hash: file_hash,
                chunks: chunks.len(),
                name: name.clone(),
            },
        );
        self.save_records()?;

        tracing::info!("Ingested {}: {} chunks", name, chunks.len());
        Ok(chunks.len())
    }

    /// Ingest every matching file under a directory.
    ///
    /// Per-file failures are recorded and the batch continues.
    pub async fn ingest_directory(
        &mut self,
        directory: &Path,
        extensions: Option<&[&str]>,
        force: bool,
    ) -> Result<IngestStats> {
        let extensions = extensions.unwrap_or(SUPPORTED_EXTENSIONS);
        let mut stats = IngestStats::default();

        tracing::info!("Ingesting documents from {}", directory.display());

        for entry in WalkDir::new(directory)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            match self.ingest_file(path, force).await {
                Ok(added) => {
                    stats.files_processed += 1;
                    stats.chunks_added += added;
                }
                Err(e) => {
                    tracing::warn!("Failed to ingest {}: {}", path.display(), e);
                    stats.errors.push(IngestFailure {
                        file: path.display().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Ingestion batch done: {} files, {} chunks, {} errors",
            stats.files_processed,
            stats.chunks_added,
            stats.errors.len()
        );
        Ok(stats)
    }

    /// Index ad-hoc text without a backing file (e.g. an archived case)
    pub async fn add_document(
        &mut self,
        content: &str,
        metadata: HashMap<String, String>,
        source: &str,
    ) -> Result<usize> {
        let file_hash = hash_content(content);
        let pieces = split_text(content, CHUNK_SIZE_CHARS, CHUNK_OVERLAP_CHARS);

        if pieces.is_empty() {
            return Ok(0);
        }

        let chunks: Vec<DocumentChunk> = pieces
            .into_iter()
            .map(|piece| {
                let mut chunk = DocumentChunk::new(piece.text, source, file_hash.clone());
                chunk.metadata.extend(metadata.clone());
                chunk
            })
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            self.db
                .insert_chunk(chunk, self.embedder.model_name(), embedding)?;
        }

        Ok(chunks.len())
    }

    /// Wipe the store and forget every ingestion record
    pub fn clear(&mut self) -> Result<()> {
        self.db.clear()?;
        self.records.clear();
        self.save_records()?;
        Ok(())
    }

    /// Number of source files currently recorded as ingested
    pub fn ingested_files(&self) -> usize {
        self.records.len()
    }

    fn save_records(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&self.cache_path, json)?;
        Ok(())
    }
}

fn load_records(path: &Path) -> Result<HashMap<String, IngestionRecord>> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(HashMap::new())
    }
}
