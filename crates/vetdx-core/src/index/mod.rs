//! Document ingestion pipeline
//!
//! Loading, chunking and indexing of the local veterinary corpus.

pub mod chunker;
pub mod ingest;
pub mod loader;

pub use chunker::{split_text, Chunk, CHUNK_OVERLAP_CHARS, CHUNK_SIZE_CHARS};
pub use ingest::{IngestFailure, IngestStats, IngestionRecord, Ingestor, INGESTION_CACHE_FILE};
pub use loader::{load_document, DocumentPage, SUPPORTED_EXTENSIONS};
